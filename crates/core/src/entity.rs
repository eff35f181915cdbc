//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Documents and their line items are entities: two records with the same
/// identifier are the same record, whatever their field values.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
