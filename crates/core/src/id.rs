//! Strongly-typed identifiers used across the domain.
//!
//! Records are keyed by database surrogate ids (positive integers). Each kind of
//! record gets its own newtype so a product id can never be passed where a tax
//! id is expected.

/// Declare a surrogate-key newtype.
///
/// The generated type is `Copy`, orderable, serializes as a bare integer and
/// parses from its decimal string form (rejecting zero and negatives).
///
/// Crates using this macro must depend on `serde`.
#[macro_export]
macro_rules! serial_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(i64);

        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: i64 = s
                    .trim()
                    .parse()
                    .map_err(|e| $crate::DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err($crate::DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, value
                    )));
                }
                Ok(Self(value))
            }
        }
    };
}

serial_id!(
    /// Identifier of a company (multi-tenant boundary).
    CompanyId,
    "CompanyId"
);

serial_id!(
    /// Identifier of a user (actor identity for audit stamps).
    UserId,
    "UserId"
);
