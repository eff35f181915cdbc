//! Explicit tenant + soft-delete scoping.
//!
//! Every repository call takes a [`Scope`]. Nothing reads the current company
//! from ambient state.

use crate::id::CompanyId;

/// Whether soft-deleted (`active = false`) records are visible.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Visibility {
    ActiveOnly,
    IncludeInactive,
}

/// Company + visibility filter applied to reads and writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    company_id: CompanyId,
    visibility: Visibility,
}

impl Scope {
    /// The default scope: one company, active records only.
    pub fn active(company_id: CompanyId) -> Self {
        Self {
            company_id,
            visibility: Visibility::ActiveOnly,
        }
    }

    pub fn including_inactive(company_id: CompanyId) -> Self {
        Self {
            company_id,
            visibility: Visibility::IncludeInactive,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn active_only(&self) -> bool {
        matches!(self.visibility, Visibility::ActiveOnly)
    }

    /// Does a record owned by `company_id` with the given `active` flag fall
    /// inside this scope?
    pub fn admits(&self, company_id: CompanyId, active: bool) -> bool {
        self.company_id == company_id && (active || !self.active_only())
    }
}
