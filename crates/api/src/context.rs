use docket_core::{CompanyId, Scope, UserId};

/// Company the request acts on, supplied by the upstream auth layer.
///
/// This is immutable and must be present for all document routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CompanyContext {
    company_id: CompanyId,
}

impl CompanyContext {
    pub fn new(company_id: CompanyId) -> Self {
        Self { company_id }
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Default read/write scope: this company, active records only.
    pub fn scope(&self) -> Scope {
        Scope::active(self.company_id)
    }
}

/// The acting user, stamped on every write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
