//! State and delete guards.
//!
//! Both guards are pure decisions over already-loaded records. The caller runs
//! the state guard before opening a transaction and the delete guard inside
//! the transaction that would perform the delete.

use serde::Serialize;

use crate::document::{Document, DocumentId, DocumentKind};
use crate::state::DocumentState;

/// Why an edit was refused, and where to send the user instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRejection {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub name: String,
    pub state: DocumentState,
    pub warning: String,
    /// Read-only detail view of the same document.
    pub redirect_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Reject(StateRejection),
}

/// Only Draft documents may have their header or lines changed.
pub struct StateGuard;

impl StateGuard {
    pub fn can_mutate(document: &Document) -> bool {
        document.is_draft()
    }

    pub fn enforce(document: &Document) -> GuardDecision {
        if Self::can_mutate(document) {
            return GuardDecision::Proceed;
        }
        GuardDecision::Reject(StateRejection {
            document_id: document.id,
            kind: document.kind,
            name: document.name.clone(),
            state: document.state,
            warning: format!(
                "The current {} {} status does not allow updates.",
                document.kind.label(),
                document.name
            ),
            redirect_to: document.kind.detail_path(document.id),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteCheck {
    Allowed { message: String },
    Blocked { message: String },
}

impl DeleteCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, DeleteCheck::Allowed { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            DeleteCheck::Allowed { message } | DeleteCheck::Blocked { message } => message,
        }
    }
}

/// A document may be removed only while no active line references it.
pub struct DeleteGuard;

impl DeleteGuard {
    pub fn check(document: &Document, attached_lines: usize) -> DeleteCheck {
        let label = document.kind.label();
        if attached_lines > 0 {
            DeleteCheck::Blocked {
                message: format!("The {label} {} cannot be deleted.", document.name),
            }
        } else {
            DeleteCheck::Allowed {
                message: format!("Are you sure you want to delete the {label} {}?", document.name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PartnerId;
    use crate::document::{DocumentHeader, NewDocument};
    use crate::totals::DocumentTotals;
    use chrono::{NaiveDate, TimeZone, Utc};
    use docket_core::{CompanyId, UserId};

    fn document(kind: DocumentKind, state: DocumentState) -> Document {
        let mut doc = NewDocument {
            kind,
            header: DocumentHeader {
                name: "SO-12".to_string(),
                partner_id: PartnerId::new(1),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                description: None,
            },
            totals: DocumentTotals::default(),
            created_by: UserId::new(1),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
        .into_document(DocumentId::new(12), CompanyId::new(1));
        doc.state = state;
        doc
    }

    #[test]
    fn drafts_proceed() {
        let doc = document(DocumentKind::Invoice, DocumentState::DRAFT);
        assert!(StateGuard::can_mutate(&doc));
        assert_eq!(StateGuard::enforce(&doc), GuardDecision::Proceed);
    }

    #[test]
    fn any_other_state_is_rejected_with_redirect() {
        for code in [1, 2, 7, -1] {
            let doc = document(DocumentKind::SaleOrder, DocumentState::from_code(code));
            let GuardDecision::Reject(rejection) = StateGuard::enforce(&doc) else {
                panic!("state {code} must be rejected");
            };
            assert_eq!(rejection.redirect_to, "/sales/orders/12");
            assert_eq!(
                rejection.warning,
                "The current sale order SO-12 status does not allow updates."
            );
        }
    }

    #[test]
    fn delete_is_blocked_while_lines_exist() {
        let doc = document(DocumentKind::Invoice, DocumentState::POSTED);
        let blocked = DeleteGuard::check(&doc, 2);
        assert!(!blocked.is_allowed());
        assert_eq!(blocked.message(), "The invoice SO-12 cannot be deleted.");

        let allowed = DeleteGuard::check(&doc, 0);
        assert!(allowed.is_allowed());
        assert_eq!(
            allowed.message(),
            "Are you sure you want to delete the invoice SO-12?"
        );
    }
}
