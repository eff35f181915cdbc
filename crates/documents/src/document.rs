use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use docket_core::{CompanyId, DomainError, Entity, UserId, serial_id};

use crate::catalog::PartnerId;
use crate::state::DocumentState;
use crate::totals::DocumentTotals;

serial_id!(
    /// Document (invoice or sale order header) identifier.
    DocumentId,
    "DocumentId"
);

/// The document types sharing the master/detail lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    SaleOrder,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::SaleOrder => "sale_order",
        }
    }

    /// Wording used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::SaleOrder => "sale order",
        }
    }

    /// Location of the read-only detail view for a document of this kind.
    pub fn detail_path(self, id: DocumentId) -> String {
        match self {
            DocumentKind::Invoice => format!("/invoices/{id}"),
            DocumentKind::SaleOrder => format!("/sales/orders/{id}"),
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" => Ok(DocumentKind::Invoice),
            "sale_order" => Ok(DocumentKind::SaleOrder),
            other => Err(DomainError::validation(format!("unknown document kind: {other}"))),
        }
    }
}

/// Validated header values, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub name: String,
    pub partner_id: PartnerId,
    pub date: NaiveDate,
    pub description: Option<String>,
}

/// A persisted document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub company_id: CompanyId,
    pub name: String,
    pub partner_id: PartnerId,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub state: DocumentState,
    /// Derived from the lines, stored redundantly for list screens.
    #[serde(flatten)]
    pub totals: DocumentTotals,
    pub active: bool,
    pub created_by: UserId,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_draft(&self) -> bool {
        self.state.is_draft()
    }

    /// Overwrite header fields and totals, stamping the editing user.
    pub fn apply_header(
        &mut self,
        header: DocumentHeader,
        totals: DocumentTotals,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) {
        self.name = header.name;
        self.partner_id = header.partner_id;
        self.date = header.date;
        self.description = header.description;
        self.totals = totals;
        self.updated_by = Some(updated_by);
        self.updated_at = at;
    }
}

impl Entity for Document {
    type Id = DocumentId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Insert payload for a new document. The store assigns the id and binds the
/// company from the scope; new documents always start in Draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub header: DocumentHeader,
    pub totals: DocumentTotals,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewDocument {
    /// Materialize the persisted record once the store has assigned an id.
    pub fn into_document(self, id: DocumentId, company_id: CompanyId) -> Document {
        Document {
            id,
            kind: self.kind,
            company_id,
            name: self.header.name,
            partner_id: self.header.partner_id,
            date: self.header.date,
            description: self.header.description,
            state: DocumentState::DRAFT,
            totals: self.totals,
            active: true,
            created_by: self.created_by,
            updated_by: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
