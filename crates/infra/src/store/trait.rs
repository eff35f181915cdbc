use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use docket_core::{Scope, UserId};
use docket_documents::{
    Document, DocumentId, DocumentKind, DocumentState, LineAmounts, LineItem, LineItemId,
    LineValues, NewDocument, NewLineItem, Partner, PartnerId, Product, ProductId, Tax, TaxId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A write targeted a row that does not exist in the caller's scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the write (foreign key, check or unique constraint).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Connection, decoding or any other backend failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Document header access inside a unit of work.
///
/// Every call takes the caller's `Scope`: rows of another company are never
/// visible, and inactive rows only when the scope asks for them.
#[async_trait]
pub trait DocumentRepository: Send {
    /// Insert a new Draft document and return it with its assigned id.
    async fn insert_document(
        &mut self,
        scope: &Scope,
        document: NewDocument,
    ) -> Result<Document, StoreError>;

    async fn find_document(
        &mut self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// Persist header fields, totals and audit columns of `document`.
    async fn update_document(&mut self, scope: &Scope, document: &Document)
    -> Result<(), StoreError>;

    /// Soft delete: the row stays, `active` becomes false.
    async fn deactivate_document(
        &mut self,
        scope: &Scope,
        id: DocumentId,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Line item access inside a unit of work.
#[async_trait]
pub trait LineItemRepository: Send {
    /// Lines of a document, ordered by sequence.
    async fn list_lines(
        &mut self,
        scope: &Scope,
        document_id: DocumentId,
    ) -> Result<Vec<LineItem>, StoreError>;

    async fn insert_line(
        &mut self,
        scope: &Scope,
        line: NewLineItem,
    ) -> Result<LineItem, StoreError>;

    async fn update_line(
        &mut self,
        scope: &Scope,
        id: LineItemId,
        sequence: u32,
        values: &LineValues,
        amounts: &LineAmounts,
    ) -> Result<(), StoreError>;

    async fn delete_line(&mut self, scope: &Scope, id: LineItemId) -> Result<(), StoreError>;

    /// Active lines still referencing the document.
    async fn count_lines(
        &mut self,
        scope: &Scope,
        document_id: DocumentId,
    ) -> Result<usize, StoreError>;
}

/// One atomic batch of document and line writes.
///
/// Nothing written through a unit of work is visible to other callers until
/// `commit` succeeds. Dropping it without committing discards every write.
#[async_trait]
pub trait UnitOfWork: DocumentRepository + LineItemRepository {
    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Entry point to document storage: committed reads plus `begin`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn get_document(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// Documents of one kind, ordered by id.
    async fn list_documents(
        &self,
        scope: &Scope,
        kind: DocumentKind,
    ) -> Result<Vec<Document>, StoreError>;

    async fn document_lines(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Vec<LineItem>, StoreError>;

    /// Committed counterpart of `LineItemRepository::count_lines`.
    async fn count_lines(&self, scope: &Scope, id: DocumentId) -> Result<usize, StoreError>;

    /// Overwrite the state column. Returns the updated document, or `None`
    /// when it does not exist in scope.
    async fn set_state(
        &self,
        scope: &Scope,
        id: DocumentId,
        state: DocumentState,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Document>, StoreError>;
}

/// Read-only catalog lookups. Unknown ids are simply absent from the result.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn partners(&self, scope: &Scope, ids: &[PartnerId]) -> Result<Vec<Partner>, StoreError>;

    async fn products(&self, scope: &Scope, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    async fn taxes(&self, scope: &Scope, ids: &[TaxId]) -> Result<Vec<Tax>, StoreError>;
}
