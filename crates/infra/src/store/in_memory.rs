//! In-memory document store for tests and local development.
//!
//! All tables live behind one async mutex. A unit of work takes the lock for
//! its whole lifetime and writes into a staged copy of the tables; `commit`
//! publishes the copy and dropping the unit of work discards it. This gives
//! the same all-or-nothing behaviour as a database transaction, at the cost of
//! serialising writers.
//!
//! Committed reads (`get_document`, catalog lookups, ...) also take the lock,
//! so they must not be called while the same task holds an open unit of work.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use tokio::sync::{Mutex, OwnedMutexGuard};

use docket_core::{CompanyId, Scope, UserId};
use docket_documents::{
    Document, DocumentId, DocumentKind, DocumentState, LineAmounts, LineItem, LineItemId,
    LineValues, NewDocument, NewLineItem, Partner, PartnerId, Product, ProductId, Tax, TaxId,
    TaxKind, UomId,
};

use super::r#trait::{
    CatalogStore, DocumentRepository, DocumentStore, LineItemRepository, StoreError, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    documents: BTreeMap<DocumentId, Document>,
    lines: BTreeMap<LineItemId, LineItem>,
    partners: BTreeMap<PartnerId, Partner>,
    products: BTreeMap<ProductId, Product>,
    taxes: BTreeMap<TaxId, Tax>,
    last_document_id: i64,
    last_line_id: i64,
}

impl Tables {
    fn document(&self, scope: &Scope, id: DocumentId) -> Option<&Document> {
        self.documents
            .get(&id)
            .filter(|d| scope.admits(d.company_id, d.active))
    }

    fn lines_of(&self, scope: &Scope, document_id: DocumentId) -> Vec<LineItem> {
        let mut lines: Vec<LineItem> = self
            .lines
            .values()
            .filter(|l| l.document_id == document_id && scope.admits(l.company_id, l.active))
            .cloned()
            .collect();
        lines.sort_by_key(|l| (l.sequence, l.id));
        lines
    }

    /// Active lines of the document in the scope's company, whatever the
    /// scope's visibility.
    fn active_line_count(&self, scope: &Scope, document_id: DocumentId) -> usize {
        self.lines
            .values()
            .filter(|l| {
                l.document_id == document_id && l.active && l.company_id == scope.company_id()
            })
            .count()
    }
}

/// Shared handle; clones see the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with catalog records.
    pub fn with_catalog(partners: Vec<Partner>, products: Vec<Product>, taxes: Vec<Tax>) -> Self {
        let tables = Tables {
            partners: partners.into_iter().map(|p| (p.id, p)).collect(),
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            taxes: taxes.into_iter().map(|t| (t.id, t)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    /// A store seeded with a small catalog for `company_id`, for local runs.
    pub fn with_demo_catalog(company_id: CompanyId) -> Self {
        let (partners, products, taxes) = demo_catalog(company_id);
        Self::with_catalog(partners, products, taxes)
    }
}

/// Partners 7 and 8, products 1 to 3, taxes 1 (IVA 19%) and 2 (other 10%).
pub fn demo_catalog(company_id: CompanyId) -> (Vec<Partner>, Vec<Product>, Vec<Tax>) {
    let partner = |id: i64, name: &str| Partner {
        id: PartnerId::new(id),
        company_id,
        name: name.to_string(),
        active: true,
    };
    let product = |id: i64, name: &str, list_price, taxes: &[i64]| Product {
        id: ProductId::new(id),
        company_id,
        name: name.to_string(),
        description: None,
        list_price,
        uom_id: Some(UomId::new(1)),
        tax_ids: taxes.iter().copied().map(TaxId::new).collect(),
        active: true,
    };
    let tax = |id: i64, name: &str, rate, kind| Tax {
        id: TaxId::new(id),
        company_id,
        name: name.to_string(),
        rate,
        kind,
        active: true,
    };

    (
        vec![partner(7, "ACME Corp"), partner(8, "Globex")],
        vec![
            product(1, "Keyboard", dec!(10.00), &[1]),
            product(2, "Mouse", dec!(5.00), &[1]),
            product(3, "Support hour", dec!(40.00), &[]),
        ],
        vec![
            tax(1, "IVA 19%", dec!(19), TaxKind::Iva),
            tax(2, "Specific tax 10%", dec!(10), TaxKind::Other),
        ],
    )
}

/// Exclusive, staged view of the tables.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

impl std::fmt::Debug for InMemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTx")
            .field("documents", &self.staged.documents.len())
            .field("lines", &self.staged.lines.len())
            .finish()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryTx {
    async fn insert_document(
        &mut self,
        scope: &Scope,
        document: NewDocument,
    ) -> Result<Document, StoreError> {
        let partner_ok = self
            .staged
            .partners
            .get(&document.header.partner_id)
            .is_some_and(|p| p.company_id == scope.company_id());
        if !partner_ok {
            return Err(StoreError::Constraint(format!(
                "partner {} does not exist",
                document.header.partner_id
            )));
        }

        self.staged.last_document_id += 1;
        let id = DocumentId::new(self.staged.last_document_id);
        let document = document.into_document(id, scope.company_id());
        self.staged.documents.insert(id, document.clone());
        Ok(document)
    }

    async fn find_document(
        &mut self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.staged.document(scope, id).cloned())
    }

    async fn update_document(
        &mut self,
        scope: &Scope,
        document: &Document,
    ) -> Result<(), StoreError> {
        if self.staged.document(scope, document.id).is_none() {
            return Err(StoreError::NotFound(format!("document {}", document.id)));
        }
        self.staged.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn deactivate_document(
        &mut self,
        scope: &Scope,
        id: DocumentId,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let document = self
            .staged
            .documents
            .get_mut(&id)
            .filter(|d| scope.admits(d.company_id, d.active))
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        document.active = false;
        document.updated_by = Some(updated_by);
        document.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl LineItemRepository for InMemoryTx {
    async fn list_lines(
        &mut self,
        scope: &Scope,
        document_id: DocumentId,
    ) -> Result<Vec<LineItem>, StoreError> {
        Ok(self.staged.lines_of(scope, document_id))
    }

    async fn insert_line(
        &mut self,
        scope: &Scope,
        line: NewLineItem,
    ) -> Result<LineItem, StoreError> {
        if !self.staged.documents.contains_key(&line.document_id) {
            return Err(StoreError::Constraint(format!(
                "line references missing document {}",
                line.document_id
            )));
        }
        if !self.staged.products.contains_key(&line.values.product_id) {
            return Err(StoreError::Constraint(format!(
                "line references missing product {}",
                line.values.product_id
            )));
        }

        self.staged.last_line_id += 1;
        let id = LineItemId::new(self.staged.last_line_id);
        let line = line.into_line(id, scope.company_id());
        self.staged.lines.insert(id, line.clone());
        Ok(line)
    }

    async fn update_line(
        &mut self,
        scope: &Scope,
        id: LineItemId,
        sequence: u32,
        values: &LineValues,
        amounts: &LineAmounts,
    ) -> Result<(), StoreError> {
        let line = self
            .staged
            .lines
            .get_mut(&id)
            .filter(|l| scope.admits(l.company_id, l.active))
            .ok_or_else(|| StoreError::NotFound(format!("line item {id}")))?;
        line.sequence = sequence;
        line.values = values.clone();
        line.amounts = amounts.clone();
        Ok(())
    }

    async fn delete_line(&mut self, scope: &Scope, id: LineItemId) -> Result<(), StoreError> {
        match self.staged.lines.get(&id) {
            Some(line) if scope.admits(line.company_id, line.active) => {
                self.staged.lines.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("line item {id}"))),
        }
    }

    async fn count_lines(
        &mut self,
        scope: &Scope,
        document_id: DocumentId,
    ) -> Result<usize, StoreError> {
        Ok(self.staged.active_line_count(scope, document_id))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryTx {
    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTx { guard, staged })
    }

    async fn get_document(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.document(scope, id).cloned())
    }

    async fn list_documents(
        &self,
        scope: &Scope,
        kind: DocumentKind,
    ) -> Result<Vec<Document>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .documents
            .values()
            .filter(|d| d.kind == kind && scope.admits(d.company_id, d.active))
            .cloned()
            .collect())
    }

    async fn document_lines(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Vec<LineItem>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.lines_of(scope, id))
    }

    async fn count_lines(&self, scope: &Scope, id: DocumentId) -> Result<usize, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.active_line_count(scope, id))
    }

    async fn set_state(
        &self,
        scope: &Scope,
        id: DocumentId,
        state: DocumentState,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Document>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(document) = tables
            .documents
            .get_mut(&id)
            .filter(|d| scope.admits(d.company_id, d.active))
        else {
            return Ok(None);
        };
        document.state = state;
        document.updated_by = Some(updated_by);
        document.updated_at = at;
        Ok(Some(document.clone()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn partners(&self, scope: &Scope, ids: &[PartnerId]) -> Result<Vec<Partner>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.partners.get(id))
            .filter(|p| scope.admits(p.company_id, p.active))
            .cloned()
            .collect())
    }

    async fn products(&self, scope: &Scope, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id))
            .filter(|p| scope.admits(p.company_id, p.active))
            .cloned()
            .collect())
    }

    async fn taxes(&self, scope: &Scope, ids: &[TaxId]) -> Result<Vec<Tax>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.taxes.get(id))
            .filter(|t| scope.admits(t.company_id, t.active))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use docket_documents::{DocumentHeader, DocumentTotals};

    fn scope() -> Scope {
        Scope::active(CompanyId::new(1))
    }

    fn new_document() -> NewDocument {
        NewDocument {
            kind: DocumentKind::Invoice,
            header: DocumentHeader {
                name: "INV-1".to_string(),
                partner_id: PartnerId::new(7),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                description: None,
            },
            totals: DocumentTotals::default(),
            created_by: UserId::new(1),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_unit_of_work_leaves_nothing_behind() {
        let store = InMemoryStore::with_demo_catalog(CompanyId::new(1));
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_document(&scope(), new_document()).await.unwrap();
        }
        let listed = store
            .list_documents(&scope(), DocumentKind::Invoice)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let store = InMemoryStore::with_demo_catalog(CompanyId::new(1));
        let mut tx = store.begin().await.unwrap();
        let doc = tx.insert_document(&scope(), new_document()).await.unwrap();
        tx.commit().await.unwrap();

        let found = store.get_document(&scope(), doc.id).await.unwrap();
        assert_eq!(found, Some(doc));
    }

    #[tokio::test]
    async fn other_companies_and_inactive_rows_are_out_of_scope() {
        let store = InMemoryStore::with_demo_catalog(CompanyId::new(1));
        let mut tx = store.begin().await.unwrap();
        let doc = tx.insert_document(&scope(), new_document()).await.unwrap();
        tx.deactivate_document(&scope(), doc.id, UserId::new(2), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(store.get_document(&scope(), doc.id).await.unwrap().is_none());
        let other = Scope::including_inactive(CompanyId::new(2));
        assert!(store.get_document(&other, doc.id).await.unwrap().is_none());
        let inclusive = Scope::including_inactive(CompanyId::new(1));
        let found = store.get_document(&inclusive, doc.id).await.unwrap().unwrap();
        assert!(!found.active);
    }

    #[tokio::test]
    async fn lines_require_an_existing_parent() {
        let store = InMemoryStore::with_demo_catalog(CompanyId::new(1));
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_line(
                &scope(),
                NewLineItem {
                    document_id: DocumentId::new(99),
                    sequence: 1,
                    values: LineValues {
                        product_id: ProductId::new(1),
                        description: "Keyboard".to_string(),
                        quantity: dec!(1),
                        price: dec!(10),
                        discount: dec!(0),
                        uom_id: None,
                        tax_ids: vec![],
                    },
                    amounts: LineAmounts::default(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn catalog_lookup_skips_unknown_ids() {
        let store = InMemoryStore::with_demo_catalog(CompanyId::new(1));
        let taxes = store
            .taxes(&scope(), &[TaxId::new(2), TaxId::new(42), TaxId::new(1)])
            .await
            .unwrap();
        let ids: Vec<TaxId> = taxes.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TaxId::new(2), TaxId::new(1)]);
    }
}
