//! Postgres-backed document store.
//!
//! Each unit of work wraps one database transaction; committed reads go
//! straight to the pool. Every query carries the scope's company id, and the
//! `active` filter unless the scope includes inactive rows.
//!
//! ## Error Mapping
//!
//! | SQLx error                       | Code            | StoreError   |
//! |----------------------------------|-----------------|--------------|
//! | Database (unique violation)      | `23505`         | `Constraint` |
//! | Database (foreign key violation) | `23503`         | `Constraint` |
//! | Database (check violation)       | `23514`         | `Constraint` |
//! | Database (other)                 | any other       | `Backend`    |
//! | RowNotFound                      | n/a             | `NotFound`   |
//! | PoolClosed, Io, Decode, ...      | n/a             | `Backend`    |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use docket_core::{CompanyId, Scope, UserId};
use docket_documents::{
    Document, DocumentId, DocumentKind, DocumentState, DocumentTotals, LineAmounts, LineItem,
    LineItemId, LineValues, NewDocument, NewLineItem, Partner, PartnerId, Product, ProductId, Tax,
    TaxId, TaxKind, UomId,
};

use super::r#trait::{
    CatalogStore, DocumentRepository, DocumentStore, LineItemRepository, StoreError, UnitOfWork,
};

const SCHEMA: &str = include_str!("../../migrations/0001_documents.sql");

const DOCUMENT_COLUMNS: &str = "id, kind, company_id, name, partner_id, date, description, state, \
     amount_untaxed, amount_exempt, amount_tax_iva, amount_tax_other, amount_tax_total, \
     amount_total, active, created_by, updated_by, created_at, updated_at";

const LINE_COLUMNS: &str = "id, document_id, company_id, sequence, product_id, description, \
     quantity, price, discount, uom_id, tax_ids, amount_untaxed, amount_tax_iva, \
     amount_tax_other, amount_total, active";

/// Shared pool handle; cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// One open database transaction.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DocumentRepository for PostgresTx {
    async fn insert_document(
        &mut self,
        scope: &Scope,
        document: NewDocument,
    ) -> Result<Document, StoreError> {
        let totals = &document.totals;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO documents (
                kind, company_id, name, partner_id, date, description, state,
                amount_untaxed, amount_exempt, amount_tax_iva, amount_tax_other,
                amount_tax_total, amount_total, active, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, TRUE, $14, $15, $15)
            RETURNING id
            "#,
        )
        .bind(document.kind.as_str())
        .bind(scope.company_id().get())
        .bind(&document.header.name)
        .bind(document.header.partner_id.get())
        .bind(document.header.date)
        .bind(&document.header.description)
        .bind(DocumentState::DRAFT.code())
        .bind(totals.amount_untaxed)
        .bind(totals.amount_exempt)
        .bind(totals.amount_tax_iva)
        .bind(totals.amount_tax_other)
        .bind(totals.amount_tax_total)
        .bind(totals.amount_total)
        .bind(document.created_by.get())
        .bind(document.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_document", e))?;

        Ok(document.into_document(DocumentId::new(id), scope.company_id()))
    }

    async fn find_document(
        &mut self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        fetch_document(&mut *self.tx, scope, id).await
    }

    async fn update_document(
        &mut self,
        scope: &Scope,
        document: &Document,
    ) -> Result<(), StoreError> {
        let totals = &document.totals;
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                name = $1, partner_id = $2, date = $3, description = $4,
                amount_untaxed = $5, amount_exempt = $6, amount_tax_iva = $7,
                amount_tax_other = $8, amount_tax_total = $9, amount_total = $10,
                updated_by = $11, updated_at = $12
            WHERE id = $13 AND company_id = $14 AND (active OR NOT $15)
            "#,
        )
        .bind(&document.name)
        .bind(document.partner_id.get())
        .bind(document.date)
        .bind(&document.description)
        .bind(totals.amount_untaxed)
        .bind(totals.amount_exempt)
        .bind(totals.amount_tax_iva)
        .bind(totals.amount_tax_other)
        .bind(totals.amount_tax_total)
        .bind(totals.amount_total)
        .bind(document.updated_by.map(UserId::get))
        .bind(document.updated_at)
        .bind(document.id.get())
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_document", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {}", document.id)));
        }
        Ok(())
    }

    async fn deactivate_document(
        &mut self,
        scope: &Scope,
        id: DocumentId,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET active = FALSE, updated_by = $1, updated_at = $2
            WHERE id = $3 AND company_id = $4 AND (active OR NOT $5)
            "#,
        )
        .bind(updated_by.get())
        .bind(at)
        .bind(id.get())
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("deactivate_document", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl LineItemRepository for PostgresTx {
    async fn list_lines(
        &mut self,
        scope: &Scope,
        document_id: DocumentId,
    ) -> Result<Vec<LineItem>, StoreError> {
        fetch_lines(&mut *self.tx, scope, document_id).await
    }

    async fn insert_line(
        &mut self,
        scope: &Scope,
        line: NewLineItem,
    ) -> Result<LineItem, StoreError> {
        let values = &line.values;
        let amounts = &line.amounts;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO line_items (
                document_id, company_id, sequence, product_id, description,
                quantity, price, discount, uom_id, tax_ids,
                amount_untaxed, amount_tax_iva, amount_tax_other, amount_total, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, TRUE)
            RETURNING id
            "#,
        )
        .bind(line.document_id.get())
        .bind(scope.company_id().get())
        .bind(sequence_to_db(line.sequence)?)
        .bind(values.product_id.get())
        .bind(&values.description)
        .bind(values.quantity)
        .bind(values.price)
        .bind(values.discount)
        .bind(values.uom_id.map(UomId::get))
        .bind(tax_ids_to_db(&values.tax_ids))
        .bind(amounts.amount_untaxed)
        .bind(amounts.amount_tax_iva)
        .bind(amounts.amount_tax_other)
        .bind(amounts.amount_total)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_line", e))?;

        Ok(line.into_line(LineItemId::new(id), scope.company_id()))
    }

    async fn update_line(
        &mut self,
        scope: &Scope,
        id: LineItemId,
        sequence: u32,
        values: &LineValues,
        amounts: &LineAmounts,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE line_items SET
                sequence = $1, product_id = $2, description = $3, quantity = $4,
                price = $5, discount = $6, uom_id = $7, tax_ids = $8,
                amount_untaxed = $9, amount_tax_iva = $10, amount_tax_other = $11,
                amount_total = $12
            WHERE id = $13 AND company_id = $14 AND (active OR NOT $15)
            "#,
        )
        .bind(sequence_to_db(sequence)?)
        .bind(values.product_id.get())
        .bind(&values.description)
        .bind(values.quantity)
        .bind(values.price)
        .bind(values.discount)
        .bind(values.uom_id.map(UomId::get))
        .bind(tax_ids_to_db(&values.tax_ids))
        .bind(amounts.amount_untaxed)
        .bind(amounts.amount_tax_iva)
        .bind(amounts.amount_tax_other)
        .bind(amounts.amount_total)
        .bind(id.get())
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_line", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("line item {id}")));
        }
        Ok(())
    }

    async fn delete_line(&mut self, scope: &Scope, id: LineItemId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM line_items WHERE id = $1 AND company_id = $2 AND (active OR NOT $3)",
        )
        .bind(id.get())
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("delete_line", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("line item {id}")));
        }
        Ok(())
    }

    async fn count_lines(
        &mut self,
        scope: &Scope,
        document_id: DocumentId,
    ) -> Result<usize, StoreError> {
        count_active_lines(&mut *self.tx, scope, document_id).await
    }
}

#[async_trait]
impl UnitOfWork for PostgresTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresTx { tx })
    }

    async fn get_document(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        fetch_document(&*self.pool, scope, id).await
    }

    #[instrument(
        skip(self, scope),
        fields(
            company_id = %scope.company_id(),
            kind = %kind,
            document_count = tracing::field::Empty
        ),
        err
    )]
    async fn list_documents(
        &self,
        scope: &Scope,
        kind: DocumentKind,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE kind = $1 AND company_id = $2 AND (active OR NOT $3) ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(scope.company_id().get())
            .bind(scope.active_only())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_documents", e))?;

        let documents = rows
            .iter()
            .map(document_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_document", e))?;
        Span::current().record("document_count", documents.len());
        Ok(documents)
    }

    async fn document_lines(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<Vec<LineItem>, StoreError> {
        fetch_lines(&*self.pool, scope, id).await
    }

    async fn count_lines(&self, scope: &Scope, id: DocumentId) -> Result<usize, StoreError> {
        count_active_lines(&*self.pool, scope, id).await
    }

    #[instrument(skip(self, scope), fields(company_id = %scope.company_id()), err)]
    async fn set_state(
        &self,
        scope: &Scope,
        id: DocumentId,
        state: DocumentState,
        updated_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "UPDATE documents SET state = $1, updated_by = $2, updated_at = $3 \
             WHERE id = $4 AND company_id = $5 AND (active OR NOT $6) \
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(state.code())
            .bind(updated_by.get())
            .bind(at)
            .bind(id.get())
            .bind(scope.company_id().get())
            .bind(scope.active_only())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_state", e))?;

        row.as_ref()
            .map(document_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_document", e))
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn partners(&self, scope: &Scope, ids: &[PartnerId]) -> Result<Vec<Partner>, StoreError> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, name, active FROM partners
            WHERE id = ANY($1) AND company_id = $2 AND (active OR NOT $3)
            ORDER BY array_position($1, id)
            "#,
        )
        .bind(&ids)
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("partners", e))?;

        rows.iter()
            .map(|row| {
                Ok(Partner {
                    id: PartnerId::new(row.try_get("id")?),
                    company_id: CompanyId::new(row.try_get("company_id")?),
                    name: row.try_get("name")?,
                    active: row.try_get("active")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_partner", e))
    }

    async fn products(&self, scope: &Scope, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, name, description, list_price, uom_id, tax_ids, active
            FROM products
            WHERE id = ANY($1) AND company_id = $2 AND (active OR NOT $3)
            ORDER BY array_position($1, id)
            "#,
        )
        .bind(&ids)
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("products", e))?;

        rows.iter()
            .map(|row| {
                Ok(Product {
                    id: ProductId::new(row.try_get("id")?),
                    company_id: CompanyId::new(row.try_get("company_id")?),
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    list_price: row.try_get("list_price")?,
                    uom_id: row.try_get::<Option<i64>, _>("uom_id")?.map(UomId::new),
                    tax_ids: tax_ids_from_db(row.try_get("tax_ids")?),
                    active: row.try_get("active")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_product", e))
    }

    async fn taxes(&self, scope: &Scope, ids: &[TaxId]) -> Result<Vec<Tax>, StoreError> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, name, rate, kind, active FROM taxes
            WHERE id = ANY($1) AND company_id = $2 AND (active OR NOT $3)
            ORDER BY array_position($1, id)
            "#,
        )
        .bind(&ids)
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("taxes", e))?;

        rows.iter()
            .map(|row| {
                let kind: String = row.try_get("kind")?;
                Ok(Tax {
                    id: TaxId::new(row.try_get("id")?),
                    company_id: CompanyId::new(row.try_get("company_id")?),
                    name: row.try_get("name")?,
                    rate: row.try_get("rate")?,
                    kind: kind
                        .parse::<TaxKind>()
                        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
                    active: row.try_get("active")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_tax", e))
    }
}

async fn fetch_document<'c>(
    executor: impl PgExecutor<'c>,
    scope: &Scope,
    id: DocumentId,
) -> Result<Option<Document>, StoreError> {
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents \
         WHERE id = $1 AND company_id = $2 AND (active OR NOT $3)"
    );
    let row = sqlx::query(&sql)
        .bind(id.get())
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("fetch_document", e))?;

    row.as_ref()
        .map(document_from_row)
        .transpose()
        .map_err(|e| map_sqlx_error("decode_document", e))
}

/// Active lines of the document in the scope's company, whatever the scope's
/// visibility.
async fn count_active_lines<'c>(
    executor: impl PgExecutor<'c>,
    scope: &Scope,
    document_id: DocumentId,
) -> Result<usize, StoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM line_items WHERE document_id = $1 AND company_id = $2 AND active",
    )
    .bind(document_id.get())
    .bind(scope.company_id().get())
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("count_lines", e))?;

    usize::try_from(count).map_err(|e| StoreError::Backend(format!("line count: {e}")))
}

async fn fetch_lines<'c>(
    executor: impl PgExecutor<'c>,
    scope: &Scope,
    document_id: DocumentId,
) -> Result<Vec<LineItem>, StoreError> {
    let sql = format!(
        "SELECT {LINE_COLUMNS} FROM line_items \
         WHERE document_id = $1 AND company_id = $2 AND (active OR NOT $3) \
         ORDER BY sequence, id"
    );
    let rows = sqlx::query(&sql)
        .bind(document_id.get())
        .bind(scope.company_id().get())
        .bind(scope.active_only())
        .fetch_all(executor)
        .await
        .map_err(|e| map_sqlx_error("fetch_lines", e))?;

    rows.iter()
        .map(line_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("decode_line", e))
}

fn document_from_row(row: &PgRow) -> Result<Document, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    Ok(Document {
        id: DocumentId::new(row.try_get("id")?),
        kind: kind
            .parse::<DocumentKind>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        company_id: CompanyId::new(row.try_get("company_id")?),
        name: row.try_get("name")?,
        partner_id: PartnerId::new(row.try_get("partner_id")?),
        date: row.try_get("date")?,
        description: row.try_get("description")?,
        state: DocumentState::from_code(row.try_get("state")?),
        totals: DocumentTotals {
            amount_untaxed: row.try_get("amount_untaxed")?,
            amount_exempt: row.try_get("amount_exempt")?,
            amount_tax_iva: row.try_get("amount_tax_iva")?,
            amount_tax_other: row.try_get("amount_tax_other")?,
            amount_tax_total: row.try_get("amount_tax_total")?,
            amount_total: row.try_get("amount_total")?,
        },
        active: row.try_get("active")?,
        created_by: UserId::new(row.try_get("created_by")?),
        updated_by: row.try_get::<Option<i64>, _>("updated_by")?.map(UserId::new),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn line_from_row(row: &PgRow) -> Result<LineItem, sqlx::Error> {
    let sequence: i32 = row.try_get("sequence")?;
    Ok(LineItem {
        id: LineItemId::new(row.try_get("id")?),
        document_id: DocumentId::new(row.try_get("document_id")?),
        company_id: CompanyId::new(row.try_get("company_id")?),
        sequence: u32::try_from(sequence).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        values: LineValues {
            product_id: ProductId::new(row.try_get("product_id")?),
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
            discount: row.try_get("discount")?,
            uom_id: row.try_get::<Option<i64>, _>("uom_id")?.map(UomId::new),
            tax_ids: tax_ids_from_db(row.try_get("tax_ids")?),
        },
        amounts: LineAmounts {
            amount_untaxed: row.try_get("amount_untaxed")?,
            amount_tax_iva: row.try_get("amount_tax_iva")?,
            amount_tax_other: row.try_get("amount_tax_other")?,
            amount_total: row.try_get("amount_total")?,
        },
        active: row.try_get("active")?,
    })
}

fn sequence_to_db(sequence: u32) -> Result<i32, StoreError> {
    i32::try_from(sequence).map_err(|_| StoreError::Constraint(format!("sequence {sequence} out of range")))
}

fn tax_ids_to_db(ids: &[TaxId]) -> Vec<i64> {
    ids.iter().map(|id| id.get()).collect()
}

fn tax_ids_from_db(ids: Vec<i64>) -> Vec<TaxId> {
    ids.into_iter().map(TaxId::new).collect()
}

/// Map SQLx errors to `StoreError`, tagging the failing operation.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
