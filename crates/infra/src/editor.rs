//! Document editing pipeline (application-level orchestration).
//!
//! `DocumentEditor` is the single entry point for changing invoices and sale
//! orders. It composes the pure pieces from `docket-documents` with a
//! `DocumentStore` + `CatalogStore` backend:
//!
//! ```text
//! submission (header form + line formset)
//!   ↓
//! 1. Load the document (update/delete) and run the state guard
//!   ↓
//! 2. Resolve every referenced partner, product and tax in the caller's scope
//!   ↓
//! 3. Begin a unit of work, re-read state and current line ids
//!   ↓
//! 4. Validate header and rows together; any error rolls back, nothing written
//!   ↓
//! 5. Reconcile rows against stored lines, price them, total the document
//!   ↓
//! 6. Write parent first, then line deletes / updates / inserts, then commit
//! ```
//!
//! Validation failures, state rejections and blocked deletes are outcomes, not
//! errors. `EditorError` is reserved for a missing document and for storage
//! or invariant failures, and every error path rolls the unit of work back.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{Span, debug, error, info, instrument, warn};

use docket_core::{DomainError, Entity, Scope, UserId};
use docket_documents::{
    DeleteCheck, DeleteGuard, Document, DocumentId, DocumentKind, DocumentState, DocumentTotals,
    GuardDecision, HeaderForm, LineAmounts, LineFormset, LineItem, LineItemId, NewDocument,
    NewLineItem, PlannedLine, References, ScreenLayout, StateGuard, StateRejection,
    ValidationErrors, reconcile,
};

use crate::store::{
    CatalogStore, DocumentRepository, DocumentStore, LineItemRepository, StoreError, UnitOfWork,
};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{kind} {id} not found")]
    NotFound { kind: DocumentKind, id: DocumentId },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A pure-domain invariant failed after validation passed.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Header form plus line formset, submitted together.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub header: HeaderForm,
    pub lines: LineFormset,
}

/// A document with its ordered active lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(DocumentDetail),
    Invalid(ValidationErrors),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Saved(DocumentDetail),
    Invalid(ValidationErrors),
    RejectedByState(StateRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { document_id: DocumentId, message: String },
    Blocked { message: String },
}

/// Create/update/delete for one document kind.
pub struct DocumentEditor<S> {
    store: Arc<S>,
    kind: DocumentKind,
}

impl<S> Clone for DocumentEditor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            kind: self.kind,
        }
    }
}

impl<S> DocumentEditor<S>
where
    S: DocumentStore + CatalogStore,
{
    pub fn new(store: Arc<S>, kind: DocumentKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn layout(&self) -> ScreenLayout {
        ScreenLayout::for_kind(self.kind)
    }

    /// Active documents of this kind, ordered by id.
    pub async fn list(&self, scope: &Scope) -> Result<Vec<Document>, EditorError> {
        Ok(self.store.list_documents(scope, self.kind).await?)
    }

    pub async fn detail(&self, scope: &Scope, id: DocumentId) -> Result<DocumentDetail, EditorError> {
        let document = self.load(scope, id).await?;
        let lines = self.store.document_lines(scope, id).await?;
        Ok(DocumentDetail { document, lines })
    }

    /// Validate and persist a new Draft document with its lines, atomically.
    #[instrument(
        skip_all,
        fields(
            kind = %self.kind,
            company_id = %scope.company_id(),
            user_id = %user,
            document_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn create(
        &self,
        scope: &Scope,
        user: UserId,
        submission: Submission,
    ) -> Result<CreateOutcome, EditorError> {
        let refs = self.resolve_references(scope, &submission).await?;
        let now = Utc::now();

        let mut errors = ValidationErrors::new();
        let header = submission
            .header
            .validate(&refs, now.date_naive(), &mut errors);
        let submitted = submission.lines.validate_new(&refs, &mut errors);
        let header = match header {
            Some(header) if errors.is_empty() => header,
            _ => {
                warn!(%errors, "create rejected by validation");
                return Ok(CreateOutcome::Invalid(errors));
            }
        };

        let plan = reconcile(&BTreeSet::new(), submitted);
        let priced = price(plan.insert, &refs)?;
        let totals = DocumentTotals::accumulate(priced.iter().map(|(l, a)| (&l.values, a)))?;

        let new_document = NewDocument {
            kind: self.kind,
            header,
            totals,
            created_by: user,
            created_at: now,
        };

        let mut tx = self.store.begin().await?;
        let detail = match write_new(&mut tx, scope, new_document, priced).await {
            Ok(detail) => detail,
            Err(err) => return Err(abort(tx, err).await),
        };
        tx.commit().await?;

        Span::current().record("document_id", detail.document.id.get());
        info!(
            name = %detail.document.name,
            line_count = detail.lines.len(),
            amount_total = %detail.document.totals.amount_total,
            "document created"
        );
        Ok(CreateOutcome::Created(detail))
    }

    /// Replace header and line collection of a Draft document, atomically.
    #[instrument(
        skip_all,
        fields(kind = %self.kind, company_id = %scope.company_id(), user_id = %user, document_id = %id),
        err
    )]
    pub async fn update(
        &self,
        scope: &Scope,
        user: UserId,
        id: DocumentId,
        submission: Submission,
    ) -> Result<UpdateOutcome, EditorError> {
        let document = self.load(scope, id).await?;
        if let GuardDecision::Reject(rejection) = StateGuard::enforce(&document) {
            warn!(state = %rejection.state, "update rejected by document state");
            return Ok(UpdateOutcome::RejectedByState(rejection));
        }

        let refs = self.resolve_references(scope, &submission).await?;

        let mut tx = self.store.begin().await?;
        match self.update_in_tx(&mut tx, scope, user, id, submission, &refs).await {
            Ok(UpdateOutcome::Saved(detail)) => {
                tx.commit().await?;
                info!(
                    line_count = detail.lines.len(),
                    amount_total = %detail.document.totals.amount_total,
                    "document saved"
                );
                Ok(UpdateOutcome::Saved(detail))
            }
            Ok(outcome) => {
                tx.rollback().await?;
                match &outcome {
                    UpdateOutcome::Invalid(errors) => warn!(%errors, "update rejected by validation"),
                    UpdateOutcome::RejectedByState(rejection) => {
                        warn!(state = %rejection.state, "update rejected by document state")
                    }
                    UpdateOutcome::Saved(_) => {}
                }
                Ok(outcome)
            }
            Err(err) => Err(abort(tx, err).await),
        }
    }

    async fn update_in_tx(
        &self,
        tx: &mut S::Tx,
        scope: &Scope,
        user: UserId,
        id: DocumentId,
        submission: Submission,
        refs: &References,
    ) -> Result<UpdateOutcome, EditorError> {
        // State may have moved between the first read and the lock.
        let mut document = tx
            .find_document(scope, id)
            .await?
            .filter(|d| d.kind == self.kind)
            .ok_or(EditorError::NotFound { kind: self.kind, id })?;
        if let GuardDecision::Reject(rejection) = StateGuard::enforce(&document) {
            return Ok(UpdateOutcome::RejectedByState(rejection));
        }

        let existing: BTreeSet<LineItemId> = tx
            .list_lines(scope, id)
            .await?
            .iter()
            .map(Entity::id)
            .collect();

        let mut errors = ValidationErrors::new();
        let header = submission.header.validate(refs, document.date, &mut errors);
        let submitted = submission.lines.validate(&existing, refs, &mut errors);
        let header = match header {
            Some(header) if errors.is_empty() => header,
            _ => return Ok(UpdateOutcome::Invalid(errors)),
        };

        let plan = reconcile(&existing, submitted);
        debug!(
            inserts = plan.insert.len(),
            updates = plan.update.len(),
            deletes = plan.delete.len(),
            writes = plan.write_count(),
            "line reconciliation planned"
        );
        let updates = plan
            .update
            .into_iter()
            .map(|(line_id, planned)| {
                let amounts = LineAmounts::compute(&planned.values, refs)?;
                Ok((line_id, planned, amounts))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let inserts = price(plan.insert, refs)?;

        let totals = DocumentTotals::accumulate(
            updates
                .iter()
                .map(|(_, l, a)| (&l.values, a))
                .chain(inserts.iter().map(|(l, a)| (&l.values, a))),
        )?;
        document.apply_header(header, totals, user, Utc::now());

        tx.update_document(scope, &document).await?;
        for line_id in &plan.delete {
            tx.delete_line(scope, *line_id).await?;
        }
        for (line_id, planned, amounts) in &updates {
            tx.update_line(scope, *line_id, planned.sequence, &planned.values, amounts)
                .await?;
        }
        for (planned, amounts) in inserts {
            tx.insert_line(
                scope,
                NewLineItem {
                    document_id: id,
                    sequence: planned.sequence,
                    values: planned.values,
                    amounts,
                },
            )
            .await?;
        }

        let lines = tx.list_lines(scope, id).await?;
        Ok(UpdateOutcome::Saved(DocumentDetail { document, lines }))
    }

    /// Soft-delete a document that has no lines left.
    #[instrument(
        skip_all,
        fields(kind = %self.kind, company_id = %scope.company_id(), user_id = %user, document_id = %id),
        err
    )]
    pub async fn delete(
        &self,
        scope: &Scope,
        user: UserId,
        id: DocumentId,
    ) -> Result<DeleteOutcome, EditorError> {
        let mut tx = self.store.begin().await?;
        match self.delete_in_tx(&mut tx, scope, user, id).await {
            Ok(outcome @ DeleteOutcome::Deleted { .. }) => {
                tx.commit().await?;
                info!("document deleted");
                Ok(outcome)
            }
            Ok(outcome) => {
                tx.rollback().await?;
                if let DeleteOutcome::Blocked { message } = &outcome {
                    warn!(%message, "delete blocked by attached lines");
                }
                Ok(outcome)
            }
            Err(err) => Err(abort(tx, err).await),
        }
    }

    async fn delete_in_tx(
        &self,
        tx: &mut S::Tx,
        scope: &Scope,
        user: UserId,
        id: DocumentId,
    ) -> Result<DeleteOutcome, EditorError> {
        let document = tx
            .find_document(scope, id)
            .await?
            .filter(|d| d.kind == self.kind)
            .ok_or(EditorError::NotFound { kind: self.kind, id })?;
        let attached = tx.count_lines(scope, id).await?;

        match DeleteGuard::check(&document, attached) {
            DeleteCheck::Blocked { message } => Ok(DeleteOutcome::Blocked { message }),
            DeleteCheck::Allowed { .. } => {
                tx.deactivate_document(scope, id, user, Utc::now()).await?;
                Ok(DeleteOutcome::Deleted {
                    document_id: id,
                    message: format!("The {} {} was deleted.", self.kind.label(), document.name),
                })
            }
        }
    }

    /// What a delete would do right now, without doing it.
    pub async fn delete_preview(
        &self,
        scope: &Scope,
        id: DocumentId,
    ) -> Result<DeleteCheck, EditorError> {
        let document = self.load(scope, id).await?;
        let attached = self.store.count_lines(scope, id).await?;
        Ok(DeleteGuard::check(&document, attached))
    }

    /// Set the state column to any value. No transition rules apply.
    #[instrument(
        skip_all,
        fields(kind = %self.kind, company_id = %scope.company_id(), user_id = %user, document_id = %id),
        err
    )]
    pub async fn set_state(
        &self,
        scope: &Scope,
        user: UserId,
        id: DocumentId,
        state: DocumentState,
    ) -> Result<Document, EditorError> {
        let previous = self.load(scope, id).await?.state;
        let document = self
            .store
            .set_state(scope, id, state, user, Utc::now())
            .await?
            .ok_or(EditorError::NotFound { kind: self.kind, id })?;

        if !previous.is_draft() && previous != state {
            warn!(from = %previous, to = %state, "document state moved out of a non-draft state");
        } else {
            info!(from = %previous, to = %state, "document state changed");
        }
        Ok(document)
    }

    async fn load(&self, scope: &Scope, id: DocumentId) -> Result<Document, EditorError> {
        self.store
            .get_document(scope, id)
            .await?
            .filter(|d| d.kind == self.kind)
            .ok_or(EditorError::NotFound { kind: self.kind, id })
    }

    /// Look up everything the submission mentions. Must run outside a unit of
    /// work: some backends serialise all access behind the transaction.
    async fn resolve_references(
        &self,
        scope: &Scope,
        submission: &Submission,
    ) -> Result<References, StoreError> {
        let partner_ids: Vec<_> = submission.header.partner_id.into_iter().collect();
        let partners = if partner_ids.is_empty() {
            Vec::new()
        } else {
            self.store.partners(scope, &partner_ids).await?
        };

        let product_ids = submission.lines.product_ids();
        let products = if product_ids.is_empty() {
            Vec::new()
        } else {
            self.store.products(scope, &product_ids).await?
        };

        let tax_ids = submission.lines.tax_ids();
        let taxes = if tax_ids.is_empty() {
            Vec::new()
        } else {
            self.store.taxes(scope, &tax_ids).await?
        };

        Ok(References::new(partners, products, taxes))
    }
}

fn price(
    lines: Vec<PlannedLine>,
    refs: &References,
) -> Result<Vec<(PlannedLine, LineAmounts)>, DomainError> {
    lines
        .into_iter()
        .map(|line| {
            let amounts = LineAmounts::compute(&line.values, refs)?;
            Ok((line, amounts))
        })
        .collect()
}

/// Parent first, so every child insert has a real document id to point at.
async fn write_new<T: UnitOfWork>(
    tx: &mut T,
    scope: &Scope,
    document: NewDocument,
    lines: Vec<(PlannedLine, LineAmounts)>,
) -> Result<DocumentDetail, EditorError> {
    let document = tx.insert_document(scope, document).await?;
    let mut written = Vec::with_capacity(lines.len());
    for (planned, amounts) in lines {
        let line = tx
            .insert_line(
                scope,
                NewLineItem {
                    document_id: document.id,
                    sequence: planned.sequence,
                    values: planned.values,
                    amounts,
                },
            )
            .await?;
        written.push(line);
    }
    Ok(DocumentDetail {
        document,
        lines: written,
    })
}

async fn abort<T: UnitOfWork>(tx: T, err: EditorError) -> EditorError {
    if let Err(rollback_err) = tx.rollback().await {
        error!(error = %rollback_err, "rollback failed");
    }
    err
}
