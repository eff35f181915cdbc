//! Invoices and sale orders: master/detail business documents.
//!
//! This crate holds the deterministic part of the document lifecycle (no IO, no
//! HTTP, no storage): states and guards, header and line-item validation,
//! child-collection reconciliation, derived amounts and screen layouts.

pub mod catalog;
pub mod document;
pub mod form;
pub mod formset;
pub mod guard;
pub mod layout;
pub mod line;
pub mod state;
pub mod totals;
pub mod validation;

pub use catalog::{Partner, PartnerId, Product, ProductId, References, Tax, TaxId, TaxKind, UomId};
pub use document::{Document, DocumentHeader, DocumentId, DocumentKind, NewDocument};
pub use form::HeaderForm;
pub use formset::{
    LineFormset, LineRow, PlannedLine, ReconcilePlan, SubmittedLine, MAX_NUM_FORMS, reconcile,
};
pub use guard::{DeleteCheck, DeleteGuard, GuardDecision, StateGuard, StateRejection};
pub use layout::{Align, FieldSpec, ScreenLayout};
pub use line::{LineItem, LineItemId, LineValues, NewLineItem};
pub use state::DocumentState;
pub use totals::{DocumentTotals, LineAmounts};
pub use validation::{RowErrors, ValidationErrors};
