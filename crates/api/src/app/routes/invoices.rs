use axum::{Extension, Router};

use docket_documents::DocumentKind;
use docket_infra::{CatalogStore, DocumentStore};

use super::documents;

/// `/invoices`: the invoice editor.
pub fn router<S>() -> Router
where
    S: DocumentStore + CatalogStore + 'static,
{
    documents::router::<S>().layer(Extension(DocumentKind::Invoice))
}
