use axum::{Extension, Router};

use docket_documents::DocumentKind;
use docket_infra::{CatalogStore, DocumentStore};

use super::documents;

pub fn router<S>() -> Router
where
    S: DocumentStore + CatalogStore + 'static,
{
    Router::new().nest(
        "/orders",
        documents::router::<S>().layer(Extension(DocumentKind::SaleOrder)),
    )
}
