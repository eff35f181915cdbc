use axum::{Router, routing::get};

use docket_infra::{CatalogStore, DocumentStore};

pub mod catalog;
pub mod documents;
pub mod invoices;
pub mod sales;
pub mod system;

/// Router for all company-scoped endpoints.
pub fn router<S>() -> Router
where
    S: DocumentStore + CatalogStore + 'static,
{
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/invoices", invoices::router::<S>())
        .nest("/sales", sales::router::<S>())
        .nest("/catalog", catalog::router::<S>())
}
