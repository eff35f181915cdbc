//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store backend selection and editor construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and mapping to editor input
//! - `errors.rs`: consistent error and outcome responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use docket_infra::{CatalogStore, DocketConfig, DocumentStore, StoreError};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router for the configured backend (used by `main.rs`).
pub async fn build_app(config: &DocketConfig) -> Result<Router, StoreError> {
    Ok(match services::build_backend(config).await? {
        services::Backend::InMemory(store) => build_app_with_store(store),
        services::Backend::Postgres(store) => build_app_with_store(store),
    })
}

/// Build the router on an explicit store.
pub fn build_app_with_store<S>(store: S) -> Router
where
    S: DocumentStore + CatalogStore + 'static,
{
    let services = Arc::new(services::AppServices::new(store));

    // Document routes: require company + user context.
    let protected = routes::router::<S>()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::context_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        )))
}
