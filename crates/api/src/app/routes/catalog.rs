//! Read-only catalog lookups for client-side line widgets.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use docket_infra::{CatalogStore, DocumentStore};

use crate::app::{dto, errors, services::AppServices};
use crate::context::CompanyContext;

pub fn router<S>() -> Router
where
    S: DocumentStore + CatalogStore + 'static,
{
    Router::new()
        .route("/product", get(load_product::<S>))
        .route("/tax", get(load_taxes::<S>))
}

/// `{"product": [...]}`: zero or one product.
pub async fn load_product<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(company): Extension<CompanyContext>,
    Query(params): Query<Vec<(String, String)>>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let id = match dto::product_query(&params) {
        Ok(Some(id)) => id,
        Ok(None) => return Json(serde_json::json!({ "product": [] })).into_response(),
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    };

    match services.store.products(&company.scope(), &[id]).await {
        Ok(products) => Json(serde_json::json!({ "product": products })).into_response(),
        Err(e) => errors::editor_error_to_response(e.into()),
    }
}

pub async fn load_taxes<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(company): Extension<CompanyContext>,
    Query(params): Query<Vec<(String, String)>>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let ids = match dto::tax_query(&params) {
        Ok(ids) => ids,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    };
    if ids.is_empty() {
        return Json(serde_json::json!({ "tax": [] })).into_response();
    }

    match services.store.taxes(&company.scope(), &ids).await {
        Ok(taxes) => Json(serde_json::json!({ "tax": taxes })).into_response(),
        Err(e) => errors::editor_error_to_response(e.into()),
    }
}
