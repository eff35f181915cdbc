//! Handlers shared by every document kind.
//!
//! The kind is injected as an `Extension<DocumentKind>` by the router that
//! mounts these routes (`invoices.rs`, `sales.rs`).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use docket_documents::{DocumentKind, ScreenLayout};
use docket_infra::{CatalogStore, CreateOutcome, DeleteOutcome, DocumentStore, UpdateOutcome};

use crate::app::{dto, errors, services::AppServices};
use crate::context::{CompanyContext, UserContext};

pub fn router<S>() -> Router
where
    S: DocumentStore + CatalogStore + 'static,
{
    Router::new()
        .route("/", get(list_documents::<S>).post(create_document::<S>))
        .route("/layout", get(screen_layout))
        .route(
            "/:id",
            get(get_document::<S>)
                .put(update_document::<S>)
                .delete(delete_document::<S>),
        )
        .route("/:id/delete", get(delete_preview::<S>))
        .route("/:id/state/:state", post(set_document_state::<S>))
}

pub async fn list_documents<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    match services.editor(kind).list(&company.scope()).await {
        Ok(items) => Json(dto::DocumentListResponse { items }).into_response(),
        Err(e) => errors::editor_error_to_response(e),
    }
}

pub async fn screen_layout(Extension(kind): Extension<DocumentKind>) -> Json<ScreenLayout> {
    Json(ScreenLayout::for_kind(kind))
}

pub async fn get_document<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let id = match errors::parse_document_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.editor(kind).detail(&company.scope(), id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => errors::editor_error_to_response(e),
    }
}

pub async fn create_document<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
    Extension(user): Extension<UserContext>,
    Json(body): Json<dto::DocumentRequest>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let outcome = services
        .editor(kind)
        .create(&company.scope(), user.user_id(), body.into_submission())
        .await;

    match outcome {
        Ok(CreateOutcome::Created(detail)) => (StatusCode::CREATED, Json(detail)).into_response(),
        Ok(CreateOutcome::Invalid(errs)) => errors::validation_failed(errs),
        Err(e) => errors::editor_error_to_response(e),
    }
}

pub async fn update_document<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::DocumentRequest>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let id = match errors::parse_document_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let outcome = services
        .editor(kind)
        .update(&company.scope(), user.user_id(), id, body.into_submission())
        .await;

    match outcome {
        Ok(UpdateOutcome::Saved(detail)) => Json(detail).into_response(),
        Ok(UpdateOutcome::Invalid(errs)) => errors::validation_failed(errs),
        Ok(UpdateOutcome::RejectedByState(rejection)) => errors::state_rejected(rejection),
        Err(e) => errors::editor_error_to_response(e),
    }
}

pub async fn delete_preview<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let id = match errors::parse_document_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.editor(kind).delete_preview(&company.scope(), id).await {
        Ok(check) => Json(check).into_response(),
        Err(e) => errors::editor_error_to_response(e),
    }
}

pub async fn delete_document<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let id = match errors::parse_document_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.editor(kind).delete(&company.scope(), user.user_id(), id).await {
        Ok(DeleteOutcome::Deleted {
            document_id,
            message,
        }) => Json(serde_json::json!({
            "id": document_id,
            "message": message,
        }))
        .into_response(),
        Ok(DeleteOutcome::Blocked { message }) => errors::delete_blocked(message),
        Err(e) => errors::editor_error_to_response(e),
    }
}

/// Unconditional state change. Any integer is accepted.
pub async fn set_document_state<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(kind): Extension<DocumentKind>,
    Extension(company): Extension<CompanyContext>,
    Extension(user): Extension<UserContext>,
    Path((id, state)): Path<(String, String)>,
) -> axum::response::Response
where
    S: DocumentStore + CatalogStore + 'static,
{
    let id = match errors::parse_document_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let state = match errors::parse_state(&state) {
        Ok(state) => state,
        Err(resp) => return resp,
    };

    match services
        .editor(kind)
        .set_state(&company.scope(), user.user_id(), id, state)
        .await
    {
        Ok(document) => Json(document).into_response(),
        Err(e) => errors::editor_error_to_response(e),
    }
}
