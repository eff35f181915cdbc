use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use docket_documents::{DocumentId, DocumentState, StateRejection, ValidationErrors};
use docket_infra::{EditorError, StoreError};

pub fn editor_error_to_response(err: EditorError) -> axum::response::Response {
    match err {
        EditorError::NotFound { kind, id } => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{} {id} not found", kind.label()),
        ),
        EditorError::Store(StoreError::NotFound(msg)) => {
            json_error(StatusCode::NOT_FOUND, "not_found", msg)
        }
        EditorError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        EditorError::Domain(e) => {
            tracing::error!(error = %e, "invariant violated after validation");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invariant_violation",
                e.to_string(),
            )
        }
    }
}

pub fn validation_failed(errors: ValidationErrors) -> axum::response::Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.to_string(),
            "errors": errors,
        })),
    )
        .into_response()
}

/// The document's state forbids the edit; point the client at the read-only view.
pub fn state_rejected(rejection: StateRejection) -> axum::response::Response {
    (
        StatusCode::CONFLICT,
        axum::Json(json!({
            "error": "state_rejected",
            "message": rejection.warning,
            "warning": rejection.warning,
            "redirect": rejection.redirect_to,
            "state": rejection.state,
        })),
    )
        .into_response()
}

pub fn delete_blocked(message: String) -> axum::response::Response {
    json_error(StatusCode::CONFLICT, "delete_blocked", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_document_id(raw: &str) -> Result<DocumentId, axum::response::Response> {
    raw.parse::<DocumentId>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "id must be a positive integer",
        )
    })
}

pub fn parse_state(raw: &str) -> Result<DocumentState, axum::response::Response> {
    raw.trim()
        .parse::<i16>()
        .map(DocumentState::from_code)
        .map_err(|_| {
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_state",
                "state must be an integer",
            )
        })
}
