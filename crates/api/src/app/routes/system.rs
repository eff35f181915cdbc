use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::{CompanyContext, UserContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(company): Extension<CompanyContext>,
    Extension(user): Extension<UserContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "company_id": company.company_id(),
        "user_id": user.user_id(),
    }))
}
