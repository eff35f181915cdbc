use axum::{
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use docket_core::{CompanyId, UserId};

use crate::app::errors;
use crate::context::{CompanyContext, UserContext};

pub const USER_HEADER: &str = "x-user-id";
pub const COMPANY_HEADER: &str = "x-company-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag every request with a UUIDv7 request id and run it inside a span.
pub async fn request_id_middleware(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::now_v7();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut res = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Derive company and user context from the headers set by the upstream
/// authentication layer. Requests without them are rejected with 401.
pub async fn context_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let user_id: UserId = header_id(req.headers(), USER_HEADER)?;
    let company_id: CompanyId = header_id(req.headers(), COMPANY_HEADER)?;

    req.extensions_mut().insert(CompanyContext::new(company_id));
    req.extensions_mut().insert(UserContext::new(user_id));

    Ok(next.run(req).await)
}

fn header_id<T: std::str::FromStr>(headers: &HeaderMap, name: &'static str) -> Result<T, Response> {
    let unauthorized = || {
        errors::json_error(
            axum::http::StatusCode::UNAUTHORIZED,
            "unauthorized",
            format!("missing or invalid {name} header"),
        )
    };

    let value = headers.get(name).ok_or_else(unauthorized)?;
    let value = value.to_str().map_err(|_| unauthorized())?;
    value.trim().parse::<T>().map_err(|_| unauthorized())
}
