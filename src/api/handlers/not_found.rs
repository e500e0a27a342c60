use crate::api::error::ErrorBody;
use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::debug;

/// Catch-all for any method and path no route matched.
pub async fn not_found(method: axum::http::Method, uri: axum::http::Uri) -> impl IntoResponse {
    debug!(%method, %uri, "no route matched");

    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not Found")))
}
