//! `/user` route group.
//!
//! Each route picks its authentication strategy through its extractor:
//! `log_in` takes [`PasswordAuth`], `me` takes [`BearerAuth`].

use super::not_found::not_found;
use crate::{
    api::error::ErrorBody,
    auth::{BearerAuth, Credentials, PasswordAuth, Principal},
};
use axum::{
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

/// Routes mounted under `/user`; other methods on these paths fall through to the 404.
pub fn router() -> Router {
    Router::new()
        .route("/log_in", post(log_in).fallback(not_found))
        .route("/me", get(me).fallback(not_found))
}

#[utoipa::path(
    post,
    path = "/user/log_in",
    request_body = Credentials,
    responses(
        (status = 200, description = "Credentials accepted", body = Principal, content_type = "application/json"),
        (status = 400, description = "Missing credentials or directory failure", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    ),
    tag = "user"
)]
#[instrument(skip_all, fields(user_id = %principal.id))]
pub async fn log_in(PasswordAuth(principal): PasswordAuth) -> Json<Principal> {
    info!("user logged in");

    Json(principal)
}

#[utoipa::path(
    get,
    path = "/user/me",
    responses(
        (status = 200, description = "Token accepted", body = Principal, content_type = "application/json"),
        (status = 400, description = "Malformed authorization or directory failure", body = ErrorBody),
        (status = 401, description = "Missing, unknown or expired token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip_all, fields(user_id = %principal.id))]
pub async fn me(BearerAuth(principal): BearerAuth) -> Json<Principal> {
    Json(principal)
}
