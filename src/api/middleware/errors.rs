//! Terminal error stage.

use crate::api::error::{
    effective_status, ApiError, ErrorBody, ForwardedError, Mode, GENERIC_ERROR_MESSAGE,
};
use axum::{
    extract::{Request, State},
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use tracing::error;

/// Settle every response that carries a [`ForwardedError`].
///
/// The status is forced to an error code and the body becomes
/// `{"error": <message>}`, or `{"error": "An error occurred"}` in production.
/// Headers set by earlier stages are kept.
pub async fn forward_errors(State(mode): State<Mode>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let Some(forwarded) = parts.extensions.remove::<ForwardedError>() else {
        return Response::from_parts(parts, body);
    };

    let status = effective_status(parts.status);
    error!(status = status.as_u16(), "{}", forwarded.message);

    let message = if mode.is_production() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        forwarded.message
    };

    let mut rewritten = (status, Json(ErrorBody::new(message))).into_response();
    for (name, value) in &parts.headers {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rewritten.headers_mut().append(name, value.clone());
        }
    }
    rewritten
}

/// Turn a handler panic into a forwarded error.
pub fn panic_to_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "request handler panicked".to_string()
    };

    ApiError::new(detail).into_response()
}
