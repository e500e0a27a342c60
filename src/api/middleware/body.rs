//! JSON body parsing stage.
//!
//! Runs before anything that reads the body, including the authentication
//! strategies. Parsed JSON is stored as a [`JsonBody`] request extension and
//! the raw bytes are put back so `Json<T>` extractors keep working.

use crate::api::error::ApiError;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use tracing::debug;

/// 100 KiB
pub const DEFAULT_JSON_LIMIT: usize = 100 * 1024;

/// Parsed request body; `{}` when the request carried no JSON.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonBody(pub Value);

impl Default for JsonBody {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

/// Parse `application/json` bodies up to `limit` bytes.
///
/// # Errors
/// Oversized, unreadable or invalid bodies are forwarded as [`ApiError`].
pub async fn parse_json_body(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    if !is_json(&parts.headers) {
        parts.extensions.insert(JsonBody::default());
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    if declared_length(&parts.headers).is_some_and(|length| length > limit) {
        return Err(ApiError::new("request entity too large"));
    }

    let bytes = to_bytes(body, limit)
        .await
        .map_err(|err| ApiError::new(format!("failed to read request body: {err}")))?;

    let value = parse_strict(&bytes)?;
    debug!(bytes = bytes.len(), "parsed JSON body");

    parts.extensions.insert(JsonBody(value));
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Only objects and arrays are accepted at the top level; an empty body is `{}`.
fn parse_strict(bytes: &[u8]) -> Result<Value, ApiError> {
    let Some(position) = bytes.iter().position(|b| !b.is_ascii_whitespace()) else {
        return Ok(Value::Object(Map::new()));
    };

    match bytes[position] {
        b'{' | b'[' => serde_json::from_slice(bytes)
            .map_err(|err| ApiError::new(format!("invalid JSON body: {err}"))),
        token => Err(ApiError::new(format!(
            "unexpected token {:?} in JSON at position {position}",
            char::from(token)
        ))),
    }
}
