//! Errors forwarded to the terminal error stage.
//!
//! Any stage or handler that cannot turn a failure into a response of its own
//! returns an [`ApiError`]. Its response carries a [`ForwardedError`] marker
//! that [`forward_errors`](crate::api::middleware::forward_errors) picks up to
//! settle the final status and redact the message in production.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Message returned in place of any forwarded error in production.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Body of every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Deployment mode, taken from `NODE_ENV`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    Production,
    #[default]
    Development,
}

impl Mode {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Mode {
    type Err = std::convert::Infallible;

    // Only the exact value "production" enables redaction.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(if value == "production" {
            Self::Production
        } else {
            Self::Development
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Development => f.write_str("development"),
        }
    }
}

/// Response extension marking an error that still has to pass the terminal stage.
#[derive(Clone, Debug)]
pub struct ForwardedError {
    pub message: String,
}

/// An unhandled error on its way to the terminal error stage.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: Option<StatusCode>,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Keep `status` if it is already an error code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status the response ends up with, see [`effective_status`].
    #[must_use]
    pub fn status(&self) -> StatusCode {
        effective_status(self.status.unwrap_or(StatusCode::OK))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(ErrorBody::new(self.message.clone()))).into_response();
        response.extensions_mut().insert(ForwardedError {
            message: self.message,
        });
        response
    }
}

/// Downgrade every non-error status to `400 Bad Request`.
///
/// Not only the default `200`: `1xx`, any other `2xx` and `3xx` are
/// downgraded too, so a forwarded error always ends with a `4xx` or `5xx`.
#[must_use]
pub fn effective_status(status: StatusCode) -> StatusCode {
    if status.is_client_error() || status.is_server_error() {
        status
    } else {
        StatusCode::BAD_REQUEST
    }
}
