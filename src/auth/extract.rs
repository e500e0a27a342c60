//! Route-level strategy selection.
//!
//! A handler asks for an identity by taking [`PasswordAuth`] or [`BearerAuth`]
//! as an argument. Recoverable failures become `400`/`401` responses right
//! away; directory failures are forwarded to the terminal error stage.

use super::{AuthError, AuthRequest, Authenticator, Principal, StrategyKind, BEARER_REALM};
use crate::api::error::{ApiError, ErrorBody};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::WWW_AUTHENTICATE, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Principal authenticated with the `local` (email and password) strategy.
#[derive(Clone, Debug)]
pub struct PasswordAuth(pub Principal);

/// Principal authenticated with the `bearer` strategy.
#[derive(Clone, Debug)]
pub struct BearerAuth(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for PasswordAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, StrategyKind::Local).await.map(Self)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, StrategyKind::Bearer).await.map(Self)
    }
}

async fn authenticate(parts: &Parts, kind: StrategyKind) -> Result<Principal, Response> {
    let Some(authenticator) = parts.extensions.get::<Arc<Authenticator>>().cloned() else {
        return Err(ApiError::new("authentication is not initialized")
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response());
    };

    let request = AuthRequest::from_parts(parts);
    authenticator
        .authenticate(kind, &request)
        .await
        .map_err(IntoResponse::into_response)
}

fn bearer_challenge(error: Option<&str>) -> HeaderValue {
    let challenge = match error {
        Some(error) => format!("Bearer realm=\"{BEARER_REALM}\", error=\"{error}\""),
        None => format!("Bearer realm=\"{BEARER_REALM}\""),
    };
    HeaderValue::from_str(&challenge).unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = Json(ErrorBody::new(message.clone()));

        match self {
            Self::MissingCredentials => (StatusCode::BAD_REQUEST, body).into_response(),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, body).into_response(),
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, bearer_challenge(None))],
                body,
            )
                .into_response(),
            Self::MalformedRequest => (
                StatusCode::BAD_REQUEST,
                [(WWW_AUTHENTICATE, bearer_challenge(Some("invalid_request")))],
                body,
            )
                .into_response(),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, bearer_challenge(Some("invalid_token")))],
                body,
            )
                .into_response(),
            Self::LookupFailure(_) => ApiError::new(message).into_response(),
            Self::UnknownStrategy(_) => ApiError::new(message)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response(),
        }
    }
}
