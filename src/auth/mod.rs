//! Authentication dispatch.
//!
//! Flow Overview: the pipeline attaches one [`Authenticator`] to every request.
//! Routes that need an identity pick a strategy through their extractor
//! ([`PasswordAuth`] or [`BearerAuth`]); the strategy pulls its credential out
//! of the request and hands it to the verifier supplied by the
//! [`UserDirectory`](crate::directory::UserDirectory). Nothing is persisted
//! between requests.

mod extract;
mod principal;
mod request;

pub use self::extract::{BearerAuth, PasswordAuth};
pub use self::principal::Principal;
pub use self::request::AuthRequest;

use crate::directory::{BearerVerifier, DirectoryError, PasswordVerifier, UserDirectory};
use regex::Regex;
use secrecy::SecretString;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

pub const USERNAME_FIELD: &str = "email";
pub const PASSWORD_FIELD: &str = "password";
pub const ACCESS_TOKEN_FIELD: &str = "access_token";
pub const BEARER_REALM: &str = "Users";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Malformed authorization request")]
    MalformedRequest,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    LookupFailure(#[from] DirectoryError),

    #[error("Unknown authentication strategy \"{0}\"")]
    UnknownStrategy(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    /// Email and password.
    Local,
    /// Opaque bearer token.
    Bearer,
}

impl StrategyKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Bearer => "bearer",
        }
    }
}

/// Email and password submitted to the `local` strategy, from the JSON body
/// or the query string.
#[derive(ToSchema, Debug)]
pub struct Credentials {
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

/// Forwards the raw request to its verifier along with the credential.
pub struct PasswordStrategy {
    pub username_field: &'static str,
    pub password_field: &'static str,
    verify: PasswordVerifier,
}

impl PasswordStrategy {
    #[must_use]
    pub fn new(verify: PasswordVerifier) -> Self {
        Self {
            username_field: USERNAME_FIELD,
            password_field: PASSWORD_FIELD,
            verify,
        }
    }

    /// Read `email` and `password` from the parsed body, then the query string.
    ///
    /// # Errors
    /// Returns [`AuthError::MissingCredentials`] if either field is absent or empty.
    pub fn credentials(&self, request: &AuthRequest) -> Result<Credentials, AuthError> {
        let email = request.field(self.username_field);
        let password = request.field(self.password_field);

        match (email, password) {
            (Some(email), Some(password)) => Ok(Credentials {
                email,
                password: SecretString::from(password),
            }),
            _ => Err(AuthError::MissingCredentials),
        }
    }

    /// Check a credential against the directory.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] on mismatch and
    /// [`AuthError::LookupFailure`] if the directory cannot be queried.
    pub async fn verify(
        &self,
        request: &AuthRequest,
        email: &str,
        password: SecretString,
    ) -> Result<Principal, AuthError> {
        (self.verify)(request.clone(), email.to_string(), password)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

impl fmt::Debug for PasswordStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordStrategy")
            .field("username_field", &self.username_field)
            .field("password_field", &self.password_field)
            .finish_non_exhaustive()
    }
}

pub struct BearerStrategy {
    pub realm: &'static str,
    verify: BearerVerifier,
}

impl BearerStrategy {
    #[must_use]
    pub fn new(verify: BearerVerifier) -> Self {
        Self {
            realm: BEARER_REALM,
            verify,
        }
    }

    /// Find the token in the `Authorization` header, the `access_token` body
    /// field or the `access_token` query parameter. Exactly one source may be
    /// used.
    ///
    /// # Errors
    /// Returns [`AuthError::MalformedRequest`] for a malformed header or more
    /// than one token source, and [`AuthError::MissingToken`] when none is
    /// present.
    pub fn token(&self, request: &AuthRequest) -> Result<String, AuthError> {
        let mut token = None;

        if let Some(authorization) = request.authorization() {
            let parts: Vec<&str> = authorization.split(' ').collect();
            if parts.len() != 2 {
                return Err(AuthError::MalformedRequest);
            }
            if is_bearer_scheme(parts[0]) {
                token = Some(parts[1].to_string());
            }
        }

        if let Some(body_token) = request.body_field(ACCESS_TOKEN_FIELD) {
            if token.is_some() {
                return Err(AuthError::MalformedRequest);
            }
            token = Some(body_token);
        }

        if let Some(query_token) = request.query_param(ACCESS_TOKEN_FIELD) {
            if token.is_some() {
                return Err(AuthError::MalformedRequest);
            }
            token = Some(query_token);
        }

        token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)
    }

    /// Check a token against the directory.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] for unknown or expired tokens and
    /// [`AuthError::LookupFailure`] if the directory cannot be queried.
    pub async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        (self.verify)(token.to_string())
            .await?
            .ok_or(AuthError::InvalidToken)
    }
}

impl fmt::Debug for BearerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerStrategy")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

fn is_bearer_scheme(scheme: &str) -> bool {
    Regex::new(r"(?i)^bearer$").is_ok_and(|re| re.is_match(scheme))
}

#[derive(Debug)]
pub enum Strategy {
    Password(PasswordStrategy),
    Bearer(BearerStrategy),
}

impl Strategy {
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Password(_) => StrategyKind::Local,
            Self::Bearer(_) => StrategyKind::Bearer,
        }
    }

    /// Extract the credential this strategy understands and verify it.
    ///
    /// # Errors
    /// Returns the [`AuthError`] describing why the request is not authenticated.
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<Principal, AuthError> {
        match self {
            Self::Password(strategy) => {
                let Credentials { email, password } = strategy.credentials(request)?;
                strategy.verify(request, &email, password).await
            }
            Self::Bearer(strategy) => {
                let token = strategy.token(request)?;
                strategy.verify(&token).await
            }
        }
    }
}

/// Registered strategies, built once at startup and shared by every request.
#[derive(Debug)]
pub struct Authenticator {
    strategies: Vec<Strategy>,
}

impl Authenticator {
    #[must_use]
    pub fn new(directory: &dyn UserDirectory) -> Self {
        Self {
            strategies: vec![
                Strategy::Password(PasswordStrategy::new(directory.authenticate_local())),
                Strategy::Bearer(BearerStrategy::new(directory.authenticate_bearer())),
            ],
        }
    }

    #[must_use]
    pub fn strategy(&self, kind: StrategyKind) -> Option<&Strategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.kind() == kind)
    }

    /// Run the strategy selected by the route against the request.
    ///
    /// # Errors
    /// Returns the strategy's [`AuthError`], or [`AuthError::UnknownStrategy`].
    #[instrument(skip_all, fields(strategy = kind.name()))]
    pub async fn authenticate(
        &self,
        kind: StrategyKind,
        request: &AuthRequest,
    ) -> Result<Principal, AuthError> {
        let strategy = self
            .strategy(kind)
            .ok_or(AuthError::UnknownStrategy(kind.name()))?;

        let result = strategy.authenticate(request).await;
        match &result {
            Ok(principal) => debug!(user_id = %principal.id, "authenticated"),
            Err(AuthError::LookupFailure(err)) => warn!("user directory lookup failed: {err}"),
            Err(err) => debug!("authentication failed: {err}"),
        }
        result
    }

    /// Verify an email/password pair through the password strategy.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] on mismatch and
    /// [`AuthError::LookupFailure`] if the directory cannot be queried.
    pub async fn verify_password(
        &self,
        request: &AuthRequest,
        email: &str,
        password: SecretString,
    ) -> Result<Principal, AuthError> {
        match self.strategy(StrategyKind::Local) {
            Some(Strategy::Password(strategy)) => strategy.verify(request, email, password).await,
            _ => Err(AuthError::UnknownStrategy(StrategyKind::Local.name())),
        }
    }

    /// Verify a bearer token through the bearer strategy.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] for unknown tokens and
    /// [`AuthError::LookupFailure`] if the directory cannot be queried.
    pub async fn verify_bearer(&self, token: &str) -> Result<Principal, AuthError> {
        match self.strategy(StrategyKind::Bearer) {
            Some(Strategy::Bearer(strategy)) => strategy.verify(token).await,
            _ => Err(AuthError::UnknownStrategy(StrategyKind::Bearer.name())),
        }
    }
}
