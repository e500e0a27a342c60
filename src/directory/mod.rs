//! User directory contract.
//!
//! The directory owns persisted user records and exposes two verification
//! capabilities. Each capability is handed out once, at startup, as a function
//! value that the authentication strategies keep for the lifetime of the
//! process.
//!
//! A verifier resolves to:
//! - `Ok(Some(principal))` when the credential matches a user,
//! - `Ok(None)` when it does not,
//! - `Err(_)` when the directory itself could not be queried.

pub mod postgres;

pub use self::postgres::PgUserDirectory;

use crate::auth::{AuthRequest, Principal};
use secrecy::SecretString;
use std::{future::Future, pin::Pin, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory is unavailable: no database connection")]
    Unavailable,

    #[error("user directory query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("password verification failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password verification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type VerifyResult = Result<Option<Principal>, DirectoryError>;

pub type VerifyFuture = Pin<Box<dyn Future<Output = VerifyResult> + Send>>;

/// Checks `(request, email, password)` against the directory.
pub type PasswordVerifier =
    Arc<dyn Fn(AuthRequest, String, SecretString) -> VerifyFuture + Send + Sync>;

/// Checks a bearer token against the directory.
pub type BearerVerifier = Arc<dyn Fn(String) -> VerifyFuture + Send + Sync>;

pub trait UserDirectory: Send + Sync {
    /// Verification function for the password strategy.
    fn authenticate_local(&self) -> PasswordVerifier;

    /// Verification function for the bearer strategy.
    fn authenticate_bearer(&self) -> BearerVerifier;
}

/// Wrap an async closure into a [`PasswordVerifier`].
pub fn password_verifier<F, Fut>(verify: F) -> PasswordVerifier
where
    F: Fn(AuthRequest, String, SecretString) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = VerifyResult> + Send + 'static,
{
    Arc::new(move |request, email, password| Box::pin(verify(request, email, password)))
}

/// Wrap an async closure into a [`BearerVerifier`].
pub fn bearer_verifier<F, Fut>(verify: F) -> BearerVerifier
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = VerifyResult> + Send + 'static,
{
    Arc::new(move |token| Box::pin(verify(token)))
}
