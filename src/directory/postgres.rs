//! Postgres-backed user directory.
//!
//! Flow Overview: normalize the email, fetch the stored bcrypt hash and verify
//! it off the async runtime; bearer tokens are hashed with SHA-256 and matched
//! against unexpired rows. Raw tokens are never stored or compared in SQL.

use super::{
    bearer_verifier, password_verifier, BearerVerifier, DirectoryError, PasswordVerifier,
    UserDirectory,
};
use crate::auth::Principal;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

/// Directory over the `users` table.
///
/// `pool` is `None` when no database connection could be configured at startup;
/// every lookup then fails with [`DirectoryError::Unavailable`].
#[derive(Clone, Debug)]
pub struct PgUserDirectory {
    pool: Option<PgPool>,
}

impl PgUserDirectory {
    #[must_use]
    pub const fn new(pool: Option<PgPool>) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PgUserDirectory {
    fn authenticate_local(&self) -> PasswordVerifier {
        let pool = self.pool.clone();
        password_verifier(move |_request, email, password| {
            let pool = pool.clone();
            async move {
                let pool = pool.ok_or(DirectoryError::Unavailable)?;
                verify_password(&pool, &email, password).await
            }
        })
    }

    fn authenticate_bearer(&self) -> BearerVerifier {
        let pool = self.pool.clone();
        bearer_verifier(move |token| {
            let pool = pool.clone();
            async move {
                let pool = pool.ok_or(DirectoryError::Unavailable)?;
                lookup_token(&pool, &hash_token(&token)).await
            }
        })
    }
}

/// Stored emails keep their original case; lookups compare `lower(email)`
/// against the normalized submission. `users_email_lower_key` keeps that unique.
const PASSWORD_QUERY: &str = r"
    SELECT id, email, password_hash
    FROM users
    WHERE lower(email) = $1
    LIMIT 1
";

/// Normalize an email for lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a bearer token so only digests reach the database.
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

async fn verify_password(
    pool: &PgPool,
    email: &str,
    password: SecretString,
) -> Result<Option<Principal>, DirectoryError> {
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = PASSWORD_QUERY
    );
    let Some(row) = sqlx::query(PASSWORD_QUERY)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .instrument(span)
        .await?
    else {
        debug!("no user matches the submitted email");
        return Ok(None);
    };

    let id: Uuid = row.try_get("id")?;
    let stored_email: String = row.try_get("email")?;
    let password_hash: String = row.try_get("password_hash")?;

    // bcrypt is CPU bound, keep it off the runtime workers.
    let matches = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password.expose_secret(), &password_hash)
    })
    .await??;

    if matches {
        Ok(Some(Principal::new(id, stored_email)))
    } else {
        debug!("password mismatch");
        Ok(None)
    }
}

async fn lookup_token(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<Principal>, DirectoryError> {
    let query = r"
        SELECT id, email
        FROM users
        WHERE token_hash = $1
          AND (token_expires_at IS NULL OR token_expires_at > NOW())
        LIMIT 1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    match row {
        Some(row) => Ok(Some(Principal::new(
            row.try_get("id")?,
            row.try_get::<String, _>("email")?,
        ))),
        None => Ok(None),
    }
}
