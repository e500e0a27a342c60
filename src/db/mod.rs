//! Storage connection.
//!
//! Startup never fails because the database is down: after a bounded number of
//! attempts the server continues in degraded mode and every directory lookup
//! reports the failure instead.

use rand::Rng;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_CONNECT_RETRIES: u32 = 3;

const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .min_connections(0)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
}

/// Connect to `dsn`, retrying up to `attempts` times.
///
/// Returns `None` when there is no DSN or it cannot be parsed, and a lazily
/// connecting pool when every attempt failed.
#[instrument(skip(dsn))]
pub async fn connect(dsn: Option<&str>, attempts: u32) -> Option<PgPool> {
    let Some(dsn) = dsn.filter(|dsn| !dsn.trim().is_empty()) else {
        warn!("No database configured, user lookups will fail");
        return None;
    };

    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match pool_options().connect(dsn).await {
            Ok(pool) => {
                info!("Connected to database");
                return Some(pool);
            }
            Err(err) if attempt < attempts => {
                let delay = backoff(attempt);
                warn!(
                    attempt,
                    "Failed to connect to database: {err}, retrying in {}ms",
                    delay.as_millis()
                );
                sleep(delay).await;
            }
            Err(err) => error!(attempt, "Failed to connect to database: {err}"),
        }
    }

    match pool_options().connect_lazy(dsn) {
        Ok(pool) => {
            warn!("Continuing without a database connection");
            Some(pool)
        }
        Err(err) => {
            error!("Invalid database DSN: {err}");
            None
        }
    }
}

/// Exponential delay for the given attempt with up to 20% jitter taken off.
#[must_use]
pub fn backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = BASE_DELAY.saturating_mul(1 << exponent).min(MAX_DELAY);

    let mut rng = rand::thread_rng();
    delay.mul_f64(rng.gen_range(0.8..=1.0))
}
