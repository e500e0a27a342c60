use crate::{
    api::{error::Mode, middleware::DEFAULT_JSON_LIMIT},
    cli::{
        actions::{server::Args, Action},
        commands::{database, environment, ARG_PORT},
    },
    db::DEFAULT_CONNECT_RETRIES,
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(ARG_PORT)
        .copied()
        .context("missing required argument: --port")?;

    let dsn = matches.get_one::<String>(database::ARG_DSN).cloned();

    let db_connect_retries = matches
        .get_one::<u32>(database::ARG_DB_CONNECT_RETRIES)
        .copied()
        .unwrap_or(DEFAULT_CONNECT_RETRIES);

    let mode = matches
        .get_one::<Mode>(environment::ARG_ENVIRONMENT)
        .copied()
        .unwrap_or_default();

    let json_limit = matches
        .get_one::<usize>(environment::ARG_JSON_LIMIT)
        .copied()
        .unwrap_or(DEFAULT_JSON_LIMIT);

    Ok(Action::Server(Args {
        port,
        dsn,
        db_connect_retries,
        mode,
        json_limit,
    }))
}
