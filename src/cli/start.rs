use crate::cli::{
    actions::Action, commands, commands::logging::ARG_VERBOSITY, dispatch::handler, telemetry,
};
use anyhow::Result;
use tracing::Level;

/// Parse arguments, initialize telemetry and return the action to run.
/// # Errors
/// Returns an error if telemetry cannot be initialized or the arguments are inconsistent.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(Some(verbosity_level(
        matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0),
    )))?;

    handler(&matches)
}

const fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
