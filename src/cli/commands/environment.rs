use crate::api::error::Mode;
use clap::{Arg, Command};

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_JSON_LIMIT: &str = "json-limit";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .short('e')
                .long("environment")
                .help("Deployment environment, \"production\" hides error details")
                .env("NODE_ENV")
                .default_value("development")
                .value_parser(|value: &str| value.parse::<Mode>()),
        )
        .arg(
            Arg::new(ARG_JSON_LIMIT)
                .long("json-limit")
                .help("Largest accepted JSON request body, in bytes")
                .env("STREETART_JSON_LIMIT")
                .default_value("102400")
                .value_parser(clap::value_parser!(usize)),
        )
}
