use clap::{Arg, Command};

pub const ARG_DSN: &str = "dsn";
pub const ARG_DB_CONNECT_RETRIES: &str = "db-connect-retries";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "Database connection string. When missing or unreachable the server still starts, but every user lookup fails.",
                )
                .env("DATABASE_URL"),
        )
        .arg(
            Arg::new(ARG_DB_CONNECT_RETRIES)
                .long("db-connect-retries")
                .help("Connection attempts before continuing without a database")
                .env("STREETART_DB_CONNECT_RETRIES")
                .default_value("3")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}
