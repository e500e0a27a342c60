use crate::{
    api::{self, error::Mode, AppContext},
    auth::Authenticator,
    db,
    directory::PgUserDirectory,
};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub db_connect_retries: u32,
    pub mode: Mode,
    pub json_limit: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        mode = %args.mode,
        json_limit = args.json_limit,
        db_connect_retries = args.db_connect_retries,
        dsn_configured = args.dsn.is_some(),
        "Starting server"
    );

    let pool = db::connect(args.dsn.as_deref(), args.db_connect_retries).await;
    let directory = PgUserDirectory::new(pool);

    let ctx = AppContext::new(args.mode, Authenticator::new(&directory))
        .with_json_limit(args.json_limit);

    api::new(args.port, ctx).await
}
