//! Console logging. Level filter from SNAPLINK_LOG (EnvFilter syntax), default `info`.

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SNAPLINK_LOG";
const DEFAULT_LEVEL: &str = "info";

pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
}
