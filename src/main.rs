use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

use course_links_bot::bot::runtime::run;
use course_links_bot::config::{Config, HealthConfig};
use course_links_bot::health::maybe_spawn_health_server;
use course_links_bot::lifecycle::{init_tracing, supervise, ShutdownGuard, ShutdownReason};
use course_links_bot::localization::init_localization;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    // The health server stays independent of the bot configuration
    match HealthConfig::from_env() {
        Ok(health) => {
            if maybe_spawn_health_server(&health).is_none() {
                info!("Health check server disabled");
            }
        }
        Err(e) => error!(error = %e, "Invalid health check configuration, server not started"),
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    init_localization().context("Failed to initialize localization")?;

    let guard = ShutdownGuard::new();
    let reason = supervise(run(config)).await;
    guard.finish(&reason);

    match reason {
        ShutdownReason::Stopped => Ok(()),
        ShutdownReason::Crashed(cause) => Err(anyhow!(cause)),
    }
}
