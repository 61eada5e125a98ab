//! Bot construction, startup checks and the polling loop

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::update_listeners::Polling;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::config::{Config, PollingConfig};
use crate::course_model::load_catalog_file;
use crate::db;
use crate::lifecycle::{backoff_delay, retry_with_backoff, RUNNING_BANNER, STARTUP_MESSAGE};

use super::commands::Command;
use super::dispatch::schema;
use super::BotState;

/// Headroom between the long-poll timeout and the HTTP request timeout
const POLL_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

/// Create a bot whose HTTP client honours the configured timeouts
pub fn build_bot(token: &str, polling: &PollingConfig) -> Result<Bot> {
    // A long poll must finish before the request itself times out
    let request_timeout = polling.write_timeout.max(polling.poll_timeout + POLL_TIMEOUT_HEADROOM);

    let client = teloxide::net::default_reqwest_settings()
        .read_timeout(polling.read_timeout)
        .timeout(request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    Ok(Bot::with_client(token, client))
}

/// Check the token with `getMe`, retrying transient failures, and publish
/// the command list
pub async fn bootstrap(bot: &Bot, polling: &PollingConfig) -> Result<Me> {
    let me = retry_with_backoff(
        "getMe",
        polling.bootstrap_retries,
        polling.poll_interval,
        polling.max_backoff,
        || bot.get_me().send(),
    )
    .await?;
    info!(username = ?me.user.username, "Bot identity confirmed");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to set bot commands");
    }

    Ok(me)
}

/// Import the course catalog file into the database, if configured
pub async fn import_courses(pool: &PgPool, courses_file: Option<&str>) -> Result<usize> {
    let Some(path) = courses_file else {
        return Ok(0);
    };

    let entries = load_catalog_file(path)?;
    let imported = db::import_catalog(pool, &entries).await?;
    info!(path, imported, "Course catalog imported");
    Ok(imported)
}

/// Poll for updates until Ctrl-C
pub async fn run_polling(bot: Bot, state: BotState, polling: &PollingConfig) {
    let interval = polling.poll_interval;
    let max_backoff = polling.max_backoff;

    let listener = Polling::builder(bot.clone())
        .timeout(polling.poll_timeout)
        .backoff_strategy(move |attempt| backoff_delay(attempt, interval, max_backoff))
        .build();

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;
}

/// Start everything the bot needs and run until stopped
pub async fn run(config: Config) -> Result<()> {
    info!("{}", STARTUP_MESSAGE);
    info!(config = ?config, "Loaded configuration");

    let pool = db::connect(&config.database_url).await?;
    import_courses(&pool, config.courses_file.as_deref()).await?;

    let bot = build_bot(&config.bot_token, &config.polling)?;
    bootstrap(&bot, &config.polling).await?;

    let state = BotState::new(Arc::new(pool), config.default_results_per_page);

    println!("{RUNNING_BANNER}");
    info!("{}", RUNNING_BANNER);

    run_polling(bot, state, &config.polling).await;
    Ok(())
}
