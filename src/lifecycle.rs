//! # Process Lifecycle Module
//!
//! Logging setup, bounded retries with jittered backoff, and the
//! supervision of the dispatcher task that guarantees a shutdown log line
//! on every exit path.

use anyhow::{anyhow, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub const STARTUP_MESSAGE: &str = "🚀 Course Links Bot is starting...";
pub const RUNNING_BANNER: &str = "🤖 Bot is running... Press Ctrl+C to stop";
pub const STOPPED_MESSAGE: &str = "Bot stopped by user";
pub const CRASHED_MESSAGE: &str = "Bot crashed";
pub const SHUTDOWN_MESSAGE: &str = "Bot shutdown complete";

/// Install the process-wide tracing subscriber
///
/// Honors `RUST_LOG` (default `info`) and switches to JSON lines when
/// `LOG_FORMAT=json`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}

/// How the bot loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C was received or the dispatcher returned
    Stopped,
    /// The loop failed with an error or a panic
    Crashed(String),
}

/// Logs the shutdown line exactly once when dropped
#[derive(Debug)]
pub struct ShutdownGuard {
    _private: (),
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Log why the loop ended, then the shutdown line
    pub fn finish(self, reason: &ShutdownReason) {
        log_shutdown_reason(reason);
    }
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        info!("{}", SHUTDOWN_MESSAGE);
    }
}

pub fn log_shutdown_reason(reason: &ShutdownReason) {
    match reason {
        ShutdownReason::Stopped => info!("{}", STOPPED_MESSAGE),
        ShutdownReason::Crashed(cause) => error!(error = %cause, "{}", CRASHED_MESSAGE),
    }
}

/// Time the bot loop gets to wind down after an interrupt before it is aborted
pub const INTERRUPT_GRACE: Duration = Duration::from_secs(5);

/// Run the bot loop in its own task until it ends or Ctrl-C arrives
///
/// The signal is watched from the start, so an interrupt during startup
/// (database connection, bootstrap retries) is a clean stop too.
pub async fn supervise<F>(bot_loop: F) -> ShutdownReason
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    supervise_until(bot_loop, ctrl_c(), INTERRUPT_GRACE).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run the bot loop in its own task so panics are contained, stopping it
/// when `interrupt` completes
///
/// After an interrupt the loop has `grace` to finish on its own and is
/// aborted otherwise. Either way the outcome is [`ShutdownReason::Stopped`].
pub async fn supervise_until<F, I>(bot_loop: F, interrupt: I, grace: Duration) -> ShutdownReason
where
    F: Future<Output = Result<()>> + Send + 'static,
    I: Future<Output = ()>,
{
    let mut handle = tokio::spawn(bot_loop);

    tokio::select! {
        joined = &mut handle => reason_from_join(joined),
        () = interrupt => {
            info!("Interrupt received, stopping the bot");
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!(grace_ms = grace.as_millis() as u64, "Bot loop did not stop in time, aborting it");
                handle.abort();
            }
            ShutdownReason::Stopped
        }
    }
}

fn reason_from_join(joined: std::result::Result<Result<()>, JoinError>) -> ShutdownReason {
    match joined {
        Ok(Ok(())) => ShutdownReason::Stopped,
        Ok(Err(e)) => ShutdownReason::Crashed(format!("{e:#}")),
        Err(join_err) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            let cause = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            ShutdownReason::Crashed(format!("panic: {cause}"))
        }
        Err(join_err) => ShutdownReason::Crashed(format!("task cancelled: {join_err}")),
    }
}

/// Exponential delay for the given retry with up to 10% random jitter,
/// never above `max`
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    let exp = base.saturating_mul(factor).min(max);
    let jitter_ms = (exp.as_millis() / 10) as u64;
    let jitter = if jitter_ms > 0 {
        Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    } else {
        Duration::ZERO
    };
    (exp + jitter).min(max)
}

/// Run `op` once plus up to `retries` more times, sleeping with
/// [`backoff_delay`] between failures
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: &str,
    retries: u32,
    base: Duration,
    max: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation, attempt, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if attempt < retries => {
                let delay = backoff_delay(attempt, base, max);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow!("{operation} failed after {} attempts: {e}", attempt + 1));
            }
        }
    }
}
