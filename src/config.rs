//! # Configuration Module
//!
//! Process configuration loaded once from the environment at startup.
//! Required values are validated before any network resource is touched.

use std::time::Duration;

use crate::config_errors::ConfigError;

// Environment variable names
pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const PORT_VAR: &str = "PORT";
pub const PLATFORM_FLAG_VAR: &str = "RENDER";
pub const COURSES_FILE_VAR: &str = "COURSES_FILE";

// Defaults
pub const DEFAULT_HEALTH_PORT: u16 = 8080;
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 5;
pub const MAX_RESULTS_PER_PAGE: u32 = 10;

/// Network resilience parameters for the polling loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollingConfig {
    /// Base delay before polling again after a failed `getUpdates`
    pub poll_interval: Duration,
    /// Long polling timeout passed to `getUpdates`
    pub poll_timeout: Duration,
    /// Retries of the startup `getMe` call before giving up
    pub bootstrap_retries: u32,
    /// Read timeout of the HTTP client
    pub read_timeout: Duration,
    /// Overall request (write) timeout of the HTTP client
    pub write_timeout: Duration,
    /// Upper bound for any backoff delay
    pub max_backoff: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(10),
            bootstrap_retries: 3,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Health check server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    /// Whether the hosting platform flag was present
    pub enabled: bool,
    pub port: u16,
}

impl HealthConfig {
    /// Read health settings only. Kept apart from [`Config`] so the server
    /// starts before, and independently of, the bot configuration.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup(PLATFORM_FLAG_VAR).is_some();
        let port = parse_optional(&lookup, PORT_VAR, DEFAULT_HEALTH_PORT, |raw| {
            raw.parse::<u16>()
                .map_err(|e| e.to_string())
                .and_then(|p| if p == 0 { Err("port must be non-zero".to_string()) } else { Ok(p) })
        })?;
        Ok(Self { enabled, port })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Complete process configuration
#[derive(Clone, PartialEq)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub courses_file: Option<String>,
    pub default_results_per_page: u32,
    pub polling: PollingConfig,
}

// The token and database URL carry credentials
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field("courses_file", &self.courses_file)
            .field("default_results_per_page", &self.default_results_per_page)
            .field("polling", &self.polling)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or blank,
    /// or when an optional variable is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, BOT_TOKEN_VAR)?;
        let database_url = required(&lookup, DATABASE_URL_VAR)?;
        let courses_file = lookup(COURSES_FILE_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let default_results_per_page = parse_optional(
            &lookup,
            "DEFAULT_RESULTS_PER_PAGE",
            DEFAULT_RESULTS_PER_PAGE,
            |raw| {
                let n = raw.parse::<u32>().map_err(|e| e.to_string())?;
                if (1..=MAX_RESULTS_PER_PAGE).contains(&n) {
                    Ok(n)
                } else {
                    Err(format!("must be between 1 and {MAX_RESULTS_PER_PAGE}"))
                }
            },
        )?;

        let defaults = PollingConfig::default();
        let polling = PollingConfig {
            poll_interval: parse_optional(&lookup, "POLL_INTERVAL_SECS", defaults.poll_interval, parse_secs)?,
            poll_timeout: parse_optional(&lookup, "POLL_TIMEOUT_SECS", defaults.poll_timeout, parse_secs)?,
            bootstrap_retries: parse_optional(&lookup, "BOOTSTRAP_RETRIES", defaults.bootstrap_retries, |raw| {
                raw.parse::<u32>().map_err(|e| e.to_string())
            })?,
            read_timeout: parse_optional(&lookup, "READ_TIMEOUT_SECS", defaults.read_timeout, parse_secs)?,
            write_timeout: parse_optional(&lookup, "WRITE_TIMEOUT_SECS", defaults.write_timeout, parse_secs)?,
            max_backoff: defaults.max_backoff,
        };

        Ok(Self {
            bot_token,
            database_url,
            courses_file,
            default_results_per_page,
            polling,
        })
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Err(ConfigError::MissingVariable(name.to_string())),
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyVariable(name.to_string())),
        Some(value) => Ok(value.trim().to_string()),
    }
}

fn parse_optional<F, T, P>(lookup: &F, name: &str, default: T, parse: P) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => {
            let trimmed = raw.trim();
            parse(trimmed).map_err(|reason| ConfigError::invalid(name, trimmed, reason))
        }
    }
}

fn parse_secs(raw: &str) -> Result<Duration, String> {
    let secs = raw.parse::<f64>().map_err(|e| e.to_string())?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("must be a positive number of seconds".to_string());
    }
    Ok(Duration::from_secs_f64(secs))
}
