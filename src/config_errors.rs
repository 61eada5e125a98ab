//! # Configuration Error Types Module
//!
//! Errors raised while loading process configuration at startup. Every
//! variant is fatal: the process refuses to start when one is returned.

/// Errors produced while reading configuration from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    MissingVariable(String),
    /// A required variable is set but blank
    EmptyVariable(String),
    /// A variable is set but cannot be parsed or is out of range
    InvalidValue {
        variable: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(variable: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            variable: variable.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => write!(f, "{name} must be set"),
            ConfigError::EmptyVariable(name) => write!(f, "{name} must not be empty"),
            ConfigError::InvalidValue {
                variable,
                value,
                reason,
            } => write!(f, "Invalid value {value:?} for {variable}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
