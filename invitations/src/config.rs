//! Invitation configuration.
//!
//! Values are supplied by the application. [`InvitationConfig::from_env`]
//! reads `CARPOOL_*` variables on top of the defaults; anything unset keeps
//! its default.

use crate::code::{DEFAULT_INVITE_CODE_LENGTH, MAX_INVITE_CODE_LENGTH, MIN_INVITE_CODE_LENGTH};
use crate::constants::DEFAULT_INVITATION_TTL_DAYS;
use crate::notify::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Environment variable could not be parsed.
    #[error("Failed to parse {name}: {value}")]
    ParseError {
        /// Variable name.
        name: String,
        /// Rejected value.
        value: String,
    },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Invitation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    /// Days an invitation stays acceptable.
    ///
    /// Default: 7
    pub ttl_days: i64,

    /// Length of generated invite codes.
    ///
    /// Default: 8
    pub code_length: usize,

    /// Attempts at finding an unused code before giving up.
    ///
    /// Default: 5
    pub max_code_attempts: u32,

    /// Base URL used to build accept links in emails
    /// (`{app_base_url}/invitations/{code}`).
    pub app_base_url: String,

    /// Retry policy for invitation emails.
    pub notification_retry: RetryPolicy,
}

impl InvitationConfig {
    /// Create a configuration with the given application URL.
    #[must_use]
    pub fn new(app_base_url: impl Into<String>) -> Self {
        Self {
            app_base_url: app_base_url.into(),
            ..Self::default()
        }
    }

    /// Set invitation lifetime in days.
    #[must_use]
    pub const fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    /// Set generated code length.
    #[must_use]
    pub const fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Set the number of code generation attempts.
    #[must_use]
    pub const fn with_max_code_attempts(mut self, attempts: u32) -> Self {
        self.max_code_attempts = attempts;
        self
    }

    /// Set the email retry policy.
    #[must_use]
    pub fn with_notification_retry(mut self, policy: RetryPolicy) -> Self {
        self.notification_retry = policy;
        self
    }

    /// Invitation lifetime as a `chrono` duration.
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.ttl_days)
    }

    /// Link a recipient follows to accept `code`.
    #[must_use]
    pub fn accept_url(&self, code: &str) -> String {
        format!("{}/invitations/{code}", self.app_base_url.trim_end_matches('/'))
    }

    /// Load from `CARPOOL_*` environment variables over the defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `CARPOOL_APP_BASE_URL` | `app_base_url` |
    /// | `CARPOOL_INVITATION_TTL_DAYS` | `ttl_days` |
    /// | `CARPOOL_INVITE_CODE_LENGTH` | `code_length` |
    /// | `CARPOOL_INVITE_CODE_ATTEMPTS` | `max_code_attempts` |
    /// | `CARPOOL_NOTIFY_MAX_RETRIES` | `notification_retry.max_retries` |
    ///
    /// # Errors
    ///
    /// Returns error if a variable does not parse or the result fails
    /// [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("CARPOOL_APP_BASE_URL") {
            config.app_base_url = url;
        }
        if let Some(days) = env_parse("CARPOOL_INVITATION_TTL_DAYS")? {
            config.ttl_days = days;
        }
        if let Some(length) = env_parse("CARPOOL_INVITE_CODE_LENGTH")? {
            config.code_length = length;
        }
        if let Some(attempts) = env_parse("CARPOOL_INVITE_CODE_ATTEMPTS")? {
            config.max_code_attempts = attempts;
        }
        if let Some(retries) = env_parse("CARPOOL_NOTIFY_MAX_RETRIES")? {
            config.notification_retry.max_retries = retries;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_days <= 0 {
            return Err(ConfigError::ValidationError("ttl_days must be > 0".to_string()));
        }
        if !(MIN_INVITE_CODE_LENGTH..=MAX_INVITE_CODE_LENGTH).contains(&self.code_length) {
            return Err(ConfigError::ValidationError(format!(
                "code_length must be between {MIN_INVITE_CODE_LENGTH} and {MAX_INVITE_CODE_LENGTH}"
            )));
        }
        if self.max_code_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_code_attempts must be > 0".to_string(),
            ));
        }
        if self.app_base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "app_base_url cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            ttl_days: DEFAULT_INVITATION_TTL_DAYS,
            code_length: DEFAULT_INVITE_CODE_LENGTH,
            max_code_attempts: 5,
            app_base_url: "http://localhost:3000".to_string(),
            notification_retry: RetryPolicy::default(),
        }
    }
}

/// Configuration of the `invitation-sweeper` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// PostgreSQL connection string (from `DATABASE_URL`).
    #[serde(skip_serializing)]
    pub database_url: String,

    /// Seconds between sweeps.
    ///
    /// Default: 3600
    pub interval_secs: u64,

    /// Maximum connections in pool.
    ///
    /// Default: 2
    pub max_connections: u32,

    /// Run one sweep and exit instead of looping.
    pub run_once: bool,
}

impl SweeperConfig {
    /// Load from the environment.
    ///
    /// `DATABASE_URL` is required; `SWEEP_INTERVAL_SECS`,
    /// `SWEEP_MAX_CONNECTIONS` and `SWEEP_RUN_ONCE` are optional.
    ///
    /// # Errors
    ///
    /// Returns error if `DATABASE_URL` is missing, a value does not parse,
    /// or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::EnvVarNotSet("DATABASE_URL".to_string()))?;
        let config = Self {
            database_url,
            interval_secs: env_parse("SWEEP_INTERVAL_SECS")?.unwrap_or(3600),
            max_connections: env_parse("SWEEP_MAX_CONNECTIONS")?.unwrap_or(2),
            run_once: env_parse("SWEEP_RUN_ONCE")?.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "database_url cannot be empty".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "interval_secs must be > 0".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Sweep interval as a `Duration`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::ParseError {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(None),
    }
}
