use crate::delivery::RetryPolicy;
use crate::error::ConfigError;
use crate::events::Severity;
use crate::rules::NewAlertRule;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_RETENTION_DAYS: u32 = 90;
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_RATE_LIMIT_PER_MINUTE: usize = 3;
const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_rate_limit_per_minute() -> usize {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

fn default_max_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

fn default_min_severity() -> Severity {
    Severity::Low
}

/// Top-level configuration, loaded from TOML
///
/// Every section and field is optional; missing values take their defaults.
///
/// ```toml
/// [store]
/// retention_days = 30
///
/// [delivery]
/// audit_endpoint = "https://audit.example.com/events"
/// audit_token = "secret"
///
/// [[rules]]
/// name = "Repeated failed logins"
/// conditions = { action = "failed_login", threshold = 3, window_minutes = 5 }
/// actions = [{ type = "notify" }, { type = "log" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub delivery: DeliveryConfig,
    pub notifications: NotificationConfig,
    pub rules: Vec<NewAlertRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Disabled stores record nothing
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Age after which the retention sweep removes events
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl StoreConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryConfig {
    /// Endpoint that receives every critical event; unset disables the sink
    #[serde(default)]
    pub audit_endpoint: Option<String>,
    /// Bearer token sent to the audit endpoint
    #[serde(default)]
    pub audit_token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            audit_endpoint: None,
            audit_token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            retry: RetryPolicy::default(),
        }
    }
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: usize,
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Notifications below this severity are dropped
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            min_severity: default_min_severity(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, and a
    /// parse or validation error if its contents are invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notifications.rate_limit_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }
        if self.delivery.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "delivery.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if let Some(endpoint) = &self.delivery.audit_endpoint {
            if reqwest::Url::parse(endpoint).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "delivery.audit_endpoint is not a valid URL: {}",
                    endpoint
                )));
            }
        }
        self.delivery
            .retry
            .validate()
            .map_err(|msg| ConfigError::ValidationError(format!("delivery.{}", msg)))?;

        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }
}
