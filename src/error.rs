use thiserror::Error;

/// Errors raised when an alert rule definition is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Rule '{0}' must have a threshold of at least 1")]
    InvalidThreshold(String),

    #[error("Rule '{0}' must have a window of at least 1 minute")]
    InvalidWindow(String),

    #[error("Rule '{rule}' has an invalid webhook URL: {url}")]
    InvalidWebhookUrl { rule: String, url: String },
}

/// Errors that can occur when delivering an outbound request
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint {url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors that can occur when sending notifications
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to send notification: {0}")]
    NotificationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when exporting events
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Invalid alert rule: {0}")]
    Rule(#[from] RuleError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
