//! Error types for records and configuration.

use thiserror::Error;

/// Errors converting a record to or from its transport form.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The input text was empty or whitespace.
    #[error("Empty transport form")]
    EmptyInput,

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors in capture configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An email address could not be parsed.
    #[error("Invalid email address: '{0}'")]
    InvalidEmailAddress(String),

    /// An option has an unusable value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for record operations.
pub type RecordResult<T> = std::result::Result<T, RecordError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
