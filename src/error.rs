// src/error.rs

//! Unified error handling for the sync engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A roster record cannot be projected into a course.
    #[error("Malformed roster record {record}: {message}")]
    MalformedRoster { record: String, message: String },

    /// A call against the remote classroom service failed.
    #[error("Remote call failed for {context}: {message}")]
    Remote { context: String, message: String },

    /// A batch still had failures after its last allowed replay.
    #[error("Retries exhausted for {kind} batch: {failures} task(s) still failing")]
    RetryExhausted { kind: String, failures: usize },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed roster error for the given record.
    pub fn malformed(record: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedRoster {
            record: record.into(),
            message: message.to_string(),
        }
    }

    /// Create a remote call error with context.
    pub fn remote(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Remote {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Message without the variant prefix, as reported by the remote end.
    pub fn detail(&self) -> String {
        match self {
            Self::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
