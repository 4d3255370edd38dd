// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::models::ClassroomConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &ClassroomConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .build()?;
    Ok(client)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Extract the message from a JSON error body (`{"error": {"message": ...}}`).
///
/// Falls back to the raw body, or the status line when the body is empty.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.error.message.is_empty() {
            return parsed.error.message;
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}
