//! Error sink for remote call failures.
//!
//! Every recovered failure is appended to an external, append-only log so
//! operators can review what a run skipped:
//!
//! ```text
//! logs/
//! └── sync-errors.log   # one JSON object per line
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export for convenience
pub use local::FileErrorLog;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    /// Operation that failed (e.g., `create_course`)
    pub source: String,
    /// Course alias and task position
    pub context: String,
    pub message: String,
}

impl ErrorEntry {
    pub fn new(
        source: impl Into<String>,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Destination for recovered failures. Recording never fails the caller.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn record(&self, entry: &ErrorEntry);
}

/// Sink that discards entries (dry runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullErrorSink;

#[async_trait]
impl ErrorSink for NullErrorSink {
    async fn record(&self, _entry: &ErrorEntry) {}
}
