//! Local filesystem error log.
//!
//! Appends one JSON line per failure. Parent directories are created on
//! first write; the file is never truncated.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::{ErrorEntry, ErrorSink};

/// Append-only error log file.
#[derive(Debug)]
pub struct FileErrorLog {
    path: PathBuf,
    // Serialises appends from concurrent batches.
    lock: Mutex<()>,
}

impl FileErrorLog {
    /// Create a log writing to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    async fn append(&self, entry: &ErrorEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        self.ensure_dir().await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ErrorSink for FileErrorLog {
    async fn record(&self, entry: &ErrorEntry) {
        if let Err(e) = self.append(entry).await {
            log::warn!(
                "Failed to append to error log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
