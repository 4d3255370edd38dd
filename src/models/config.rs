//! Application configuration structures.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `classroom.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "CLASSROOM_ACCESS_TOKEN";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Academic period and ownership settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Task execution policy
    #[serde(default)]
    pub invoker: InvokerConfig,

    /// Remote classroom endpoint settings
    #[serde(default)]
    pub classroom: ClassroomConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment overrides (access token).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.classroom.access_token = Some(token);
            }
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let admin = self.sync.class_admin.trim();
        if admin.is_empty() {
            return Err(AppError::validation("sync.class_admin is empty"));
        }
        if !admin.contains('@') {
            return Err(AppError::validation(format!(
                "sync.class_admin is not an email address: {admin}"
            )));
        }
        if !(2000..=2999).contains(&self.sync.academic_year) {
            return Err(AppError::validation(format!(
                "sync.academic_year out of range: {}",
                self.sync.academic_year
            )));
        }
        if self.classroom.base_url.trim().is_empty() {
            return Err(AppError::validation("classroom.base_url is empty"));
        }
        if self.classroom.timeout_secs == 0 {
            return Err(AppError::validation("classroom.timeout_secs must be > 0"));
        }
        if self.classroom.page_size == 0 {
            return Err(AppError::validation("classroom.page_size must be > 0"));
        }
        Ok(())
    }
}

/// Academic period and course ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Academic year embedded in class aliases
    #[serde(default = "defaults::academic_year")]
    pub academic_year: u16,

    /// Class administrator account: owner of created courses and a
    /// permanent teacher of every course
    #[serde(default)]
    pub class_admin: String,

    /// Roster file (JSON)
    #[serde(default = "defaults::roster_path")]
    pub roster_path: PathBuf,

    /// Append-only log of remote call failures
    #[serde(default = "defaults::error_log_path")]
    pub error_log_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            academic_year: defaults::academic_year(),
            class_admin: String::new(),
            roster_path: defaults::roster_path(),
            error_log_path: defaults::error_log_path(),
        }
    }
}

/// Concurrency ceiling and replay budgets for task batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Maximum in-flight calls for concurrent batches (0 = unbounded)
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Full replays of the creation batch after a failing pass
    #[serde(default = "defaults::create_replays")]
    pub create_replays: u32,

    /// Full replays of every other batch after a failing pass
    #[serde(default)]
    pub other_replays: u32,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            create_replays: defaults::create_replays(),
            other_replays: 0,
        }
    }
}

/// Remote classroom API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomConfig {
    /// API root, ending with a slash
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// OAuth bearer token (see [`ACCESS_TOKEN_ENV`])
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Page size for list calls
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,
}

impl Default for ClassroomConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            access_token: None,
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use chrono::Datelike;

    // Sync defaults
    pub fn academic_year() -> u16 {
        u16::try_from(chrono::Local::now().year()).unwrap_or(2000)
    }
    pub fn roster_path() -> PathBuf {
        PathBuf::from("data/roster.json")
    }
    pub fn error_log_path() -> PathBuf {
        PathBuf::from("logs/sync-errors.log")
    }

    // Invoker defaults
    pub fn max_concurrent() -> usize {
        20
    }
    pub fn create_replays() -> u32 {
        1
    }

    // Classroom defaults
    pub fn base_url() -> String {
        "https://classroom.googleapis.com/v1/".into()
    }
    pub fn user_agent() -> String {
        "roster-sync/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        100
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
