// src/config.rs

//! Configuration loading utilities.
//!
//! Loads the TOML configuration and the JSON roster it points at, applying
//! environment overrides and validation on the way.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, Roster};

/// Load configuration from a TOML file, apply environment overrides and
/// validate it.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)?.with_env_overrides();
    config.validate()?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load the roster JSON file.
pub fn load_roster(path: &Path) -> Result<Roster> {
    let roster = Roster::load(path)
        .map_err(|e| AppError::config(format!("cannot load roster {}: {e}", path.display())))?;
    log::info!(
        "Loaded roster from {}: {} subjects, {} classes",
        path.display(),
        roster.subjects.len(),
        roster.class_count()
    );
    Ok(roster)
}

/// Load configuration and roster together.
///
/// `roster_override` replaces `sync.roster_path` when given.
pub fn load_all(config_path: &Path, roster_override: Option<&Path>) -> Result<(Config, Roster)> {
    let mut config = load_config(config_path)?;
    if let Some(path) = roster_override {
        config.sync.roster_path = path.to_path_buf();
    }
    let roster = load_roster(&config.sync.roster_path)?;
    Ok((config, roster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ROSTER: &str = r#"{
        "subjects": [{
            "code": "10MAT",
            "name": "Mathematics",
            "faculty": "Maths",
            "teachers": ["t1@school.edu"],
            "classes": [{ "code": "10MATa", "students": ["s1@school.edu", "s2@school.edu"] }]
        }]
    }"#;

    fn write_config(dir: &Path, roster_path: &Path) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        let content = format!(
            "[sync]\nacademic_year = 2024\nclass_admin = \"classadmin@school.edu\"\nroster_path = {:?}\n\n[invoker]\nmax_concurrent = 5\n",
            roster_path.display().to_string()
        );
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_all_reads_configured_roster() {
        let dir = tempfile::tempdir().unwrap();
        let roster_path = dir.path().join("roster.json");
        fs::write(&roster_path, ROSTER).unwrap();
        let config_path = write_config(dir.path(), &roster_path);

        let (config, roster) = load_all(&config_path, None).unwrap();
        assert_eq!(config.sync.academic_year, 2024);
        assert_eq!(config.invoker.max_concurrent, 5);
        assert_eq!(config.invoker.create_replays, 1);
        assert_eq!(roster.class_count(), 1);
    }

    #[test]
    fn test_roster_override() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.json");
        fs::write(&other, r#"{"subjects": []}"#).unwrap();
        let config_path = write_config(dir.path(), &dir.path().join("missing.json"));

        assert!(load_all(&config_path, None).is_err());
        let (config, roster) = load_all(&config_path, Some(&other)).unwrap();
        assert_eq!(config.sync.roster_path, other);
        assert!(roster.subjects.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync]\nclass_admin = \"\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
