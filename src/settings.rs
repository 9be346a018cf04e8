use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifications::BulkOptions;
use crate::classifier::{ClassifierConfig, DEFAULT_PATTERN_THRESHOLD};
use crate::error::{CostwiseError, Result};

pub const DB_FILE: &str = "costwise.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of buckets shown by `analytics trend` unless overridden.
    #[serde(default = "default_trend_periods")]
    pub trend_periods: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_save_attempts")]
    pub save_attempts: u32,
    #[serde(default = "default_pattern_threshold")]
    pub pattern_threshold: f64,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_trend_periods() -> usize {
    6
}

fn default_workers() -> usize {
    4
}

fn default_save_attempts() -> u32 {
    2
}

fn default_pattern_threshold() -> f64 {
    DEFAULT_PATTERN_THRESHOLD
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            log_level: default_log_level(),
            trend_periods: default_trend_periods(),
            workers: default_workers(),
            save_attempts: default_save_attempts(),
            pattern_threshold: default_pattern_threshold(),
        }
    }
}

impl Settings {
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            pattern_threshold: self.pattern_threshold,
        }
    }

    pub fn bulk_options(&self) -> BulkOptions {
        BulkOptions {
            workers: self.workers.max(1),
            save_attempts: self.save_attempts.max(1),
            classifier: self.classifier_config(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("costwise")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("costwise")
}

/// Settings from `~/.config/costwise/settings.json`, or defaults when the file
/// is missing or unreadable.
pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if !(settings.pattern_threshold >= 0.0) {
        return Err(CostwiseError::Settings(format!(
            "pattern_threshold must not be negative, got {}",
            settings.pattern_threshold
        )));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CostwiseError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join(DB_FILE)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            log_level: "debug".to_string(),
            trend_periods: 12,
            workers: 2,
            save_attempts: 3,
            pattern_threshold: 0.4,
        };
        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.trend_periods, 12);
        assert_eq!(loaded.pattern_threshold, 0.4);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s.log_level, "warn");
        assert_eq!(s.trend_periods, 6);
        assert_eq!(s.workers, 4);
        assert_eq!(s.save_attempts, 2);
        assert_eq!(s.pattern_threshold, 0.5);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "workers": 8}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.workers, 8);
        assert_eq!(s.save_attempts, 2);
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&path, &Settings::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_bulk_options_never_zero() {
        let settings = Settings {
            workers: 0,
            save_attempts: 0,
            pattern_threshold: 0.3,
            ..Settings::default()
        };
        let opts = settings.bulk_options();
        assert_eq!(opts.workers, 1);
        assert_eq!(opts.save_attempts, 1);
        assert_eq!(opts.classifier.pattern_threshold, 0.3);
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            pattern_threshold: -1.0,
            ..Settings::default()
        };
        assert!(save_settings_to(&dir.path().join("s.json"), &settings).is_err());
    }
}
