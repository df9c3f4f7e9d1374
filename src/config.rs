use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{format_marker, PillError, Result, DEFAULT_DATE_FORMAT};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the key-value store
    pub data_dir: PathBuf,

    /// strftime layout of the daily reset marker
    pub date_format: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".pilltrack"));

        Config {
            data_dir,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "pilltrack", "pilltrack")
}

impl Config {
    /// Where the config file lives unless `--config` says otherwise
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from(".pilltrack").join("config.json"))
    }

    /// Reads the config file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| PillError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|_| PillError::DirectoryError {
                    path: parent.to_path_buf(),
                })?;
            }
        }

        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Applies a `key=value` setting
    pub fn apply_setting(&mut self, setting: &str) -> Result<()> {
        let (key, value) = setting
            .split_once('=')
            .ok_or_else(|| PillError::ConfigError {
                message: format!("Expected key=value, got: {}", setting),
            })?;

        match key.trim() {
            "data_dir" => self.data_dir = PathBuf::from(value.trim()),
            "date_format" => self.date_format = value.trim().to_string(),
            other => {
                return Err(PillError::ConfigError {
                    message: format!(
                        "Unknown setting: {}. Must be one of: data_dir, date_format",
                        other
                    ),
                })
            }
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        let probe = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
        format_marker(probe, &self.date_format).map(|_| ())
    }
}
