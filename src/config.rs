use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{Result, TrackerError};

/// Environment variable that overrides the data file location.
pub const DATA_FILE_ENV: &str = "MEDTRACK_DATA";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_file: PathBuf,
    /// CSV export of the medicine information bank used by `search`.
    pub catalogue_file: Option<PathBuf>,
    pub heart_rate_file: PathBuf,
    pub hrv_file: PathBuf,
    pub reminder_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            catalogue_file: None,
            heart_rate_file: PathBuf::from("heart_rate_hourly.csv"),
            hrv_file: PathBuf::from("hrv_hourly.csv"),
            reminder_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load `<config dir>/medtrack/config.toml`, falling back to defaults when
    /// the file is absent. `MEDTRACK_DATA` wins over the file's `data_file`.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };

        config.apply_data_file_override(env::var(DATA_FILE_ENV).ok());
        Ok(config)
    }

    /// Replaces `data_file` with the value of `MEDTRACK_DATA`, if one is set
    /// and not blank.
    pub fn apply_data_file_override(&mut self, value: Option<String>) {
        let Some(data_file) = value.filter(|v| !v.trim().is_empty()) else {
            return;
        };
        debug!("data file overridden by {}: {}", DATA_FILE_ENV, data_file);
        self.data_file = PathBuf::from(data_file);
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| TrackerError::io(path, e))?;
        let config = toml::from_str(&content).map_err(|source| TrackerError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

/// Uses the `dirs` crate to locate the home directory across platforms.
/// Falls back to `./.medtrack.json` if no home directory is found.
pub fn default_data_file() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".medtrack.json")
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("medtrack").join("config.toml"))
}
