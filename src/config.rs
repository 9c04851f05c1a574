//! Start-up configuration. Everything has a sensible default; environment
//! variables override individual values so the same binary can run against a
//! scratch directory or an ephemeral store without code changes.

use std::env;
use std::path::PathBuf;

use directories::BaseDirs;
use log::warn;

use crate::error::StorageError;
use crate::store::DEFAULT_STORAGE_KEY;

/// Folder name used beneath the user's home directory for application data.
pub const DATA_DIR_NAME: &str = ".book-tracker";
/// Log file written inside the data directory.
pub const LOG_FILE_NAME: &str = "book-tracker.log";
/// Books shown on the home screen's "recently added" strip.
pub const DEFAULT_RECENT_LIMIT: usize = 3;

pub const ENV_DATA_DIR: &str = "BOOK_TRACKER_DATA_DIR";
pub const ENV_STORAGE_KEY: &str = "BOOK_TRACKER_STORAGE_KEY";
pub const ENV_RECENT_LIMIT: &str = "BOOK_TRACKER_RECENT_LIMIT";
pub const ENV_EPHEMERAL: &str = "BOOK_TRACKER_EPHEMERAL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the SQLite file and the log.
    pub data_dir: PathBuf,
    /// Storage key the collection is written under.
    pub storage_key: String,
    pub recent_limit: usize,
    /// Keep the collection in memory only.
    pub ephemeral: bool,
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            ephemeral: false,
        }
    }

    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve the configuration through `lookup`, which maps a variable name
    /// to its value. Separated from [`Config::from_env`] so tests do not have
    /// to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match non_blank(lookup(ENV_DATA_DIR)) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let mut config = Self::with_data_dir(data_dir);

        if let Some(key) = non_blank(lookup(ENV_STORAGE_KEY)) {
            config.storage_key = key;
        }

        if let Some(raw) = non_blank(lookup(ENV_RECENT_LIMIT)) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.recent_limit = limit,
                _ => warn!(
                    "ignoring {ENV_RECENT_LIMIT}={raw:?}, using {}",
                    DEFAULT_RECENT_LIMIT
                ),
            }
        }

        if let Some(raw) = non_blank(lookup(ENV_EPHEMERAL)) {
            config.ephemeral = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        Ok(config)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE_NAME)
    }
}

/// `~/.book-tracker`.
fn default_data_dir() -> Result<PathBuf, StorageError> {
    let base_dirs = BaseDirs::new().ok_or(StorageError::NoHomeDirectory)?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
