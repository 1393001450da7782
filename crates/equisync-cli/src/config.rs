//! Runtime configuration resolved from the environment.
//!
//! The API key is mandatory and checked before any argument parsing or
//! network work. The database path falls back through `EQUISYNC_DB_PATH`,
//! `EQUISYNC_HOME`, then `$HOME/.equisync/equisync.duckdb`.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DB_FILE_NAME: &str = "equisync.duckdb";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ALPHAVANTAGE_API_KEY environment variable is not set")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub db_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ALPHAVANTAGE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            db_path: resolve_db_path(),
        })
    }
}

fn resolve_db_path() -> PathBuf {
    if let Some(path) = env::var_os("EQUISYNC_DB_PATH") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    resolve_equisync_home().join(DB_FILE_NAME)
}

fn resolve_equisync_home() -> PathBuf {
    if let Some(path) = env::var_os("EQUISYNC_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".equisync");
    }

    PathBuf::from(".equisync")
}
