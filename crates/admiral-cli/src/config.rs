//! CLI configuration and stored credentials.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use admiral_client::PollPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "ADMIRAL_CONFIG_DIR";

/// Overrides the configured control plane URL.
pub const URL_ENV: &str = "ADMIRAL_URL";

/// Overrides the stored auth token.
pub const TOKEN_ENV: &str = "ADMIRAL_TOKEN";

const CONFIG_FILE: &str = "admiral-cli.json";
const TOKEN_FILE: &str = "token";
const DEFAULT_DIR: &str = ".admiral-cli";

/// Errors reading or writing CLI state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot locate the configuration directory, set ADMIRAL_CONFIG_DIR or HOME")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control plane URL.
    pub url: String,

    /// Interval between task status polls (seconds).
    pub poll_interval_secs: u64,

    /// Give up waiting on a task after this long (seconds). Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8282".to_string(),
            poll_interval_secs: 3,
            task_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load the configuration stored in `dir`, or the defaults if there is none.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Persist the configuration into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let data = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        write_file(dir, &path, &data)
    }

    /// Apply command line (or environment) overrides.
    pub fn with_overrides(mut self, url: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.url = url;
        }
        if timeout_secs.is_some() {
            self.task_timeout_secs = timeout_secs;
        }
        self
    }

    /// Poll policy for blocking task waits.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default()
            .with_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
            .with_deadline(
                self.task_timeout_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            )
    }
}

/// Directory holding the configuration and token files.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(DEFAULT_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

/// Read the stored auth token, if any.
pub fn load_token(dir: &Path) -> Result<Option<String>, ConfigError> {
    let path = dir.join(TOKEN_FILE);
    match fs::read_to_string(&path) {
        Ok(token) => Ok(Some(token.trim().to_string()).filter(|t| !t.is_empty())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Store an auth token.
pub fn save_token(dir: &Path, token: &str) -> Result<(), ConfigError> {
    write_file(dir, &dir.join(TOKEN_FILE), token.as_bytes())
}

/// Forget the stored auth token.
pub fn remove_token(dir: &Path) -> Result<(), ConfigError> {
    let path = dir.join(TOKEN_FILE);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Pick the token to authenticate with: flag or environment first, then
/// the stored one.
pub fn resolve_token(explicit: Option<String>, stored: Option<String>) -> Option<String> {
    explicit.filter(|t| !t.trim().is_empty()).or(stored)
}

fn write_file(dir: &Path, path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(path, data).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
