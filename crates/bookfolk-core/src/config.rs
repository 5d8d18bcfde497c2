//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/bookfolk/config.toml)
//! 3. Environment variables (BOOKFOLK_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix
const ENV_PREFIX: &str = "BOOKFOLK";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where books and accounts are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database in the data directory
    #[default]
    Local,
    /// Firebase Authentication + Cloud Firestore
    Firestore,
    /// Nothing persisted
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "firestore" | "firebase" => Ok(Backend::Firestore),
            "memory" => Ok(Backend::Memory),
            other => bail!("Unknown backend '{}' (expected local, firestore or memory)", other),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Local => "local",
            Backend::Firestore => "firestore",
            Backend::Memory => "memory",
        })
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory for data storage (database, session, log)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub backend: Backend,

    /// Firebase web API key (firestore backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Firebase project id (firestore backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Google Books API key; searches work without one at a lower quota
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_api_key: Option<String>,

    /// Timeout for remote requests
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Log file; defaults to bookfolk.log in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            api_key: None,
            project_id: None,
            catalog_api_key: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BOOKFOLK_DATA_DIR, BOOKFOLK_BACKEND, ...)
    /// 2. Config file (~/.config/bookfolk/config.toml or BOOKFOLK_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = env_var("BACKEND") {
            self.backend = val
                .parse()
                .with_context(|| format!("Invalid {}_BACKEND", ENV_PREFIX))?;
        }
        if let Some(val) = env_var("API_KEY") {
            self.api_key = non_empty(val);
        }
        if let Some(val) = env_var("PROJECT_ID") {
            self.project_id = non_empty(val);
        }
        if let Some(val) = env_var("CATALOG_KEY") {
            self.catalog_api_key = non_empty(val);
        }
        if let Some(val) = env_var("LOG_FILE") {
            self.log_file = non_empty(val).map(PathBuf::from);
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set a single field by its config file key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => {
                if value.trim().is_empty() {
                    bail!("data_dir cannot be empty");
                }
                self.data_dir = PathBuf::from(value)
            }
            "backend" => self.backend = value.parse()?,
            "api_key" => self.api_key = non_empty(value.to_string()),
            "project_id" => self.project_id = non_empty(value.to_string()),
            "catalog_api_key" => self.catalog_api_key = non_empty(value.to_string()),
            "request_timeout_secs" => {
                self.request_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?
            }
            "log_file" => self.log_file = non_empty(value.to_string()).map(PathBuf::from),
            other => bail!(
                "Unknown config key '{}'. Valid keys: data_dir, backend, api_key, project_id, \
                 catalog_api_key, request_timeout_secs, log_file",
                other
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BOOKFOLK_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookfolk")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bookfolk.db")
    }

    /// Get the path to the cached sign-in session
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("bookfolk.log"))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn non_empty(val: String) -> Option<String> {
    if val.trim().is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bookfolk")
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
