//! Runtime configuration.
//!
//! Loaded from the YAML file named by `PORTER_CONFIG` when set; every field
//! has a default, so an empty file (or no file) is a valid configuration.
//! `LISTEN` overrides the listen address either way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const CONFIG_ENV: &str = "PORTER_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub resources: ResourceConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub root: PathBuf,
    pub trusted_directories: Vec<PathBuf>,
    pub restricted_paths: Vec<PathBuf>,
    pub allow_directory_listing: bool,
    /// Names directly below the root that stand for other directories.
    pub aliases: HashMap<String, PathBuf>,
    pub not_found_page: Option<PathBuf>,
    pub restricted_page: Option<PathBuf>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./public"),
            trusted_directories: Vec::new(),
            restricted_paths: Vec::new(),
            allow_directory_listing: false,
            aliases: HashMap::new(),
            not_found_page: None,
            restricted_page: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// File entries unread for this long are evicted.
    pub idle_timeout_secs: u64,
    pub sweep_interval_ms: u64,
    /// Larger files are served but not kept in memory.
    pub max_file_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            sweep_interval_ms: 1000,
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // a zero period would spin the sweeper
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Config {
    /// Loads the configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}
