//! TOML configuration file
//!
//! ```toml
//! bind = "127.0.0.1"
//! port = 8080
//! sweep_interval_ms = 5000
//!
//! [queue]
//! visibility_timeout_ms = 30000
//! receive_limit = 10
//!
//! [log]
//! level = "debug"
//! format = "ext"
//! ```

use crate::queue::QueueOptionsPatch;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file {} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("cannot read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
    pub color: Option<bool>,
}

/// Contents of `memsqs.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub longpoll_window_ms: Option<u64>,
    pub longpoll_tick_ms: Option<u64>,
    pub sweep_interval_ms: Option<u64>,
    /// Defaults for newly created queues
    #[serde(default)]
    pub queue: QueueOptionsPatch,
    #[serde(default)]
    pub log: LogConfig,
}

impl BrokerConfig {
    /// `<config dir>/Memsqs/memsqs.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Memsqs").join("memsqs.toml"))
    }

    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or the default location when `None`
    ///
    /// An explicit path must exist; a missing default file yields the
    /// default configuration.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        Self::from_toml(&path, &contents)
    }
}
