//! Server configuration
//!
//! Settings come from an optional YAML file (default `~/.kubefacade/config`)
//! and are then overridden by command-line flags.
//!
//! ```yaml
//! server:
//!   bindAddr: 127.0.0.1
//!   port: 9090
//! kube:
//!   kubeconfig: /etc/kubefacade/kubeconfig
//!   context: staging
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default config file location: ~/.kubefacade/config
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kubefacade")
        .join("config")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub kube: KubeSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "bindAddr")]
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// `addr:port` suitable for binding a listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// How to reach the cluster. With neither field set the client infers its
/// configuration from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Parse config from a YAML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load the config file.
///
/// An explicitly named file must exist. When no path is given the default
/// location is tried and a missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path(), false),
    };

    if !path.exists() {
        if explicit {
            return Err(ConfigError::ConfigNotFound(path));
        }
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}
