//! Configuration management.
//!
//! podgate configuration is loaded from multiple sources with the following priority:
//!
//! 1. Environment variables (`PODGATE_*`, nested keys separated by `__`)
//! 2. User configuration file (`~/.config/podgate/config.toml`)
//! 3. System configuration file (`/etc/podgate/config.toml`)
//! 4. Default values
//!
//! ## Example Configuration File
//!
//! ```toml
//! [docker]
//! socket_path = "/var/run/docker.sock"
//!
//! [podman]
//! address = "unix:/run/podman/io.podman"
//!
//! [logging]
//! level = "debug"
//! ```

use crate::client::DEFAULT_PODMAN_ADDRESS;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix.
const ENV_PREFIX: &str = "PODGATE_";

/// podgate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Docker API listener configuration.
    pub docker: DockerConfig,
    /// Podman backend configuration.
    pub podman: PodmanConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from the system and user files and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source cannot be parsed.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment()
            .merge(Toml::file(system_config_path()))
            .merge(Toml::file(user_config_path()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Loads configuration from a specific file plus the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    fn figment() -> Figment {
        Figment::new().merge(Serialized::defaults(Self::default()))
    }
}

/// Docker API listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Unix socket the Docker API is served on.
    pub socket_path: PathBuf,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/docker.sock"),
        }
    }
}

/// Podman backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodmanConfig {
    /// Varlink address of the Podman service.
    pub address: String,
}

impl Default for PodmanConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_PODMAN_ADDRESS.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/podgate/config.toml")
}

fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("podgate")
        .join("config.toml")
}
