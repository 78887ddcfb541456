//! TOML-based configuration for the bridge.
//!
//! Hosts embedding the bridge usually persist a small config file:
//!
//! ```toml
//! port = 50500
//! bind_address = "127.0.0.1"
//! ```
//!
//! Every field has a serde default, so an empty file (or a file from an older
//! version missing newer fields) still loads.  The TourBox desktop software
//! connects to `127.0.0.1:50500` out of the box, which is where the defaults
//! come from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings for one console server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// TCP port the console connects to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// IP address to bind.  `"0.0.0.0"` accepts consoles from other hosts.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Read buffer size per session, in bytes.  One chunk is decoded and
    /// emitted synchronously before the next read.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Session read deadline in milliseconds.  Bounds how long a stop request
    /// can wait on a blocked read.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Accept poll interval in milliseconds.  Bounds how long a stop request
    /// can wait on the accept thread.
    #[serde(default = "default_accept_poll_ms")]
    pub accept_poll_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    50500
}
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_chunk_size() -> usize {
    1024
}
fn default_read_timeout_ms() -> u64 {
    500
}
fn default_accept_poll_ms() -> u64 {
    50
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            chunk_size: default_chunk_size(),
            read_timeout_ms: default_read_timeout_ms(),
            accept_poll_ms: default_accept_poll_ms(),
        }
    }
}

impl BridgeConfig {
    /// A config bound to an OS-assigned port on loopback.  Pair with
    /// [`crate::Bridge::local_addr`] to discover the chosen port.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }
}

// ── Config file helpers ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("bridge.toml"))
}

/// Loads a [`BridgeConfig`] from `path`, returning defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BridgeConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads the config from the platform config path.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &BridgeConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Persists `config` to the platform config path.
pub fn save_config(config: &BridgeConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TourBoxBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("tourbox-bridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TourBoxBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
