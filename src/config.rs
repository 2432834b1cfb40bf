//! Client configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Socket the control server listens on unless configured otherwise.
pub const DEFAULT_SOCKET_PATH: &str = "/run/dsf/dcs.sock";

/// Protocol version this client implements.
pub const PROTOCOL_VERSION: u32 = 12;

/// Bytes requested from the transport per read.
pub const DEFAULT_READ_CHUNK_BYTES: usize = 4096;

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_protocol_version() -> u32 {
    PROTOCOL_VERSION
}

fn default_read_chunk_bytes() -> usize {
    DEFAULT_READ_CHUNK_BYTES
}

/// Connection settings, usually parsed from `dsf-client.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Filesystem path of the control server's stream socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Oldest server protocol version accepted; also announced in the init message.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,
    /// Bytes requested from the transport per read.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Optional upper bound on a single inbound frame; unbounded when absent.
    #[serde(default)]
    pub max_frame_bytes: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            protocol_version: PROTOCOL_VERSION,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
            max_frame_bytes: None,
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at a different socket.
    #[must_use]
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: path.into(),
            ..Self::default()
        }
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(AppError::Config("socket_path must not be empty".into()));
        }

        if self.protocol_version == 0 {
            return Err(AppError::Config(
                "protocol_version must be greater than zero".into(),
            ));
        }

        if self.read_chunk_bytes == 0 {
            return Err(AppError::Config(
                "read_chunk_bytes must be greater than zero".into(),
            ));
        }

        if let Some(limit) = self.max_frame_bytes {
            if limit < self.read_chunk_bytes {
                return Err(AppError::Config(format!(
                    "max_frame_bytes ({limit}) must be at least read_chunk_bytes ({})",
                    self.read_chunk_bytes
                )));
            }
        }

        Ok(())
    }
}
