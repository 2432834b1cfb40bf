//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Client error enumeration covering every protocol failure mode.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Transport connect, read, or write failure. The connection is closed.
    Io(String),
    /// The peer closed the transport, or the connection was already closed.
    Closed(String),
    /// The server speaks a protocol version this client does not support.
    IncompatibleVersion {
        /// Minimum protocol version the client requires.
        required: u32,
        /// Version string announced in the server greeting.
        actual: String,
    },
    /// The server declined the connection mode sent in the init message.
    HandshakeRejected {
        /// Connection mode that was requested.
        mode: String,
        /// Error kind reported by the server.
        error_type: String,
        /// Error message reported by the server.
        error_message: String,
    },
    /// The server canceled the task behind a command.
    TaskCanceled(String),
    /// Any other unsuccessful command response, reported verbatim.
    ServerFault {
        /// The request that failed, as sent.
        command: serde_json::Value,
        /// Error kind reported by the server.
        error_type: String,
        /// Error message reported by the server.
        error_message: String,
    },
    /// The inbound byte stream could not be split into JSON objects.
    Framing(String),
    /// A frame did not decode into the expected shape, or a value failed to serialize.
    Json(String),
    /// The caller used a streaming channel out of order.
    Protocol(String),
}

impl AppError {
    /// Whether this error tore down the connection it occurred on.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Closed(_)
                | Self::IncompatibleVersion { .. }
                | Self::HandshakeRejected { .. }
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Closed(msg) => write!(f, "closed: {msg}"),
            Self::IncompatibleVersion { required, actual } => write!(
                f,
                "incompatible version: need protocol {required} or newer, got {actual}"
            ),
            Self::HandshakeRejected {
                mode,
                error_type,
                error_message,
            } => write!(
                f,
                "handshake rejected: could not set connection mode {mode} ({error_type}: {error_message})"
            ),
            Self::TaskCanceled(msg) => write!(f, "task canceled: {msg}"),
            Self::ServerFault {
                error_type,
                error_message,
                ..
            } => write!(f, "server fault: {error_type}: {error_message}"),
            Self::Framing(msg) => write!(f, "framing: {msg}"),
            Self::Json(msg) => write!(f, "json: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
