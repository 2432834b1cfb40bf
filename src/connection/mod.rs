//! Connections to the control server.
//!
//! A [`Connection`] owns one transport and the read-ahead buffer in front of
//! it. It only exists after a successful handshake, and every channel
//! operation takes `&mut self`, so a connection can never have two requests
//! in flight: the protocol has no request identifiers and relies on strict
//! request/response ordering.
//!
//! Submodules:
//! - `handshake`: greeting validation and init-message exchange.
//! - `command`: [`CommandConnection`](command::CommandConnection) and the
//!   [`CommandChannel`](command::CommandChannel) helpers.
//! - `intercept`: [`InterceptConnection`](intercept::InterceptConnection).
//! - `subscribe`: [`SubscribeConnection`](subscribe::SubscribeConnection).

pub mod command;
pub mod handshake;
pub mod intercept;
pub mod subscribe;

use std::io::{Read, Write};
use std::path::Path;

use interprocess::local_socket::{traits::Stream as _, GenericFilePath, Stream, ToFsName};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::framing::reader::FrameReader;
use crate::framing::writer::{encode_frame, write_frame};
use crate::models::init::{ClientInitMessage, ConnectionMode};
use crate::models::response::ResponseEnvelope;
use crate::{AppError, Result};

/// Bidirectional byte stream a connection runs over.
///
/// Implemented for every blocking `Read + Write + Send` type; the default is
/// an `interprocess` local socket stream.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> Transport for T {}

/// Open the control server's local socket at `path`.
///
/// # Errors
///
/// Returns `AppError::Io` if the path is not a valid socket name or the
/// connect fails.
pub fn open_local_socket(path: &Path) -> Result<Stream> {
    let name = path.to_fs_name::<GenericFilePath>().map_err(|err| {
        AppError::Io(format!("invalid socket path '{}': {err}", path.display()))
    })?;

    Stream::connect(name)
        .map_err(|err| AppError::Io(format!("failed to connect to '{}': {err}", path.display())))
}

/// A handshaken connection to the control server.
pub struct Connection<T: Transport = Stream> {
    transport: Option<T>,
    reader: FrameReader,
    id: String,
    mode: ConnectionMode,
}

impl Connection<Stream> {
    /// Connect to the socket named in `config` and perform the handshake.
    ///
    /// # Errors
    ///
    /// - `AppError::Config` if `config` is invalid.
    /// - `AppError::Io` if the socket cannot be opened.
    /// - Any error of [`Connection::establish`].
    pub fn connect(init: &ClientInitMessage, config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let stream = open_local_socket(&config.socket_path)?;
        debug!(socket = %config.socket_path.display(), "transport connected");
        Self::establish(stream, init, config)
    }
}

impl<T: Transport> Connection<T> {
    /// Perform the handshake over an already-open transport.
    ///
    /// On failure the transport is closed before the error is returned.
    ///
    /// # Errors
    ///
    /// - `AppError::IncompatibleVersion` if the greeting announces an
    ///   unsupported protocol version; nothing has been written.
    /// - `AppError::HandshakeRejected` if the server declines the mode.
    /// - `AppError::Io`, `AppError::Closed`, `AppError::Framing`, or
    ///   `AppError::Json` if the exchange itself fails.
    pub fn establish(transport: T, init: &ClientInitMessage, config: &ClientConfig) -> Result<Self> {
        let mut connection = Self {
            transport: Some(transport),
            reader: FrameReader::from_config(config),
            id: String::new(),
            mode: init.mode(),
        };

        if let Err(err) = handshake::perform(&mut connection, init, config.protocol_version) {
            connection.close();
            return Err(err);
        }

        info!(id = %connection.id, mode = %connection.mode, "connection established");
        Ok(connection)
    }

    /// Identifier the server assigned during the handshake.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mode declared in the init message.
    #[must_use]
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    /// Whether the transport is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Serialize `message` and send it as one frame.
    ///
    /// # Errors
    ///
    /// - `AppError::Closed` if the connection is closed.
    /// - `AppError::Json` or `AppError::Framing` if `message` is not a JSON
    ///   object.
    /// - `AppError::Io` if the write fails; the connection is closed.
    pub fn send<S: Serialize + ?Sized>(&mut self, message: &S) -> Result<()> {
        let frame = encode_frame(message)?;
        debug!(id = %self.id, %frame, "send");

        let Some(transport) = self.transport.as_mut() else {
            return Err(closed_error());
        };
        let outcome = write_frame(transport, frame);
        self.teardown_on_fatal(outcome)
    }

    /// Receive the next frame as raw JSON text.
    ///
    /// # Errors
    ///
    /// - `AppError::Closed` if the connection is or becomes closed.
    /// - `AppError::Io` if the read fails; the connection is closed.
    /// - `AppError::Framing` if the stream cannot be split into objects.
    pub fn receive_json(&mut self) -> Result<String> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(closed_error());
        };
        let outcome = self.reader.read_frame(transport);
        let frame = self.teardown_on_fatal(outcome)?;

        debug!(id = %self.id, %frame, "recv");
        Ok(frame)
    }

    /// Receive the next frame and decode it into `R`.
    ///
    /// # Errors
    ///
    /// Any error of [`Connection::receive_json`], or `AppError::Json` if the
    /// frame does not fit `R` (the frame is consumed either way).
    pub fn receive<R: DeserializeOwned>(&mut self) -> Result<R> {
        let frame = self.receive_json()?;
        serde_json::from_str(&frame)
            .map_err(|err| AppError::Json(format!("unexpected frame shape: {err}")))
    }

    /// Receive the next frame as a response envelope.
    ///
    /// # Errors
    ///
    /// Any error of [`Connection::receive`].
    pub fn receive_response(&mut self) -> Result<ResponseEnvelope> {
        self.receive()
    }

    /// Send `command` and decode the single response it produces.
    ///
    /// # Errors
    ///
    /// - `AppError::TaskCanceled` if the server canceled the task.
    /// - `AppError::ServerFault` for any other unsuccessful response.
    /// - Any error of [`Connection::send`] or [`Connection::receive`].
    pub fn perform_command<R, S>(&mut self, command: &S) -> Result<R>
    where
        R: DeserializeOwned,
        S: Serialize + ?Sized,
    {
        let request = serde_json::to_value(command)
            .map_err(|err| AppError::Json(format!("failed to serialise command: {err}")))?;
        self.send(&request)?;

        let response = self.receive_response()?;
        if !response.success {
            debug!(
                id = %self.id,
                error_type = response.error_type.as_deref().unwrap_or_default(),
                "command failed"
            );
        }
        response.into_result(request)
    }

    /// Close the transport and discard buffered input.
    ///
    /// Safe to call more than once; only the first call closes anything.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            drop(transport);
            self.reader.clear();
            info!(id = %self.id, "connection closed");
        }
    }

    /// Close the connection when `outcome` is a transport-level failure.
    fn teardown_on_fatal<V>(&mut self, outcome: Result<V>) -> Result<V> {
        if let Err(err) = &outcome {
            if err.is_fatal() && self.is_open() {
                warn!(id = %self.id, error = %err, "transport failed, closing connection");
                self.close();
            }
        }
        outcome
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("open", &self.is_open())
            .field("buffered", &self.reader.buffered().len())
            .finish()
    }
}

fn closed_error() -> AppError {
    AppError::Closed("connection is closed".into())
}
