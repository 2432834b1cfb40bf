//! Code interception channel.
//!
//! The server pushes one intercepted [`Code`] at a time and parks it until
//! the client answers with exactly one of cancel, ignore, or resolve. The
//! caller drives the loop:
//!
//! ```rust,ignore
//! let mut conn = InterceptConnection::connect(InterceptOptions::default(), &config)?;
//! loop {
//!     let code = conn.receive_code()?;
//!     if code.is("M", 1234) {
//!         conn.flush(code.channel)?;
//!         conn.resolve_code(MessageType::Success, Some("handled"))?;
//!     } else {
//!         conn.ignore_code()?;
//!     }
//! }
//! ```
//!
//! While a code is outstanding the server waits for the resolution, so
//! ordinary commands can be exchanged on the same connection in that window
//! (see [`CommandChannel`]). Outside it the server may push a code at any
//! moment, so commands are refused there.

use interprocess::local_socket::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::command::CommandChannel;
use super::{Connection, Transport};
use crate::config::ClientConfig;
use crate::models::code::{Code, MessageType};
use crate::models::commands::Command;
use crate::models::init::{ClientInitMessage, InterceptOptions};
use crate::{AppError, Result};

/// Position of an intercept connection in the code/resolution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptState {
    /// No code outstanding; the next inbound frame is a code.
    AwaitingCode,
    /// A code was delivered and must be resolved before the next one.
    CodeDelivered,
}

/// Connection opened in intercept mode.
#[derive(Debug)]
pub struct InterceptConnection<T: Transport = Stream> {
    connection: Connection<T>,
    options: InterceptOptions,
    state: InterceptState,
}

impl InterceptConnection<Stream> {
    /// Connect to the configured socket and start intercepting.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub fn connect(options: InterceptOptions, config: &ClientConfig) -> Result<Self> {
        let init = ClientInitMessage::intercept(config.protocol_version, options.clone());
        let connection = Connection::connect(&init, config)?;
        Ok(Self::from_connection(connection, options))
    }
}

impl<T: Transport> InterceptConnection<T> {
    /// Handshake in intercept mode over an open transport.
    ///
    /// # Errors
    ///
    /// See [`Connection::establish`].
    pub fn establish(transport: T, options: InterceptOptions, config: &ClientConfig) -> Result<Self> {
        let init = ClientInitMessage::intercept(config.protocol_version, options.clone());
        let connection = Connection::establish(transport, &init, config)?;
        Ok(Self::from_connection(connection, options))
    }

    fn from_connection(connection: Connection<T>, options: InterceptOptions) -> Self {
        Self {
            connection,
            options,
            state: InterceptState::AwaitingCode,
        }
    }

    /// Identifier the server assigned to this connection.
    #[must_use]
    pub fn id(&self) -> &str {
        self.connection.id()
    }

    /// Options sent in the init message.
    #[must_use]
    pub fn options(&self) -> &InterceptOptions {
        &self.options
    }

    /// Current position in the code/resolution cycle.
    #[must_use]
    pub fn state(&self) -> InterceptState {
        self.state
    }

    /// Block until the server delivers the next intercepted code.
    ///
    /// The code counts as delivered as soon as its frame arrives, even if it
    /// fails to decode; resolve it either way.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol` if the previous code has not been resolved;
    ///   nothing is read.
    /// - `AppError::Json` if the frame is not a code.
    /// - Transport and framing errors of the connection.
    pub fn receive_code(&mut self) -> Result<Code> {
        if self.state == InterceptState::CodeDelivered {
            return Err(AppError::Protocol(
                "previous code must be canceled, ignored, or resolved before receiving another"
                    .into(),
            ));
        }

        let frame = self.connection.receive_json()?;
        self.state = InterceptState::CodeDelivered;

        let code: Code = serde_json::from_str(&frame)
            .map_err(|err| AppError::Json(format!("intercepted frame is not a code: {err}")))?;
        debug!(id = %self.connection.id(), %code, "intercept: code delivered");
        Ok(code)
    }

    /// Cancel the outstanding code.
    ///
    /// # Errors
    ///
    /// `AppError::Protocol` if no code is outstanding; transport errors.
    pub fn cancel_code(&mut self) -> Result<()> {
        self.answer(&Command::Cancel)
    }

    /// Let the outstanding code continue unchanged.
    ///
    /// # Errors
    ///
    /// `AppError::Protocol` if no code is outstanding; transport errors.
    pub fn ignore_code(&mut self) -> Result<()> {
        self.answer(&Command::Ignore)
    }

    /// Resolve the outstanding code with a message instead of executing it.
    ///
    /// # Errors
    ///
    /// `AppError::Protocol` if no code is outstanding; transport errors.
    pub fn resolve_code(&mut self, message_type: MessageType, content: Option<&str>) -> Result<()> {
        self.answer(&Command::Resolve {
            message_type,
            content: content.map(str::to_owned),
        })
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        self.connection.close();
    }

    fn answer(&mut self, resolution: &Command) -> Result<()> {
        if self.state != InterceptState::CodeDelivered {
            return Err(AppError::Protocol(format!(
                "{} sent with no intercepted code outstanding",
                resolution.name()
            )));
        }

        self.connection.send(resolution)?;
        self.state = InterceptState::AwaitingCode;
        debug!(id = %self.connection.id(), resolution = resolution.name(), "intercept: code answered");
        Ok(())
    }
}

impl<T: Transport> CommandChannel for InterceptConnection<T> {
    /// Exchange a command while a code is outstanding.
    ///
    /// # Errors
    ///
    /// `AppError::Protocol` when no code is outstanding, because the server
    /// could push a code in place of the response.
    fn perform_command<R, S>(&mut self, command: &S) -> Result<R>
    where
        R: DeserializeOwned,
        S: Serialize + ?Sized,
    {
        if self.state != InterceptState::CodeDelivered {
            return Err(AppError::Protocol(
                "commands on an intercept connection are only allowed while a code is outstanding"
                    .into(),
            ));
        }
        self.connection.perform_command(command)
    }
}
