//! Object model subscription channel.
//!
//! After the handshake the server pushes the full object model. In
//! [`SubscriptionMode::Full`] every later payload is a full model again; in
//! [`SubscriptionMode::Patch`] every later payload is an incremental patch.
//! Each payload must be acknowledged before the server sends the next one;
//! every receive operation here acknowledges immediately after reading.
//!
//! Patches are handed out as JSON text. Merging them into a model belongs to
//! the caller.

use interprocess::local_socket::Stream;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Connection, Transport};
use crate::config::ClientConfig;
use crate::models::commands::Command;
use crate::models::init::{ClientInitMessage, SubscribeOptions, SubscriptionMode};
use crate::{AppError, Result};

/// Position of a subscription in its payload sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeState {
    /// The next payload is the initial full snapshot.
    AwaitingSnapshot,
    /// The snapshot was received; later payloads follow the subscription mode.
    Streaming,
}

/// Connection opened in subscribe mode.
#[derive(Debug)]
pub struct SubscribeConnection<T: Transport = Stream> {
    connection: Connection<T>,
    options: SubscribeOptions,
    state: SubscribeState,
}

impl SubscribeConnection<Stream> {
    /// Connect to the configured socket and subscribe.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub fn connect(options: SubscribeOptions, config: &ClientConfig) -> Result<Self> {
        let init = ClientInitMessage::subscribe(config.protocol_version, options.clone());
        let connection = Connection::connect(&init, config)?;
        Ok(Self::from_connection(connection, options))
    }
}

impl<T: Transport> SubscribeConnection<T> {
    /// Handshake in subscribe mode over an open transport.
    ///
    /// # Errors
    ///
    /// See [`Connection::establish`].
    pub fn establish(transport: T, options: SubscribeOptions, config: &ClientConfig) -> Result<Self> {
        let init = ClientInitMessage::subscribe(config.protocol_version, options.clone());
        let connection = Connection::establish(transport, &init, config)?;
        Ok(Self::from_connection(connection, options))
    }

    fn from_connection(connection: Connection<T>, options: SubscribeOptions) -> Self {
        Self {
            connection,
            options,
            state: SubscribeState::AwaitingSnapshot,
        }
    }

    /// Identifier the server assigned to this connection.
    #[must_use]
    pub fn id(&self) -> &str {
        self.connection.id()
    }

    /// Subscription mode sent in the init message.
    #[must_use]
    pub fn mode(&self) -> SubscriptionMode {
        self.options.mode
    }

    /// Current position in the payload sequence.
    #[must_use]
    pub fn state(&self) -> SubscribeState {
        self.state
    }

    /// Receive the next full object model, decoded into `M`, and acknowledge it.
    ///
    /// The payload is acknowledged before decoding, so a shape mismatch does
    /// not stall the subscription.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol` on a patch subscription once the snapshot has
    ///   been received.
    /// - `AppError::Json` if the payload does not fit `M`.
    /// - Transport and framing errors of the connection.
    pub fn get_object_model<M: DeserializeOwned>(&mut self) -> Result<M> {
        if self.options.mode == SubscriptionMode::Patch && self.state == SubscribeState::Streaming {
            return Err(AppError::Protocol(
                "patch subscription already delivered its snapshot; receive patches instead".into(),
            ));
        }

        let json = self.receive_acknowledged()?;
        serde_json::from_str(&json)
            .map_err(|err| AppError::Json(format!("unexpected object model shape: {err}")))
    }

    /// Receive the next payload as JSON text and acknowledge it.
    ///
    /// Valid in every state: returns the snapshot first, then whatever the
    /// subscription mode delivers.
    ///
    /// # Errors
    ///
    /// Transport and framing errors of the connection.
    pub fn get_serialized_object_model(&mut self) -> Result<String> {
        self.receive_acknowledged()
    }

    /// Receive the next patch as JSON text and acknowledge it.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol` on a full subscription, or before the snapshot
    ///   has been received.
    /// - Transport and framing errors of the connection.
    pub fn get_object_model_patch(&mut self) -> Result<String> {
        if self.options.mode != SubscriptionMode::Patch {
            return Err(AppError::Protocol(
                "full subscriptions deliver snapshots, not patches".into(),
            ));
        }
        if self.state == SubscribeState::AwaitingSnapshot {
            return Err(AppError::Protocol(
                "the snapshot must be received before the first patch".into(),
            ));
        }

        self.receive_acknowledged()
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        self.connection.close();
    }

    fn receive_acknowledged(&mut self) -> Result<String> {
        let json = self.connection.receive_json()?;
        self.connection.send(&Command::Acknowledge)?;

        if self.state == SubscribeState::AwaitingSnapshot {
            debug!(id = %self.connection.id(), bytes = json.len(), "subscribe: snapshot received");
        }
        self.state = SubscribeState::Streaming;
        Ok(json)
    }
}
