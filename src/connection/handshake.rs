//! Connection handshake.
//!
//! Every connection starts with the same fixed exchange before any
//! mode-specific traffic:
//!
//! 1. the server sends a [`ServerGreeting`] with its protocol version and the
//!    identifier it assigned to this connection;
//! 2. the client checks the version and, only if it is compatible, sends its
//!    [`ClientInitMessage`];
//! 3. the server answers with a [`ResponseEnvelope`](crate::models::response::ResponseEnvelope)
//!    accepting or rejecting the declared mode.
//!
//! An incompatible version is a hard failure; the client never negotiates
//! down.

use tracing::{debug, info, warn};

use super::{Connection, Transport};
use crate::models::greeting::ServerGreeting;
use crate::models::init::ClientInitMessage;
use crate::{AppError, Result};

/// Run the handshake on a freshly opened connection.
///
/// Records the server-assigned identifier on `connection`. The caller closes
/// the connection when this fails.
pub(super) fn perform<T: Transport>(
    connection: &mut Connection<T>,
    init: &ClientInitMessage,
    required_version: u32,
) -> Result<()> {
    let greeting: ServerGreeting = connection.receive()?;
    check_version(&greeting, required_version)?;

    connection.id = greeting.id;
    debug!(id = %connection.id, version = %greeting.version, "handshake: greeting accepted");

    connection.send(init)?;

    let response = connection.receive_response()?;
    if !response.success {
        let error_type = response.error_type.unwrap_or_default();
        let error_message = response.error_message.unwrap_or_default();
        warn!(
            id = %connection.id,
            mode = %init.mode(),
            %error_type,
            %error_message,
            "handshake: server rejected connection mode"
        );
        return Err(AppError::HandshakeRejected {
            mode: init.mode().to_string(),
            error_type,
            error_message,
        });
    }

    info!(id = %connection.id, mode = %init.mode(), "handshake: connection mode set");
    Ok(())
}

/// Verify that the greeting announces a protocol this client can speak.
///
/// # Errors
///
/// Returns `AppError::IncompatibleVersion` when the server is older than
/// `required_version` or its version is not an integer.
pub fn check_version(greeting: &ServerGreeting, required_version: u32) -> Result<()> {
    if greeting.is_compatible(required_version) {
        Ok(())
    } else {
        Err(AppError::IncompatibleVersion {
            required: required_version,
            actual: greeting.version.clone(),
        })
    }
}
