//! Server greeting sent once immediately after the transport connects.

use serde::Deserialize;

use super::deserialize_string_or_number;

/// First message on every connection, sent by the server before the client
/// may write anything.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerGreeting {
    /// Protocol version the server speaks.
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub version: String,
    /// Identifier the server assigned to this connection.
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
}

impl ServerGreeting {
    /// Numeric protocol version, if the announced version is an integer.
    #[must_use]
    pub fn protocol_version(&self) -> Option<u32> {
        self.version.trim().parse().ok()
    }

    /// Whether a client requiring protocol `required` may talk to this server.
    ///
    /// Newer servers stay compatible with older clients; anything older than
    /// `required`, or a version that is not an integer, is not.
    #[must_use]
    pub fn is_compatible(&self, required: u32) -> bool {
        self.protocol_version()
            .is_some_and(|version| version >= required)
    }
}
