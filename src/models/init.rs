//! Client init message declaring the connection mode.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::code::CodeChannel;

/// Connection mode declared in the init message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// Request/response command channel.
    Command,
    /// Code interception stream.
    Intercept,
    /// Object model subscription stream.
    Subscribe,
}

impl Display for ConnectionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Command => "command",
            Self::Intercept => "intercept",
            Self::Subscribe => "subscribe",
        })
    }
}

/// Point in a code's lifecycle at which it is intercepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InterceptionMode {
    /// Before the code is processed internally.
    #[default]
    Pre,
    /// After internal processing, before the firmware sees it.
    Post,
    /// After the code has been executed.
    Executed,
}

/// Shape of the payloads pushed on a subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SubscriptionMode {
    /// Every payload is the full object model.
    #[default]
    Full,
    /// The full object model once, then incremental patches.
    Patch,
}

/// Parameters of an intercept-mode connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptOptions {
    /// Lifecycle point to intercept at.
    pub mode: InterceptionMode,
    /// Channels to intercept; all channels by default.
    pub channels: Vec<CodeChannel>,
    /// Code filters such as `G28` or `M*`; every code when absent.
    pub filters: Option<Vec<String>>,
    /// Also intercept codes flagged as priority codes.
    pub priority_codes: bool,
}

impl Default for InterceptOptions {
    fn default() -> Self {
        Self {
            mode: InterceptionMode::default(),
            channels: CodeChannel::ALL.to_vec(),
            filters: None,
            priority_codes: false,
        }
    }
}

impl InterceptOptions {
    /// Intercept every code on every channel at `mode`.
    #[must_use]
    pub fn new(mode: InterceptionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Parameters of a subscribe-mode connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscribeOptions {
    /// Payload shape.
    pub mode: SubscriptionMode,
    /// Single object model path filter; empty for the whole model.
    pub filter: String,
    /// Several object model path filters.
    pub filters: Option<Vec<String>>,
}

impl SubscribeOptions {
    /// Subscribe to the whole object model in `mode`.
    #[must_use]
    pub fn new(mode: SubscriptionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Message sent once by the client right after a compatible greeting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientInitMessage {
    /// Open a command channel.
    Command {
        /// Client protocol version.
        version: u32,
    },
    /// Open a code interception stream.
    Intercept {
        /// Client protocol version.
        version: u32,
        /// Lifecycle point to intercept at.
        interception_mode: InterceptionMode,
        /// Channels to intercept.
        channels: Vec<CodeChannel>,
        /// Code filters.
        #[serde(skip_serializing_if = "Option::is_none")]
        filters: Option<Vec<String>>,
        /// Also intercept priority codes.
        priority_codes: bool,
    },
    /// Open an object model subscription.
    Subscribe {
        /// Client protocol version.
        version: u32,
        /// Payload shape.
        subscription_mode: SubscriptionMode,
        /// Single path filter.
        filter: String,
        /// Several path filters.
        #[serde(skip_serializing_if = "Option::is_none")]
        filters: Option<Vec<String>>,
    },
}

impl ClientInitMessage {
    /// Init message for a command channel.
    #[must_use]
    pub fn command(version: u32) -> Self {
        Self::Command { version }
    }

    /// Init message for a code interception stream.
    #[must_use]
    pub fn intercept(version: u32, options: InterceptOptions) -> Self {
        Self::Intercept {
            version,
            interception_mode: options.mode,
            channels: options.channels,
            filters: options.filters,
            priority_codes: options.priority_codes,
        }
    }

    /// Init message for an object model subscription.
    #[must_use]
    pub fn subscribe(version: u32, options: SubscribeOptions) -> Self {
        Self::Subscribe {
            version,
            subscription_mode: options.mode,
            filter: options.filter,
            filters: options.filters,
        }
    }

    /// Connection mode this message declares.
    #[must_use]
    pub fn mode(&self) -> ConnectionMode {
        match self {
            Self::Command { .. } => ConnectionMode::Command,
            Self::Intercept { .. } => ConnectionMode::Intercept,
            Self::Subscribe { .. } => ConnectionMode::Subscribe,
        }
    }
}
