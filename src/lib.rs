#![forbid(unsafe_code)]

//! Blocking client for the control server's JSON socket protocol.
//!
//! Messages are single JSON objects written back to back over a local stream
//! socket, with no length prefix and no delimiter. Three connection modes
//! share that framing:
//!
//! - [`CommandConnection`]: request/response commands.
//! - [`InterceptConnection`]: intercept codes and cancel, ignore, or resolve
//!   each one.
//! - [`SubscribeConnection`]: receive the object model, then acknowledged
//!   snapshots or patches.

pub mod config;
pub mod connection;
pub mod errors;
pub mod framing;
pub mod models;

pub use config::ClientConfig;
pub use connection::command::{CommandChannel, CommandConnection};
pub use connection::intercept::{InterceptConnection, InterceptState};
pub use connection::subscribe::{SubscribeConnection, SubscribeState};
pub use connection::{Connection, Transport};
pub use errors::{AppError, Result};
