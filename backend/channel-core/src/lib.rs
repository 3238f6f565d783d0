//! Client-side channel manager.
//!
//! Routes request/response traffic over a persistent WebSocket when the duplex
//! service is reachable and falls back to plain HTTP calls when it is not. Both
//! paths surface their results through one typed event table, so callers never
//! need to know which transport served a request.

pub mod config;
pub mod duplex;
pub mod error;
pub mod events;
pub mod manager;
pub mod transport;

#[cfg(test)]
mod tests;

pub use config::{ChannelConfig, HeartbeatPolicy, ReconnectPolicy};
pub use events::{ChannelEvent, EventHandler, EventKind, HandlerError};
pub use manager::{Availability, ChannelManager, ConnectionState};
pub use transport::OutboundRequest;

pub const CHANNEL_SERVER_HOSTNAME: &str = "127.0.0.1";
pub const CHANNEL_SERVER_PORT: u16 = 5000;
pub const CHANNEL_SERVER_BASE_URL: &str = const_format::concatcp!(
    "http://",
    CHANNEL_SERVER_HOSTNAME,
    ":",
    CHANNEL_SERVER_PORT
);
