//! Duplex (WebSocket) side of the channel.
//!
//! A single background task owns the socket for the lifetime of a
//! [`DuplexLink`]: it performs the handshake, pumps outbound frames, turns
//! inbound frames into events, keeps the heartbeat, and reconnects with
//! jittered exponential backoff when the connection drops. Everything it
//! observes is reported through a [`LinkObserver`].

mod connection;
pub mod endpoint;
pub mod frame;

pub use endpoint::duplex_url;
pub use frame::DuplexFrame;

pub(crate) use connection::{DuplexLink, LinkObserver, LinkSettings, LinkSignal};

/// Reason reported when the client closes the connection itself.
pub const REASON_CLIENT_DISCONNECT: &str = "io client disconnect";
/// The peer sent a close frame.
pub const REASON_SERVER_DISCONNECT: &str = "io server disconnect";
/// The stream ended without a close frame.
pub const REASON_TRANSPORT_CLOSE: &str = "transport close";
/// Reading or writing the socket failed.
pub const REASON_TRANSPORT_ERROR: &str = "transport error";
/// Nothing was received within the heartbeat timeout.
pub const REASON_PING_TIMEOUT: &str = "ping timeout";
