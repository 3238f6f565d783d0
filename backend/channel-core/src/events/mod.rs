//! Typed event vocabulary shared by both transports.
//!
//! Inbound duplex frames, synthesized fallback responses and lifecycle changes
//! all become a [`ChannelEvent`]. External collaborators subscribe by
//! [`EventKind`] and never see which transport produced the event.

mod handler;

pub use handler::{EventHandler, HandlerError, HandlerTable};

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde_json::Value;

/// Discriminant of a [`ChannelEvent`]; the key of the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Reconnect,
    ReconnectFailed,
    DuplexUnavailable,
    InterfacesResponse,
    DynamicResponse,
    ConnectionResponse,
    Error,
    SendError,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Connect,
        EventKind::Disconnect,
        EventKind::Reconnect,
        EventKind::ReconnectFailed,
        EventKind::DuplexUnavailable,
        EventKind::InterfacesResponse,
        EventKind::DynamicResponse,
        EventKind::ConnectionResponse,
        EventKind::Error,
        EventKind::SendError,
    ];

    /// Wire name of the event.
    pub const fn name(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Reconnect => "reconnect",
            EventKind::ReconnectFailed => "reconnect_failed",
            EventKind::DuplexUnavailable => "duplex_unavailable",
            EventKind::InterfacesResponse => "interfaces_response",
            EventKind::DynamicResponse => "dynamic_response",
            EventKind::ConnectionResponse => "connection_response",
            EventKind::Error => "error",
            EventKind::SendError => "send_error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl Display for EventKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.name())
    }
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// First successful duplex handshake.
    Connect,

    /// The live duplex connection went away.
    Disconnect { reason: String },

    /// A later handshake succeeded after the connection was lost.
    Reconnect { attempt_number: u32 },

    /// Reconnection attempts were exhausted.
    ReconnectFailed,

    /// The duplex service cannot be used; requests go over HTTP.
    DuplexUnavailable,

    InterfacesResponse(Value),

    DynamicResponse(Value),

    ConnectionResponse(Value),

    /// A request failed. `payload` holds the raw frame when the server sent it.
    Error {
        message: String,
        payload: Option<Value>,
    },

    /// A raw send was attempted without a live duplex connection.
    SendError {
        event: String,
        data: Value,
        message: String,
    },
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::Connect => EventKind::Connect,
            ChannelEvent::Disconnect { .. } => EventKind::Disconnect,
            ChannelEvent::Reconnect { .. } => EventKind::Reconnect,
            ChannelEvent::ReconnectFailed => EventKind::ReconnectFailed,
            ChannelEvent::DuplexUnavailable => EventKind::DuplexUnavailable,
            ChannelEvent::InterfacesResponse(_) => EventKind::InterfacesResponse,
            ChannelEvent::DynamicResponse(_) => EventKind::DynamicResponse,
            ChannelEvent::ConnectionResponse(_) => EventKind::ConnectionResponse,
            ChannelEvent::Error { .. } => EventKind::Error,
            ChannelEvent::SendError { .. } => EventKind::SendError,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ChannelEvent::Error {
            message: message.into(),
            payload: None,
        }
    }
}
