//! Lifecycle state tracked by the channel manager.

use crate::duplex::{LinkObserver, LinkSignal};
use crate::events::{ChannelEvent, HandlerTable};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::{PoisonError, RwLock};

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Probing,
    Unavailable,
    Connecting,
    Connected,
    Disconnected,
    ReconnectFailed,
}

impl Display for ConnectionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Probing => "probing",
            ConnectionState::Unavailable => "unavailable",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::ReconnectFailed => "reconnect_failed",
        };
        formatter.write_str(name)
    }
}

/// Result of the most recent availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

impl Availability {
    /// `None` while no probe has completed.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Availability::Unknown => None,
            Availability::Available => Some(true),
            Availability::Unavailable => Some(false),
        }
    }
}

/// State shared between the manager handle and the duplex task.
///
/// Locks are held only for the duration of a read or write, never across an
/// await point or while handlers run.
#[derive(Default)]
pub(crate) struct SharedState {
    connection: RwLock<ConnectionState>,
    availability: RwLock<Availability>,
    pub(crate) handlers: HandlerTable,
}

impl SharedState {
    pub(crate) fn connection(&self) -> ConnectionState {
        *self.connection.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_connection(&self, next: ConnectionState) {
        let mut current = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != next {
            info!("Connection state: {} -> {}", *current, next);
            *current = next;
        }
    }

    pub(crate) fn availability(&self) -> Availability {
        *self
            .availability
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_availability(&self, next: Availability) {
        *self
            .availability
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub(crate) fn emit(&self, event: ChannelEvent) {
        self.handlers.dispatch(&event);
    }
}

impl LinkObserver for SharedState {
    fn on_signal(&self, signal: LinkSignal) {
        match signal {
            LinkSignal::Connected => {
                self.set_connection(ConnectionState::Connected);
                self.emit(ChannelEvent::Connect);
            }
            LinkSignal::Reconnected { attempt_number } => {
                self.set_connection(ConnectionState::Connected);
                self.emit(ChannelEvent::Reconnect { attempt_number });
            }
            LinkSignal::Disconnected { reason } => {
                self.set_connection(ConnectionState::Disconnected);
                self.emit(ChannelEvent::Disconnect { reason });
            }
            LinkSignal::Inbound(event) => self.emit(event),
            LinkSignal::ReconnectFailed => {
                warn!("Duplex reconnection exhausted, switching to HTTP fallback");
                self.set_connection(ConnectionState::ReconnectFailed);
                self.set_availability(Availability::Unavailable);
                self.emit(ChannelEvent::ReconnectFailed);
                self.emit(ChannelEvent::DuplexUnavailable);
            }
        }
    }
}
