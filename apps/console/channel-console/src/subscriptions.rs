use channel_core::{ChannelEvent, ChannelManager, EventHandler, EventKind};

use log::{info, warn};

/// Register one logging handler per event kind.
pub fn subscribe_logging(manager: &ChannelManager) {
    for kind in EventKind::ALL {
        manager.on(kind, EventHandler::from_fn(log_event));
    }
}

pub fn log_event(event: &ChannelEvent) {
    if is_failure(event) {
        warn!("{}", describe(event));
    } else {
        info!("{}", describe(event));
    }
}

pub fn is_failure(event: &ChannelEvent) -> bool {
    matches!(
        event.kind(),
        EventKind::Error
            | EventKind::SendError
            | EventKind::ReconnectFailed
            | EventKind::DuplexUnavailable
    )
}

/// One-line summary of an event for the console.
pub fn describe(event: &ChannelEvent) -> String {
    let kind = event.kind();
    match event {
        ChannelEvent::Connect | ChannelEvent::ReconnectFailed | ChannelEvent::DuplexUnavailable => {
            kind.to_string()
        }
        ChannelEvent::Disconnect { reason } => format!("{kind}: {reason}"),
        ChannelEvent::Reconnect { attempt_number } => {
            format!("{kind} after {attempt_number} attempt(s)")
        }
        ChannelEvent::InterfacesResponse(data)
        | ChannelEvent::DynamicResponse(data)
        | ChannelEvent::ConnectionResponse(data) => format!("{kind}: {data}"),
        ChannelEvent::Error { message, payload } => match payload {
            Some(payload) => format!("{kind}: {message} ({payload})"),
            None => format!("{kind}: {message}"),
        },
        ChannelEvent::SendError {
            event,
            data,
            message,
        } => format!("{kind}: {message} [{event} {data}]"),
    }
}
