use crate::duplex::{LinkObserver, LinkSignal};
use crate::events::{ChannelEvent, EventHandler, EventKind};
use crate::manager::state::SharedState;
use crate::manager::{Availability, ConnectionState};

use std::sync::{Arc, Mutex};

fn record_all(shared: &SharedState) -> Arc<Mutex<Vec<ChannelEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    for kind in EventKind::ALL {
        let sink = Arc::clone(&events);
        shared.handlers.register(
            kind,
            EventHandler::from_fn(move |event| sink.lock().unwrap().push(event.clone())),
        );
    }
    events
}

/// **VALUE**: Verifies reconnect exhaustion flips state, availability and emits both events once.
///
/// **WHY THIS MATTERS**: This is the only path that downgrades availability after a
/// successful probe; the UI switches to fallback mode on `duplex_unavailable`.
///
/// **BUG THIS CATCHES**: Would catch missing availability downgrade or duplicated events.
#[test]
fn given_connected_when_reconnect_failed_signal_then_degrades_to_fallback() {
    // GIVEN: A connected state with availability confirmed
    let shared = SharedState::default();
    shared.set_availability(Availability::Available);
    shared.on_signal(LinkSignal::Connected);
    let events = record_all(&shared);

    // WHEN: The link reports a lost connection followed by exhaustion
    shared.on_signal(LinkSignal::Disconnected {
        reason: "transport close".to_string(),
    });
    shared.on_signal(LinkSignal::ReconnectFailed);

    // THEN: State and availability reflect the failure
    assert_eq!(shared.connection(), ConnectionState::ReconnectFailed);
    assert_eq!(shared.availability(), Availability::Unavailable);

    // AND: Events fired in order, each exactly once
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            ChannelEvent::Disconnect {
                reason: "transport close".to_string()
            },
            ChannelEvent::ReconnectFailed,
            ChannelEvent::DuplexUnavailable,
        ]
    );
}

#[test]
fn given_disconnected_when_reconnected_signal_then_connected_with_attempt_number() {
    // GIVEN: A dropped connection
    let shared = SharedState::default();
    shared.on_signal(LinkSignal::Disconnected {
        reason: "ping timeout".to_string(),
    });
    let events = record_all(&shared);

    // WHEN: The link reconnects on the third attempt
    shared.on_signal(LinkSignal::Reconnected { attempt_number: 3 });

    // THEN
    assert_eq!(shared.connection(), ConnectionState::Connected);
    assert_eq!(
        *events.lock().unwrap(),
        vec![ChannelEvent::Reconnect { attempt_number: 3 }]
    );
}

#[test]
fn given_inbound_signal_when_observed_then_forwarded_without_state_change() {
    // GIVEN
    let shared = SharedState::default();
    shared.on_signal(LinkSignal::Connected);
    let events = record_all(&shared);
    let payload = serde_json::json!({"sid": "abc"});

    // WHEN
    shared.on_signal(LinkSignal::Inbound(ChannelEvent::ConnectionResponse(
        payload.clone(),
    )));

    // THEN
    assert_eq!(shared.connection(), ConnectionState::Connected);
    assert_eq!(
        *events.lock().unwrap(),
        vec![ChannelEvent::ConnectionResponse(payload)]
    );
}

#[test]
fn given_availability_when_converted_then_tri_state_maps_to_option() {
    assert_eq!(Availability::Unknown.as_bool(), None);
    assert_eq!(Availability::Available.as_bool(), Some(true));
    assert_eq!(Availability::Unavailable.as_bool(), Some(false));
    assert_eq!(Availability::default(), Availability::Unknown);
    assert_eq!(ConnectionState::default(), ConnectionState::Uninitialized);
}
