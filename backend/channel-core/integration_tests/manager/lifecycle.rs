use crate::helpers::{
    DEAD_DUPLEX_URL, DuplexPeer, EventRecorder, STATUS_PATH, connected_manager, mount_status,
    test_config, wait_until,
};

use channel_core::duplex::REASON_CLIENT_DISCONNECT;
use channel_core::{Availability, ChannelEvent, ChannelManager, ConnectionState};

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// **VALUE**: Verifies init is latched.
///
/// **WHY THIS MATTERS**: UI code calls init from several places (mount, focus,
/// retry buttons). Each call must not start another probe or another socket.
///
/// **BUG THIS CATCHES**: Would catch a latch that is only set after the probe
/// finishes, letting concurrent callers probe in parallel.
#[tokio::test]
async fn given_initialized_manager_when_init_called_again_then_probe_runs_once() {
    // GIVEN: A status endpoint that must be hit exactly once
    let http = MockServer::start().await;
    mount_status(&http, false, 1).await;
    let manager = ChannelManager::new(test_config(&http, DEAD_DUPLEX_URL)).unwrap();

    // WHEN: init is called three times, two of them concurrently
    manager.init().await;
    tokio::join!(manager.init(), manager.init());

    // THEN: Dropping the mock server verifies a single probe
    assert_eq!(manager.connection_state(), ConnectionState::Unavailable);
}

/// **VALUE**: Verifies the unavailable path.
///
/// **WHY THIS MATTERS**: Callers switch their UI to HTTP mode on
/// `duplex_unavailable`. It must fire exactly once and no socket may be opened.
///
/// **BUG THIS CATCHES**: Would catch init trying to connect anyway, or a second
/// init re-announcing unavailability.
#[tokio::test]
async fn given_service_reports_unavailable_when_init_then_fallback_announced_once() {
    // GIVEN: A status endpoint answering available=false
    let http = MockServer::start().await;
    mount_status(&http, false, 1).await;
    let peer = DuplexPeer::start().await;
    let manager = ChannelManager::new(test_config(&http, &peer.url)).unwrap();
    let mut recorder = EventRecorder::attach(&manager);

    // WHEN: init runs twice
    manager.init().await;
    manager.init().await;

    // THEN: One duplex_unavailable, no connection attempt
    let events = recorder.collect_for(Duration::from_millis(100)).await;
    assert_eq!(events, vec![ChannelEvent::DuplexUnavailable]);
    assert_eq!(manager.get_availability(), Availability::Unavailable);
    assert_eq!(manager.connection_state(), ConnectionState::Unavailable);
    assert!(!manager.get_connection_status());
    assert_eq!(peer.connection_count(), 0);
}

/// **VALUE**: Verifies a failing status endpoint counts as unavailable.
///
/// **WHY THIS MATTERS**: A server without duplex support may answer the status
/// route with an error page. That must not leave the manager stuck probing.
///
/// **BUG THIS CATCHES**: Would catch probe errors being propagated or treated as
/// "available".
#[tokio::test]
async fn given_status_endpoint_errors_when_init_then_unavailable() {
    // GIVEN: A status endpoint returning 500
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&http)
        .await;
    let manager = ChannelManager::new(test_config(&http, DEAD_DUPLEX_URL)).unwrap();
    let mut recorder = EventRecorder::attach(&manager);

    // WHEN: init runs
    manager.init().await;

    // THEN: Fallback mode
    assert_eq!(recorder.next().await, ChannelEvent::DuplexUnavailable);
    assert_eq!(manager.get_availability(), Availability::Unavailable);
}

/// **VALUE**: Verifies a status body without `available: true` is unavailable.
///
/// **BUG THIS CATCHES**: Would catch a probe that only checks the status code.
#[tokio::test]
async fn given_status_body_malformed_when_init_then_unavailable() {
    // GIVEN: 200 with an unexpected body
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&http)
        .await;
    let manager = ChannelManager::new(test_config(&http, DEAD_DUPLEX_URL)).unwrap();

    // WHEN: init runs
    manager.init().await;

    // THEN: Fallback mode
    assert_eq!(manager.connection_state(), ConnectionState::Unavailable);
}

/// **VALUE**: Verifies the probe is bounded by its own timeout.
///
/// **WHY THIS MATTERS**: A hung status route would otherwise block init for the
/// full request timeout.
///
/// **BUG THIS CATCHES**: Would catch the probe using the general request timeout.
#[tokio::test]
async fn given_status_endpoint_hangs_when_init_then_probe_times_out() {
    // GIVEN: A status endpoint slower than the 500ms probe timeout
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "available": true }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&http)
        .await;
    let manager = ChannelManager::new(test_config(&http, DEAD_DUPLEX_URL)).unwrap();

    // WHEN: init runs
    let started = Instant::now();
    manager.init().await;

    // THEN: It gives up well before the delayed answer
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(manager.get_availability(), Availability::Unavailable);
}

/// **VALUE**: Verifies the happy path.
///
/// **BUG THIS CATCHES**: Would catch `connect` not being emitted, or the status
/// flag not following the handshake.
#[tokio::test]
async fn given_service_available_when_init_then_connects() {
    // GIVEN: An available service
    let http = MockServer::start().await;
    let peer = DuplexPeer::start().await;

    // WHEN: init runs (inside the helper)
    let (manager, mut recorder) = connected_manager(&http, &peer).await;

    // THEN: Connected and available, one socket
    assert_eq!(manager.connection_state(), ConnectionState::Connected);
    assert_eq!(manager.get_availability(), Availability::Available);
    assert_eq!(peer.connection_count(), 1);
    assert!(recorder.drain().is_empty());
}

/// **VALUE**: Verifies disconnect reports a client-side close and resets state.
///
/// **WHY THIS MATTERS**: Subscribers tear down UI on `disconnect`. They get it
/// once, before they are removed.
///
/// **BUG THIS CATCHES**: Would catch handlers being cleared before the event is
/// emitted, or the link task outliving disconnect.
#[tokio::test]
async fn given_connected_when_disconnect_then_client_disconnect_reported() {
    // GIVEN: A connected manager
    let http = MockServer::start().await;
    let peer = DuplexPeer::start().await;
    let (manager, mut recorder) = connected_manager(&http, &peer).await;

    // WHEN: disconnect runs
    manager.disconnect().await;

    // THEN: One client disconnect, then silence
    assert_eq!(
        recorder.next().await,
        ChannelEvent::Disconnect {
            reason: REASON_CLIENT_DISCONNECT.to_string()
        }
    );
    assert_eq!(manager.connection_state(), ConnectionState::Uninitialized);
    assert!(!manager.get_connection_status());
    assert_eq!(manager.get_availability(), Availability::Available);

    // AND: Handlers are gone
    manager.emit_event(ChannelEvent::Connect);
    assert!(recorder.collect_for(Duration::from_millis(50)).await.is_empty());
}

/// **VALUE**: Verifies disconnect re-arms init.
///
/// **WHY THIS MATTERS**: After a logout/login cycle the manager must probe again
/// rather than trust the old answer.
///
/// **BUG THIS CATCHES**: Would catch the init latch surviving disconnect.
#[tokio::test]
async fn given_disconnected_manager_when_init_then_probes_again() {
    // GIVEN: A manager initialized once, then disconnected
    let http = MockServer::start().await;
    mount_status(&http, false, 2).await;
    let manager = ChannelManager::new(test_config(&http, DEAD_DUPLEX_URL)).unwrap();
    manager.init().await;

    // WHEN: disconnect then init
    manager.disconnect().await;
    assert!(!manager.get_connection_status());
    manager.init().await;

    // THEN: Second probe ran (verified by the mock on drop)
    assert_eq!(manager.connection_state(), ConnectionState::Unavailable);
}

/// **VALUE**: Verifies reinitialize forgets the earlier probe result.
///
/// **WHY THIS MATTERS**: The duplex service may come up after the app started;
/// reinitialize is how callers pick it up.
///
/// **BUG THIS CATCHES**: Would catch reinitialize reusing a cached
/// "unavailable" answer.
#[tokio::test]
async fn given_service_came_up_when_reinitialize_then_connects() {
    // GIVEN: First probe says unavailable, later probes say available
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": false })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&http)
        .await;
    mount_status(&http, true, 1).await;

    let peer = DuplexPeer::start().await;
    let manager = ChannelManager::new(test_config(&http, &peer.url)).unwrap();
    manager.init().await;
    assert_eq!(manager.get_availability(), Availability::Unavailable);

    // WHEN: reinitialize runs
    manager.reinitialize().await;

    // THEN: It connects
    assert_eq!(manager.get_availability(), Availability::Available);
    wait_until(|| manager.get_connection_status()).await;
    assert_eq!(peer.connection_count(), 1);
}

/// **VALUE**: Verifies disconnect during a probe wins.
///
/// **BUG THIS CATCHES**: Would catch a slow init resurrecting a connection
/// after the caller already tore the manager down.
#[tokio::test]
async fn given_probe_in_flight_when_disconnect_then_init_abandons() {
    // GIVEN: A slow but successful probe
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "available": true }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&http)
        .await;
    let peer = DuplexPeer::start().await;
    let manager = ChannelManager::new(test_config(&http, &peer.url)).unwrap();

    // WHEN: disconnect lands while init is probing
    let initializing = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.init().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.disconnect().await;
    initializing.await.unwrap();

    // THEN: No socket was opened
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(peer.connection_count(), 0);
    assert_eq!(manager.connection_state(), ConnectionState::Uninitialized);
}
