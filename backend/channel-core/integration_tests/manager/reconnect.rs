use crate::helpers::{
    DuplexPeer, EventRecorder, HandshakeCounter, INTERFACES_PATH, connected_manager,
    mount_status, test_config, wait_until,
};

use channel_core::duplex::{REASON_PING_TIMEOUT, REASON_SERVER_DISCONNECT};
use channel_core::{
    Availability, ChannelEvent, ChannelManager, ConnectionState, EventKind, HeartbeatPolicy,
};

use std::time::{Duration, Instant};

use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// URL of a port that was just released, so connecting is refused.
async fn refused_duplex_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/socket.io")
}

/// **VALUE**: Verifies a dropped connection is re-established.
///
/// **WHY THIS MATTERS**: Server restarts are routine. Callers rely on
/// `disconnect` followed by `reconnect` to refresh their view.
///
/// **BUG THIS CATCHES**: Would catch the link task exiting on the first close
/// frame, or `connect` being emitted again instead of `reconnect`.
#[tokio::test]
async fn given_connected_when_server_closes_then_reconnects() {
    // GIVEN: A connected manager
    let http = MockServer::start().await;
    let peer = DuplexPeer::start().await;
    let (manager, mut recorder) = connected_manager(&http, &peer).await;

    // WHEN: The server closes the connection but keeps listening
    peer.close_connection();

    // THEN: disconnect, then reconnect on the first retry
    assert_eq!(
        recorder.next().await,
        ChannelEvent::Disconnect {
            reason: REASON_SERVER_DISCONNECT.to_string()
        }
    );
    assert_eq!(
        recorder.next().await,
        ChannelEvent::Reconnect { attempt_number: 1 }
    );
    assert!(manager.get_connection_status());
    assert_eq!(peer.connection_count(), 2);
}

/// **VALUE**: Verifies exhaustion degrades to HTTP exactly once.
///
/// **WHY THIS MATTERS**: After the retry budget is spent the manager must stop
/// hammering the server, tell callers once, and keep serving requests over HTTP.
///
/// **BUG THIS CATCHES**: Would catch retries continuing forever, duplicate
/// `reconnect_failed` events, or requests still routed to a dead socket.
#[tokio::test]
async fn given_connected_when_server_goes_away_then_reconnect_failed_and_fallback() {
    // GIVEN: A connected manager
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INTERFACES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&http)
        .await;
    let peer = DuplexPeer::start().await;
    let (manager, mut recorder) = connected_manager(&http, &peer).await;

    // WHEN: The server closes and stops listening
    peer.shutdown();

    // THEN: disconnect, reconnect_failed, duplex_unavailable
    let (failed, skipped) = recorder.wait_for(EventKind::ReconnectFailed).await;
    assert_eq!(failed, ChannelEvent::ReconnectFailed);
    assert_eq!(
        skipped,
        vec![ChannelEvent::Disconnect {
            reason: REASON_SERVER_DISCONNECT.to_string()
        }]
    );
    assert_eq!(recorder.next().await, ChannelEvent::DuplexUnavailable);
    assert!(recorder.collect_for(Duration::from_millis(200)).await.is_empty());

    assert_eq!(manager.connection_state(), ConnectionState::ReconnectFailed);
    assert_eq!(manager.get_availability(), Availability::Unavailable);
    assert!(!manager.get_connection_status());

    // AND: Requests now use HTTP
    manager.fetch_interface_list(None).await;
    assert_eq!(
        recorder.next().await,
        ChannelEvent::InterfacesResponse(json!({ "interfaces": [] }))
    );
}

/// **VALUE**: Verifies a failed first handshake is retried, then given up.
///
/// **BUG THIS CATCHES**: Would catch init hanging in `connecting` when the
/// status route says yes but the socket cannot be opened.
#[tokio::test]
async fn given_duplex_refuses_connections_when_init_then_reconnect_failed() {
    // GIVEN: Status says available, but nothing listens on the duplex port
    let http = MockServer::start().await;
    mount_status(&http, true, 1).await;
    let manager =
        ChannelManager::new(test_config(&http, &refused_duplex_url().await)).unwrap();
    let mut recorder = EventRecorder::attach(&manager);

    // WHEN: init runs
    manager.init().await;
    assert_eq!(manager.connection_state(), ConnectionState::Connecting);

    // THEN: No connect; the retry budget runs out
    let (_, skipped) = recorder.wait_for(EventKind::ReconnectFailed).await;
    assert!(skipped.is_empty(), "Unexpected events: {skipped:?}");
    assert_eq!(recorder.next().await, ChannelEvent::DuplexUnavailable);
    assert_eq!(manager.get_availability(), Availability::Unavailable);
}

/// **VALUE**: Verifies a silent server is detected by the heartbeat.
///
/// **WHY THIS MATTERS**: A half-open TCP connection never errors on its own;
/// without the heartbeat the client would believe it is connected forever.
///
/// **BUG THIS CATCHES**: Would catch pings being sent without checking that
/// anything came back.
#[tokio::test]
async fn given_server_stops_answering_when_heartbeat_expires_then_ping_timeout() {
    // GIVEN: A fast heartbeat
    let http = MockServer::start().await;
    mount_status(&http, true, 1).await;
    let peer = DuplexPeer::start().await;
    let mut config = test_config(&http, &peer.url);
    config.heartbeat = HeartbeatPolicy {
        interval_ms: 50,
        timeout_ms: 200,
    };
    let manager = ChannelManager::new(config).unwrap();
    let mut recorder = EventRecorder::attach(&manager);
    manager.init().await;
    wait_until(|| manager.get_connection_status()).await;

    // WHEN: The server stops reading, so pongs never come back
    peer.stall();

    // THEN: The connection is declared dead
    let (event, _) = recorder.wait_for(EventKind::Disconnect).await;
    assert_eq!(
        event,
        ChannelEvent::Disconnect {
            reason: REASON_PING_TIMEOUT.to_string()
        }
    );
}

/// **VALUE**: Verifies disconnect stops a link that is still retrying.
///
/// **BUG THIS CATCHES**: Would catch the retry sleep ignoring shutdown, which
/// makes disconnect hang until the close wait expires.
#[tokio::test]
async fn given_link_retrying_when_disconnect_then_task_stops_promptly() {
    // GIVEN: A link stuck retrying a refused port with long delays
    let http = MockServer::start().await;
    mount_status(&http, true, 1).await;
    let mut config = test_config(&http, &refused_duplex_url().await);
    config.reconnect.base_delay_ms = 500;
    config.reconnect.max_delay_ms = 1_000;
    let manager = ChannelManager::new(config).unwrap();
    manager.init().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // WHEN: disconnect runs mid-retry
    let started = Instant::now();
    manager.disconnect().await;

    // THEN: It returns without waiting out the backoff
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(manager.connection_state(), ConnectionState::Uninitialized);
    assert_eq!(manager.get_availability(), Availability::Available);
}

/// **VALUE**: Verifies a failing first connect makes exactly `1 + max_attempts` tries.
///
/// **WHY THIS MATTERS**: The attempt budget bounds how long startup keeps
/// trying before switching to HTTP, and how hard a broken server is hit.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one in the attempt limit, or a
/// retry loop that keeps going after `reconnect_failed`.
#[tokio::test]
async fn given_endpoint_drops_every_connection_when_init_then_attempt_budget_respected() {
    // GIVEN: Status says available, the duplex endpoint drops every connection
    let http = MockServer::start().await;
    mount_status(&http, true, 1).await;
    let endpoint = HandshakeCounter::start(false).await;
    let config = test_config(&http, &endpoint.url);
    let max_attempts = config.reconnect.max_attempts as usize;
    let manager = ChannelManager::new(config).unwrap();
    let mut recorder = EventRecorder::attach(&manager);

    // WHEN: init runs and the link gives up
    manager.init().await;
    let (_, skipped) = recorder.wait_for(EventKind::ReconnectFailed).await;

    // THEN: The initial try plus every retry, nothing more
    assert!(skipped.is_empty(), "Unexpected events: {skipped:?}");
    assert_eq!(recorder.next().await, ChannelEvent::DuplexUnavailable);
    assert!(recorder.collect_for(Duration::from_millis(200)).await.is_empty());
    assert_eq!(endpoint.count(), 1 + max_attempts);
}

/// **VALUE**: Verifies a lost connection makes exactly `max_attempts` retries.
///
/// **BUG THIS CATCHES**: Would catch the counter not being reset after a
/// successful connect, or one attempt too many or too few before giving up.
#[tokio::test]
async fn given_connection_lost_when_endpoint_keeps_dropping_then_max_attempts_retries() {
    // GIVEN: An endpoint that serves the first connection, then drops all others
    let http = MockServer::start().await;
    mount_status(&http, true, 1).await;
    let endpoint = HandshakeCounter::start(true).await;
    let config = test_config(&http, &endpoint.url);
    let max_attempts = config.reconnect.max_attempts as usize;
    let manager = ChannelManager::new(config).unwrap();
    let mut recorder = EventRecorder::attach(&manager);

    // WHEN: init connects, the server closes, retries run out
    manager.init().await;
    assert_eq!(recorder.next().await, ChannelEvent::Connect);
    assert_eq!(
        recorder.next().await,
        ChannelEvent::Disconnect {
            reason: REASON_SERVER_DISCONNECT.to_string()
        }
    );
    assert_eq!(recorder.next().await, ChannelEvent::ReconnectFailed);
    assert_eq!(recorder.next().await, ChannelEvent::DuplexUnavailable);

    // THEN: One served connection plus exactly max_attempts retries
    assert!(recorder.collect_for(Duration::from_millis(200)).await.is_empty());
    assert_eq!(endpoint.count(), 1 + max_attempts);
}
