//! Test helpers for channel manager integration tests.
//!
//! - A scriptable WebSocket peer standing in for the duplex service
//! - An event recorder subscribed to every event kind
//! - Config and mock builders for the HTTP side

use channel_core::{ChannelConfig, ChannelEvent, ChannelManager, EventHandler, EventKind, ReconnectPolicy};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WAIT: Duration = Duration::from_secs(5);
pub const STATUS_PATH: &str = "/api/websocket-status";
pub const INTERFACES_PATH: &str = "/api/interfaces";

/// Nothing listens here; connecting is refused immediately.
pub const DEAD_DUPLEX_URL: &str = "ws://127.0.0.1:9/socket.io";

enum PeerCommand {
    Push(Value),
    CloseConnection,
    Stall,
    Shutdown,
}

/// Scriptable duplex service.
///
/// Accepts one connection at a time, records every text frame it receives and
/// sends whatever the test pushes.
pub struct DuplexPeer {
    pub url: String,
    commands: mpsc::UnboundedSender<PeerCommand>,
    inbound: mpsc::UnboundedReceiver<Value>,
    connections: Arc<AtomicUsize>,
}

impl DuplexPeer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind duplex peer");
        let addr = listener.local_addr().expect("Peer has no local address");

        let (commands, mut command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(_) => return,
                    },
                    command = command_rx.recv() => match command {
                        Some(PeerCommand::Shutdown) | None => return,
                        Some(_) => continue,
                    },
                };

                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let (mut write, mut read) = ws.split();
                let mut stalled = false;

                loop {
                    tokio::select! {
                        command = command_rx.recv() => match command {
                            Some(PeerCommand::Push(frame)) => {
                                let _ = write.send(Message::Text(frame.to_string().into())).await;
                            }
                            Some(PeerCommand::CloseConnection) => {
                                let _ = write.send(Message::Close(None)).await;
                                break;
                            }
                            Some(PeerCommand::Stall) => stalled = true,
                            Some(PeerCommand::Shutdown) | None => {
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                        },
                        message = read.next(), if !stalled => match message {
                            Some(Ok(Message::Text(text))) => {
                                if let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) {
                                    let _ = inbound_tx.send(frame);
                                }
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        },
                    }
                }
            }
        });

        Self {
            url: format!("ws://{addr}/socket.io"),
            commands,
            inbound,
            connections,
        }
    }

    /// Next frame the client sent, as `{"event": .., "data": ..}`.
    pub async fn next_frame(&mut self) -> Value {
        timeout(WAIT, self.inbound.recv())
            .await
            .expect("Timed out waiting for a duplex frame")
            .expect("Duplex peer stopped")
    }

    pub async fn assert_no_frame(&mut self, wait: Duration) {
        if let Ok(Some(frame)) = timeout(wait, self.inbound.recv()).await {
            panic!("Unexpected duplex frame: {frame}");
        }
    }

    pub fn push(&self, event: &str, data: Value) {
        let _ = self
            .commands
            .send(PeerCommand::Push(json!({ "event": event, "data": data })));
    }

    /// Close the current connection but keep accepting new ones.
    pub fn close_connection(&self) {
        let _ = self.commands.send(PeerCommand::CloseConnection);
    }

    /// Stop reading the current connection, so pings go unanswered.
    pub fn stall(&self) {
        let _ = self.commands.send(PeerCommand::Stall);
    }

    /// Close the connection and stop listening.
    pub fn shutdown(&self) {
        let _ = self.commands.send(PeerCommand::Shutdown);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Duplex endpoint that counts connection attempts.
///
/// Every accepted TCP connection is counted and dropped before the WebSocket
/// handshake, so the client sees a failed connect. With `serve_first`, the
/// first connection completes the handshake and is then closed by the server.
pub struct HandshakeCounter {
    pub url: String,
    accepted: Arc<AtomicUsize>,
}

impl HandshakeCounter {
    pub async fn start(serve_first: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind handshake counter");
        let addr = listener.local_addr().expect("Counter has no local address");

        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if serve_first
                    && seen == 1
                    && let Ok(mut ws) = accept_async(stream).await
                {
                    let _ = ws.send(Message::Close(None)).await;
                }
            }
        });

        Self {
            url: format!("ws://{addr}/socket.io"),
            accepted,
        }
    }

    pub fn count(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Receives every event the manager dispatches.
pub struct EventRecorder {
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl EventRecorder {
    pub fn attach(manager: &ChannelManager) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        for kind in EventKind::ALL {
            let tx = tx.clone();
            manager.on(
                kind,
                EventHandler::from_fn(move |event| {
                    let _ = tx.send(event.clone());
                }),
            );
        }
        Self { events }
    }

    pub async fn next(&mut self) -> ChannelEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("Timed out waiting for an event")
            .expect("Recorder detached")
    }

    /// Skip events until one of `kind` arrives; returns it with the skipped ones.
    pub async fn wait_for(&mut self, kind: EventKind) -> (ChannelEvent, Vec<ChannelEvent>) {
        let mut skipped = Vec::new();
        loop {
            let event = self.next().await;
            if event.kind() == kind {
                return (event, skipped);
            }
            skipped.push(event);
        }
    }

    /// Events already delivered, without waiting.
    pub fn drain(&mut self) -> Vec<ChannelEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Collect whatever arrives within `window`.
    pub async fn collect_for(&mut self, window: Duration) -> Vec<ChannelEvent> {
        sleep(window).await;
        self.drain()
    }
}

/// Poll `condition` until it holds or the wait expires.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "Condition not met within {WAIT:?}");
        sleep(Duration::from_millis(10)).await;
    }
}

/// Config with short timeouts and delays, pointed at the mock HTTP server.
pub fn test_config(http: &MockServer, duplex_url: &str) -> ChannelConfig {
    ChannelConfig {
        base_url: http.uri(),
        duplex_url: Some(duplex_url.to_string()),
        probe_timeout_ms: 500,
        request_timeout_ms: 2_000,
        handshake_timeout_ms: 1_000,
        reconnect: ReconnectPolicy {
            max_attempts: 3,
            base_delay_ms: 20,
            max_delay_ms: 50,
            randomization_factor: 0.5,
        },
        ..ChannelConfig::default()
    }
}

pub async fn mount_status(http: &MockServer, available: bool, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": available })))
        .expect(expected_calls)
        .mount(http)
        .await;
}

/// Manager whose probe reports the duplex service unavailable.
pub async fn fallback_manager(http: &MockServer) -> (ChannelManager, EventRecorder) {
    mount_status(http, false, 1).await;

    let manager = ChannelManager::new(test_config(http, DEAD_DUPLEX_URL))
        .expect("Failed to build manager");
    let mut recorder = EventRecorder::attach(&manager);

    manager.init().await;
    let (_, skipped) = recorder.wait_for(EventKind::DuplexUnavailable).await;
    assert!(skipped.is_empty(), "Unexpected events before fallback: {skipped:?}");

    (manager, recorder)
}

/// Manager connected to `peer`.
pub async fn connected_manager(
    http: &MockServer,
    peer: &DuplexPeer,
) -> (ChannelManager, EventRecorder) {
    mount_status(http, true, 1).await;

    let manager =
        ChannelManager::new(test_config(http, &peer.url)).expect("Failed to build manager");
    let mut recorder = EventRecorder::attach(&manager);

    manager.init().await;
    let (event, skipped) = recorder.wait_for(EventKind::Connect).await;
    assert_eq!(event, ChannelEvent::Connect);
    assert!(skipped.is_empty(), "Unexpected events before connect: {skipped:?}");
    assert!(manager.get_connection_status());

    (manager, recorder)
}
