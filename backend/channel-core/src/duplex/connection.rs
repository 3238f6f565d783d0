use crate::config::{ChannelConfig, HeartbeatPolicy, ReconnectPolicy};
use crate::duplex::frame::DuplexFrame;
use crate::duplex::{
    REASON_PING_TIMEOUT, REASON_SERVER_DISCONNECT, REASON_TRANSPORT_CLOSE, REASON_TRANSPORT_ERROR,
};
use crate::error::duplex::DuplexError;
use crate::events::ChannelEvent;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::net::TcpStream;
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep as TokioSleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

const CLOSE_WAIT: Duration = Duration::from_secs(5);

/// What the connection task reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkSignal {
    /// First successful handshake of this link.
    Connected,
    /// Handshake succeeded after the connection had been lost.
    Reconnected { attempt_number: u32 },
    Disconnected { reason: String },
    Inbound(ChannelEvent),
    /// Attempt limit reached; the task has stopped.
    ReconnectFailed,
}

pub(crate) trait LinkObserver: Send + Sync + 'static {
    fn on_signal(&self, signal: LinkSignal);
}

#[derive(Debug, Clone)]
pub(crate) struct LinkSettings {
    pub handshake_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub heartbeat: HeartbeatPolicy,
}

impl From<&ChannelConfig> for LinkSettings {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            handshake_timeout: config.handshake_timeout(),
            reconnect: config.reconnect.clone(),
            heartbeat: config.heartbeat.clone(),
        }
    }
}

/// Handle to the task driving one duplex connection.
pub(crate) struct DuplexLink {
    outbound: mpsc::UnboundedSender<DuplexFrame>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DuplexLink {
    /// Spawn the connection task. Returns immediately; progress arrives as signals.
    pub(crate) fn spawn(url: Url, settings: LinkSettings, observer: Arc<dyn LinkObserver>) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = TokioSpawn(drive(url, settings, observer, outbound_rx, shutdown_rx));

        Self {
            outbound,
            shutdown,
            task,
        }
    }

    /// Queue a frame for the live session.
    ///
    /// Hands the frame back when the task has already stopped.
    pub(crate) fn send(&self, frame: DuplexFrame) -> Result<(), DuplexFrame> {
        self.outbound.send(frame).map_err(|e| e.0)
    }

    /// Stop the task, closing the socket, and wait for it to finish.
    pub(crate) async fn close(mut self) {
        let _ = self.shutdown.send(true);

        match timeout(CLOSE_WAIT, &mut self.task).await {
            Ok(Ok(())) => debug!("Duplex task stopped"),
            Ok(Err(e)) => warn!("Duplex task ended abnormally: {e}"),
            Err(_) => {
                warn!("Duplex task did not stop within {CLOSE_WAIT:?}, aborting");
                self.task.abort();
            }
        }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also means stop
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Connection task: handshake, session, reconnect, until shutdown or exhaustion.
async fn drive(
    url: Url,
    settings: LinkSettings,
    observer: Arc<dyn LinkObserver>,
    mut outbound_rx: mpsc::UnboundedReceiver<DuplexFrame>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let max_attempts = settings.reconnect.max_attempts;
    let mut schedule = settings.reconnect.schedule();
    let mut ever_connected = false;
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            if attempt > max_attempts {
                error!("Duplex reconnection to {url} failed after {max_attempts} attempt(s)");
                observer.on_signal(LinkSignal::ReconnectFailed);
                return;
            }

            let delay = schedule.next_delay();
            info!("Duplex reconnect attempt {attempt}/{max_attempts} in {delay:?}");

            tokio::select! {
                _ = shutdown_requested(&mut shutdown_rx) => return,
                _ = TokioSleep(delay) => {}
            }
        }

        let opened = tokio::select! {
            _ = shutdown_requested(&mut shutdown_rx) => return,
            opened = open(&url, settings.handshake_timeout) => opened,
        };

        let ws = match opened {
            Ok(ws) => ws,
            Err(e) => {
                warn!("Duplex connect_error: {e}");
                attempt += 1;
                continue;
            }
        };

        if ever_connected {
            info!("Duplex reconnected to {url} after {attempt} attempt(s)");
            observer.on_signal(LinkSignal::Reconnected {
                attempt_number: attempt,
            });
        } else {
            info!("Duplex connected to {url}");
            observer.on_signal(LinkSignal::Connected);
        }
        ever_connected = true;
        attempt = 0;
        schedule.reset();

        let end = run_session(
            ws,
            &mut outbound_rx,
            &mut shutdown_rx,
            &settings.heartbeat,
            observer.as_ref(),
        )
        .await;

        match end {
            SessionEnd::Shutdown => return,
            SessionEnd::Lost(reason) => {
                info!("Duplex connection lost: {reason}");
                observer.on_signal(LinkSignal::Disconnected { reason });
                attempt = 1;
            }
        }
    }
}

async fn open(url: &Url, handshake_timeout: Duration) -> Result<WsStream, DuplexError> {
    match timeout(handshake_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws, response))) => {
            debug!("Duplex handshake with {url} answered {}", response.status());
            Ok(ws)
        }
        Ok(Err(e)) => Err(DuplexError::Handshake {
            message: format!("WebSocket handshake with {url} failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        }),
        Err(_) => Err(DuplexError::Handshake {
            message: format!("WebSocket handshake with {url} timed out after {handshake_timeout:?}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Pump one established connection until it is lost or shutdown is requested.
async fn run_session(
    ws: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<DuplexFrame>,
    shutdown_rx: &mut watch::Receiver<bool>,
    heartbeat: &HeartbeatPolicy,
    observer: &dyn LinkObserver,
) -> SessionEnd {
    let session_id = Uuid::new_v4();
    let (mut write, mut read) = ws.split();
    let mut last_seen = Instant::now();
    let mut heartbeat_tick = interval_at(Instant::now() + heartbeat.interval(), heartbeat.interval());

    debug!("Duplex session {session_id} started");

    loop {
        tokio::select! {
            _ = shutdown_requested(shutdown_rx) => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!("Duplex session {session_id}: close frame not sent: {e}");
                }
                debug!("Duplex session {session_id} closed by client");
                return SessionEnd::Shutdown;
            }
            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = send_frame(&mut write, &frame).await {
                    error!("Duplex session {session_id}: {e}");
                    return SessionEnd::Lost(REASON_TRANSPORT_ERROR.to_string());
                }
            }
            _ = heartbeat_tick.tick() => {
                if last_seen.elapsed() >= heartbeat.timeout() {
                    warn!(
                        "Duplex session {session_id}: nothing received for {:?}",
                        last_seen.elapsed()
                    );
                    return SessionEnd::Lost(REASON_PING_TIMEOUT.to_string());
                }
                if let Err(e) = write.send(Message::Ping(Vec::new().into())).await {
                    error!("Duplex session {session_id}: heartbeat failed: {e}");
                    return SessionEnd::Lost(REASON_TRANSPORT_ERROR.to_string());
                }
            }
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        handle_text(text.as_str(), observer);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Duplex session {session_id}: server closed: {frame:?}");
                        return SessionEnd::Lost(REASON_SERVER_DISCONNECT.to_string());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        last_seen = Instant::now();
                        warn!("Duplex session {session_id}: ignoring binary frame");
                    }
                    Some(Ok(_)) => {
                        last_seen = Instant::now();
                    }
                    Some(Err(e)) => {
                        warn!("Duplex session {session_id}: read failed: {e}");
                        return SessionEnd::Lost(REASON_TRANSPORT_ERROR.to_string());
                    }
                    None => return SessionEnd::Lost(REASON_TRANSPORT_CLOSE.to_string()),
                }
            }
        }
    }
}

async fn send_frame(write: &mut WsSink, frame: &DuplexFrame) -> Result<(), DuplexError> {
    let text = frame.encode()?;
    trace!("Duplex -> {text}");

    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| DuplexError::Send {
            message: format!("Failed to send '{}' frame: {e}", frame.event),
            location: ErrorLocation::from(Location::caller()),
        })
}

fn handle_text(text: &str, observer: &dyn LinkObserver) {
    trace!("Duplex <- {text}");

    match DuplexFrame::decode(text) {
        Ok(frame) => {
            let name = frame.event.clone();
            match frame.into_event() {
                Some(event) => observer.on_signal(LinkSignal::Inbound(event)),
                None => debug!("Ignoring unhandled duplex event '{name}'"),
            }
        }
        Err(e) => warn!("{e}"),
    }
}
