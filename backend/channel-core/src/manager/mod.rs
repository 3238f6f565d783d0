//! The channel manager.
//!
//! Owns the availability probe, the connection lifecycle, the event table and
//! the dual-path request router. Nothing here returns an error past the
//! manager boundary: every outcome is reported as a [`ChannelEvent`] or as a
//! plain value from the status accessors.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --init()--> Probing --probe=false--> Unavailable
//!                                   --probe=true---> Connecting --> Connected
//! Connected <--> Disconnected --attempts exhausted--> ReconnectFailed
//! any state --disconnect()--> Uninitialized
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use channel_core::{ChannelConfig, ChannelEvent, ChannelManager, EventHandler, EventKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ChannelManager::new(ChannelConfig::with_base_url("http://127.0.0.1:5000"))?;
//!
//!     manager.on(
//!         EventKind::InterfacesResponse,
//!         EventHandler::from_fn(|event: &ChannelEvent| println!("{event:?}")),
//!     );
//!
//!     manager.init().await;
//!     manager.fetch_interface_list(None).await;
//!     Ok(())
//! }
//! ```

pub(crate) mod state;

pub use state::{Availability, ConnectionState};

use crate::config::ChannelConfig;
use crate::duplex::frame::{
    DYNAMIC_INTERFACE_EVENT, GET_INTERFACES_EVENT, dynamic_interface_payload,
    get_interfaces_payload,
};
use crate::duplex::{DuplexFrame, DuplexLink, LinkObserver, LinkSettings, REASON_CLIENT_DISCONNECT};
use crate::error::CoreError;
use crate::events::{ChannelEvent, EventHandler, EventKind};
use crate::transport::{HttpTransport, OutboundRequest};

use state::SharedState;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use serde_json::{Value, json};
use url::Url;

const SEND_NOT_CONNECTED_MESSAGE: &str = "Duplex channel not connected, message not sent";
const FETCH_INTERFACES_FAILED_MESSAGE: &str = "Failed to fetch interface list";
const INVOKE_DYNAMIC_FAILED_MESSAGE: &str = "Failed to call interface";

/// Handle to the channel manager.
///
/// Construct one in the application's composition root and hand clones to
/// consumers; all clones share the same connection, state and handler table.
#[derive(Clone)]
pub struct ChannelManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    transport: HttpTransport,
    duplex_url: Url,
    link_settings: LinkSettings,
    shared: Arc<SharedState>,

    /// Set by the first `init()`; cleared by `disconnect()`.
    init_latch: AtomicBool,

    /// Bumped on every teardown so an `init()` suspended in its probe can tell
    /// that it has been superseded.
    epoch: AtomicU64,

    link: Mutex<Option<DuplexLink>>,
}

impl ChannelManager {
    /// Build a manager from validated configuration.
    ///
    /// No I/O happens until [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the configuration is invalid or a URL cannot be
    /// derived from it.
    pub fn new(config: ChannelConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let transport = HttpTransport::new(&config)?;
        let duplex_url = crate::duplex::duplex_url(&config)?;

        debug!(
            "Channel manager configured: http={}, duplex={duplex_url}",
            transport.base_url()
        );

        Ok(Self {
            inner: Arc::new(ManagerInner {
                transport,
                duplex_url,
                link_settings: LinkSettings::from(&config),
                shared: Arc::new(SharedState::default()),
                init_latch: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                link: Mutex::new(None),
            }),
        })
    }

    // ============================================
    // LIFECYCLE
    // ============================================

    /// Probe the duplex service and, if available, start connecting.
    ///
    /// Runs at most once until [`disconnect`](Self::disconnect) or
    /// [`reinitialize`](Self::reinitialize); later calls return immediately,
    /// even when the earlier probe failed. Returns once the probe has finished
    /// and the connection task is started; `connect` fires when the handshake
    /// completes.
    pub async fn init(&self) {
        let inner = &self.inner;

        if inner.init_latch.swap(true, Ordering::SeqCst) {
            debug!("Channel manager already initialized, skipping");
            return;
        }

        let epoch = inner.epoch.load(Ordering::SeqCst);

        info!("Initializing channel manager");
        inner.shared.set_connection(ConnectionState::Probing);

        let available = inner.transport.probe().await;

        if inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Channel manager torn down during probe, abandoning init");
            return;
        }

        if !available {
            warn!("Duplex service unavailable, requests will use HTTP fallback");
            inner.shared.set_availability(Availability::Unavailable);
            inner.shared.set_connection(ConnectionState::Unavailable);
            inner.shared.emit(ChannelEvent::DuplexUnavailable);
            return;
        }

        info!("Duplex service available, connecting to {}", inner.duplex_url);
        inner.shared.set_availability(Availability::Available);

        let mut slot = self.lock_link();
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Channel manager torn down before connecting, abandoning init");
            return;
        }

        inner.shared.set_connection(ConnectionState::Connecting);
        let observer: Arc<dyn LinkObserver> = inner.shared.clone();
        *slot = Some(DuplexLink::spawn(
            inner.duplex_url.clone(),
            inner.link_settings.clone(),
            observer,
        ));
    }

    /// Tear everything down and run the full probe-and-connect sequence again.
    ///
    /// Also forgets the last probe result and, like `disconnect`, every
    /// registered handler.
    pub async fn reinitialize(&self) {
        info!("Reinitializing channel manager");
        self.disconnect().await;
        self.inner.shared.set_availability(Availability::Unknown);
        self.init().await;
    }

    /// Close the duplex connection, clear the handler table and the init latch.
    ///
    /// A live connection reports `disconnect` with reason `io client disconnect`
    /// before the handlers are dropped. The availability flag is kept.
    pub async fn disconnect(&self) {
        let inner = &self.inner;

        let link = {
            let mut slot = self.lock_link();
            inner.epoch.fetch_add(1, Ordering::SeqCst);
            slot.take()
        };

        if let Some(link) = link {
            link.close().await;
        }

        if inner.shared.connection() == ConnectionState::Connected {
            inner.shared.emit(ChannelEvent::Disconnect {
                reason: REASON_CLIENT_DISCONNECT.to_string(),
            });
        }

        inner.shared.set_connection(ConnectionState::Uninitialized);
        inner.shared.handlers.clear();
        inner.init_latch.store(false, Ordering::SeqCst);

        info!("Channel manager disconnected");
    }

    // ============================================
    // EVENTS
    // ============================================

    /// Register `handler` for `kind`. Registering the same handler twice makes it fire twice.
    pub fn on(&self, kind: EventKind, handler: EventHandler) {
        self.inner.shared.handlers.register(kind, handler);
    }

    /// Remove every registration of this exact handler for `kind`.
    pub fn off(&self, kind: EventKind, handler: &EventHandler) {
        self.inner.shared.handlers.remove(kind, handler);
    }

    /// Deliver `event` to its subscribers synchronously, in registration order.
    pub fn emit_event(&self, event: ChannelEvent) {
        self.inner.shared.emit(event);
    }

    // ============================================
    // REQUEST ROUTING
    // ============================================

    /// Request the interface list, optionally for one file.
    ///
    /// Over the duplex channel the answer arrives as an inbound
    /// `interfaces_response`. Over HTTP the response body is wrapped as
    /// `{"interfaces": <body>}` and emitted as `interfaces_response`; a failed
    /// call emits `error`.
    pub async fn fetch_interface_list(&self, file_id: Option<i64>) {
        if self.get_connection_status() {
            self.send_raw(GET_INTERFACES_EVENT, get_interfaces_payload(file_id));
            return;
        }

        warn!("Duplex channel not connected, fetching interface list over HTTP");

        match self.inner.transport.fetch_interfaces(file_id).await {
            Ok(interfaces) => {
                self.emit_event(ChannelEvent::InterfacesResponse(
                    json!({ "interfaces": interfaces }),
                ));
            }
            Err(e) => {
                error!("HTTP fallback for interface list failed: {e}");
                self.emit_event(ChannelEvent::error(FETCH_INTERFACES_FAILED_MESSAGE));
            }
        }
    }

    /// Call a dynamic endpoint.
    ///
    /// Over the duplex channel this sends `dynamic_interface` and the answer
    /// arrives as `dynamic_response`. Over HTTP the proxy route is called with
    /// `{"params": ...}` as the body; success emits `dynamic_response`, failure
    /// emits `error`.
    pub async fn invoke_dynamic_endpoint(&self, request: OutboundRequest) {
        if self.get_connection_status() {
            self.send_raw(DYNAMIC_INTERFACE_EVENT, dynamic_interface_payload(&request));
            return;
        }

        warn!(
            "Duplex channel not connected, calling {} {} over HTTP",
            request.method, request.path
        );

        match self.inner.transport.call_dynamic(&request).await {
            Ok(body) => self.emit_event(ChannelEvent::DynamicResponse(body)),
            Err(e) => {
                error!(
                    "HTTP fallback for {} {} failed: {e}",
                    request.method, request.path
                );
                self.emit_event(ChannelEvent::error(INVOKE_DYNAMIC_FAILED_MESSAGE));
            }
        }
    }

    /// Send an arbitrary event over the duplex channel.
    ///
    /// Never falls back to HTTP: without a live connection this emits
    /// `send_error` carrying the event name and data.
    pub fn send_raw(&self, event: &str, data: Value) {
        let frame = DuplexFrame::new(event, data);

        let undelivered = if self.get_connection_status() {
            match self.lock_link().as_ref() {
                Some(link) => link.send(frame).err(),
                None => Some(frame),
            }
        } else {
            Some(frame)
        };

        if let Some(frame) = undelivered {
            error!("{SEND_NOT_CONNECTED_MESSAGE}: '{}'", frame.event);
            self.emit_event(ChannelEvent::SendError {
                event: frame.event,
                data: frame.data,
                message: SEND_NOT_CONNECTED_MESSAGE.to_string(),
            });
        }
    }

    // ============================================
    // STATUS
    // ============================================

    /// `true` only while the duplex connection is established.
    pub fn get_connection_status(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn get_availability(&self) -> Availability {
        self.inner.shared.availability()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.shared.connection()
    }

    pub fn duplex_url(&self) -> &Url {
        &self.inner.duplex_url
    }

    fn lock_link(&self) -> MutexGuard<'_, Option<DuplexLink>> {
        self.inner.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
