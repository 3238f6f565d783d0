//! Subscriber table and isolated dispatch.

use crate::events::{ChannelEvent, EventKind};

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, trace};

/// Error a subscriber may return; logged at the dispatch boundary and dropped.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type HandlerFn = dyn Fn(&ChannelEvent) -> Result<(), HandlerError> + Send + Sync;

/// A subscriber callback.
///
/// Equality is by reference: two `EventHandler`s are equal only when one is a
/// clone of the other. Keep a clone around to unsubscribe later.
#[derive(Clone)]
pub struct EventHandler(Arc<HandlerFn>);

impl EventHandler {
    /// Wrap a fallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ChannelEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Wrap a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        Self::new(move |event| {
            callback(event);
            Ok(())
        })
    }

    fn call(&self, event: &ChannelEvent) -> Result<(), HandlerError> {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for EventHandler {}

impl Debug for EventHandler {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "EventHandler({:p})", Arc::as_ptr(&self.0))
    }
}

/// Ordered handler lists keyed by event kind.
///
/// Registration does not deduplicate: registering the same handler twice makes
/// it fire twice per dispatch.
#[derive(Default)]
pub struct HandlerTable {
    handlers: Mutex<HashMap<EventKind, Vec<EventHandler>>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: EventKind, handler: EventHandler) {
        self.lock().entry(kind).or_default().push(handler);
    }

    /// Remove every registration of `handler` under `kind`.
    pub fn remove(&self, kind: EventKind, handler: &EventHandler) {
        let mut handlers = self.lock();
        if let Some(list) = handlers.get_mut(&kind) {
            list.retain(|registered| registered != handler);
            if list.is_empty() {
                handlers.remove(&kind);
            }
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Invoke every handler registered for the event's kind, in registration order.
    ///
    /// The list is snapshotted first so handlers may subscribe or unsubscribe
    /// while being dispatched. A handler that errors or panics is logged and the
    /// remaining handlers still run. Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &ChannelEvent) -> usize {
        let kind = event.kind();
        let snapshot = self.lock().get(&kind).cloned().unwrap_or_default();

        trace!("Dispatching '{kind}' to {} handler(s)", snapshot.len());

        for handler in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler.call(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Handler for event '{kind}' failed: {e}"),
                Err(panic) => error!(
                    "Handler for event '{kind}' panicked: {}",
                    panic_message(panic.as_ref())
                ),
            }
        }

        snapshot.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EventKind, Vec<EventHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
