//! Typed push-event dispatcher.

use feedsync_model::{EventKind, FeedEvent};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Handler = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

/// Identifies a registered handler for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct HandlerEntry {
    id: HandlerId,
    /// `None` = wildcard, receives every event.
    filter: Option<EventKind>,
    handler: Handler,
}

/// Publish/subscribe register for push events, keyed by [`EventKind`].
///
/// For one dispatched event, kind-scoped handlers run first, then
/// wildcard handlers, each group in registration order. Every handler
/// invocation is isolated: a panicking handler is logged and the
/// remaining handlers still run.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Mutex<Vec<HandlerEntry>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a handler for one event kind.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&FeedEvent) + Send + Sync + 'static) -> HandlerId {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Registers a wildcard handler, invoked for every event.
    pub fn on_all(&self, handler: impl Fn(&FeedEvent) + Send + Sync + 'static) -> HandlerId {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, filter: Option<EventKind>, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push(HandlerEntry {
            id,
            filter,
            handler,
        });
        id
    }

    /// Removes one handler. Returns true when it was registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|entry| entry.id != id);
        handlers.len() != before
    }

    /// Removes every handler registered for `kind`.
    ///
    /// Wildcard handlers are unaffected.
    pub fn off_kind(&self, kind: EventKind) {
        self.handlers
            .lock()
            .retain(|entry| entry.filter != Some(kind));
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Delivers `event` to kind-matched handlers, then wildcards.
    pub fn dispatch(&self, event: &FeedEvent) {
        let kind = event.kind();

        let (matched, wildcards): (Vec<Handler>, Vec<Handler>) = {
            let handlers = self.handlers.lock();
            (
                handlers
                    .iter()
                    .filter(|e| e.filter == Some(kind))
                    .map(|e| Arc::clone(&e.handler))
                    .collect(),
                handlers
                    .iter()
                    .filter(|e| e.filter.is_none())
                    .map(|e| Arc::clone(&e.handler))
                    .collect(),
            )
        };

        for handler in matched.into_iter().chain(wildcards) {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let message = panic_message(&payload);
                tracing::warn!(kind = ?kind, %message, "event handler panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
