use crate::error::CdpResult;
use crate::protocol::RawPayload;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Callback invoked with the raw params of a matching notification.
pub type EventCallback = Arc<dyn Fn(&RawPayload) -> CdpResult<()> + Send + Sync>;

/// Identifies one registration, for [`crate::socket::CdpSocket::remove_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub struct EventHandler {
    id: HandlerId,
    name: String,
    callback: EventCallback,
}

impl EventHandler {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, params: &RawPayload) -> CdpResult<()> {
        (self.callback)(params)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Event name -> handlers, in registration order.
#[derive(Default)]
pub(crate) struct EventRegistry {
    handlers: RwLock<HashMap<String, Vec<Arc<EventHandler>>>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, name: &str, callback: EventCallback) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler = Arc::new(EventHandler {
            id,
            name: name.to_string(),
            callback,
        });

        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.entry(name.to_string()).or_default().push(handler);
        id
    }

    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let mut emptied = None;
        let mut removed = false;

        for (name, list) in handlers.iter_mut() {
            if let Some(pos) = list.iter().position(|h| h.id == id) {
                list.remove(pos);
                removed = true;
                if list.is_empty() {
                    emptied = Some(name.clone());
                }
                break;
            }
        }

        if let Some(name) = emptied {
            handlers.remove(&name);
        }
        removed
    }

    /// Snapshot of the handlers for `name`. Invoking from the snapshot keeps the
    /// lock free while callbacks run, so they may register handlers themselves.
    pub(crate) fn handlers_for(&self, name: &str) -> Vec<Arc<EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops every handler, releasing whatever their callbacks captured.
    pub(crate) fn clear(&self) -> usize {
        let handlers = std::mem::take(
            &mut *self.handlers.write().unwrap_or_else(PoisonError::into_inner),
        );
        handlers.values().map(Vec::len).sum()
    }

    pub(crate) fn handler_count(&self, name: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> EventCallback {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |params: &RawPayload| -> CdpResult<()> {
            log.lock().unwrap().push(format!("{}:{}", tag, params.get()));
            Ok(())
        })
    }

    #[test]
    fn test_handlers_keep_registration_order() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register("Foo.changed", recording(&log, "a"));
        registry.register("Foo.changed", recording(&log, "b"));
        registry.register("Foo.other", recording(&log, "x"));
        registry.register("Foo.changed", recording(&log, "c"));

        let payload = RawPayload::from_serialize(&1).unwrap();
        for handler in registry.handlers_for("Foo.changed") {
            handler.invoke(&payload).unwrap();
        }

        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "c:1"]);
        assert_eq!(registry.handler_count("Foo.other"), 1);
        assert_eq!(registry.handler_count("Foo.missing"), 0);
    }

    #[test]
    fn test_same_callback_twice_is_not_deduplicated() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let callback = recording(&log, "dup");
        registry.register("Foo.changed", Arc::clone(&callback));
        registry.register("Foo.changed", callback);
        assert_eq!(registry.handler_count("Foo.changed"), 2);
    }

    #[test]
    fn test_clear_releases_captured_state() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register("Foo.changed", recording(&log, "a"));
        registry.register("Foo.other", recording(&log, "b"));
        assert_eq!(Arc::strong_count(&log), 3);

        assert_eq!(registry.clear(), 2);
        assert_eq!(registry.handler_count("Foo.changed"), 0);
        assert_eq!(Arc::strong_count(&log), 1);
    }

    #[test]
    fn test_remove_handler() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = registry.register("Foo.changed", recording(&log, "a"));
        let second = registry.register("Foo.changed", recording(&log, "b"));
        assert_ne!(first, second);

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        let remaining = registry.handlers_for("Foo.changed");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), second);
        assert_eq!(remaining[0].name(), "Foo.changed");

        assert!(registry.remove(second));
        assert_eq!(registry.handler_count("Foo.changed"), 0);
    }
}
