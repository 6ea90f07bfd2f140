//! In-process event bus.
//!
//! Handlers are registered per event name and run fire-and-forget: every
//! handler of a triggered event gets its own task, nothing is returned to
//! the caller and a failing handler never affects the others.
//!
//! Network emission goes through a [`NetworkEmitter`] registered by the
//! network layer at start-up. The bus only holds a weak reference to it, so
//! the two can refer to each other without a reference cycle.

use crate::error::{Error, Result};
use canopy_path::{PathValue, Targets};
use canopy_protocols::Event;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

/// Event callback.
pub type Handler = Arc<dyn Fn(Arc<Event>) + Send + Sync>;

/// Identifies one registration, for [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Sends events over the tree network.
pub trait NetworkEmitter: Send + Sync {
    /// Compute the path for `targets` and send.
    fn emit(&self, event: Event, targets: Targets) -> BoxFuture<'_, Result<()>>;

    /// Send along an already computed path.
    fn emit_with_path(&self, event: Event, path: PathValue) -> BoxFuture<'_, Result<()>>;
}

/// Registry of event handlers plus the bridge to the network.
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<(HandlerId, Handler)>>>,
    next_id: AtomicU64,
    emitter: RwLock<Option<Weak<dyn NetworkEmitter>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            emitter: RwLock::new(None),
        }
    }

    /// Append a handler for `name`.
    pub fn on<F>(&self, name: &str, handler: F) -> HandlerId
    where
        F: Fn(Arc<Event>) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove one handler. Returns whether it was registered.
    pub fn off(&self, name: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(name);
        }
        removed
    }

    /// Remove every handler for `name`.
    pub fn delete(&self, name: &str) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Run every handler registered for `event.name`, each on its own task.
    ///
    /// Handlers are snapshotted first, so `on`/`off` from inside a handler
    /// only affect later triggers. Must be called from within a Tokio
    /// runtime.
    pub fn trigger(&self, event: Event) {
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(&event.name) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };
        tracing::trace!(event = %event.name, handlers = snapshot.len(), "triggering");

        let event = Arc::new(event);
        for handler in snapshot {
            spawn_handler(handler, Arc::clone(&event));
        }
    }

    /// Register the network emitter.
    pub fn set_emitter(&self, emitter: Weak<dyn NetworkEmitter>) {
        *self.emitter.write().unwrap_or_else(PoisonError::into_inner) = Some(emitter);
    }

    fn emitter(&self) -> Result<Arc<dyn NetworkEmitter>> {
        self.emitter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::Network("no network emitter registered".to_string()))
    }

    /// Send `event` to `targets` over the network.
    pub async fn emit(&self, event: Event, targets: Targets) -> Result<()> {
        let emitter = self.emitter()?;
        emitter.emit(event, targets).await
    }

    /// Send `event` along `path` over the network.
    pub async fn emit_with_path(&self, event: Event, path: PathValue) -> Result<()> {
        let emitter = self.emitter()?;
        emitter.emit_with_path(event, path).await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventBus")
            .field("events", &handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// The one place handler tasks are spawned.
fn spawn_handler(handler: Handler, event: Arc<Event>) {
    tokio::spawn(async move {
        handler(event);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn trigger_runs_every_handler() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for tag in ["first", "second"] {
            let tx = tx.clone();
            bus.on("ping", move |event| {
                let _ = tx.send((tag, event.data_str().into_owned()));
            });
        }

        bus.trigger(Event::new("ping", "hi"));

        let mut seen = Vec::new();
        for _ in 0..2 {
            seen.push(timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap());
        }
        seen.sort();
        assert_eq!(
            seen,
            vec![("first", "hi".to_string()), ("second", "hi".to_string())]
        );
    }

    #[tokio::test]
    async fn off_removes_only_that_handler() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tx2 = tx.clone();
        let keep = bus.on("ping", move |_| {
            let _ = tx.send("keep");
        });
        let drop_me = bus.on("ping", move |_| {
            let _ = tx2.send("drop");
        });

        assert!(bus.off("ping", drop_me));
        assert!(!bus.off("ping", drop_me));
        assert_eq!(bus.handler_count("ping"), 1);

        bus.trigger(Event::new("ping", ""));
        assert_eq!(timeout(Duration::from_secs(1), rx.recv()).await.unwrap(), Some("keep"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        assert!(bus.off("ping", keep));
        assert_eq!(bus.handler_count("ping"), 0);
    }

    #[tokio::test]
    async fn handler_can_unregister_itself_mid_dispatch() {
        let bus = Arc::new(EventBus::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id_slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));

        let weak_bus = Arc::downgrade(&bus);
        let slot = Arc::clone(&id_slot);
        let id = bus.on("once", move |_| {
            if let (Some(bus), Some(id)) = (weak_bus.upgrade(), *slot.lock().unwrap()) {
                bus.off("once", id);
            }
            let _ = tx.send(());
        });
        *id_slot.lock().unwrap() = Some(id);

        bus.trigger(Event::new("once", ""));
        timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(bus.handler_count("once"), 0);

        bus.trigger(Event::new("once", ""));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn panicking_handler_does_not_block_others() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.on("boom", |_| panic!("handler failure"));
        bus.on("boom", move |_| {
            let _ = tx.send(());
        });

        bus.trigger(Event::new("boom", ""));
        assert!(timeout(Duration::from_secs(1), rx.recv()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_clears_event() {
        let bus = EventBus::new();
        bus.on("x", |_| {});
        bus.on("x", |_| {});
        bus.delete("x");
        assert_eq!(bus.handler_count("x"), 0);
        // No handlers: nothing to do.
        bus.trigger(Event::new("x", ""));
    }

    #[tokio::test]
    async fn emit_without_network_fails() {
        let bus = EventBus::new();
        let err = bus.emit(Event::new("x", ""), Targets::all()).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    struct Recorder(Mutex<Vec<(String, Option<PathValue>)>>);

    impl NetworkEmitter for Recorder {
        fn emit(&self, event: Event, _targets: Targets) -> BoxFuture<'_, Result<()>> {
            self.0.lock().unwrap().push((event.name, None));
            Box::pin(async { Ok(()) })
        }

        fn emit_with_path(&self, event: Event, path: PathValue) -> BoxFuture<'_, Result<()>> {
            self.0.lock().unwrap().push((event.name, Some(path)));
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn emit_goes_through_registered_emitter() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let emitter: Arc<dyn NetworkEmitter> = recorder.clone();
        bus.set_emitter(Arc::downgrade(&emitter));

        bus.emit(Event::new("a", ""), Targets::nodes(["c"])).await.unwrap();
        bus.emit_with_path(Event::new("b", ""), PathValue::from(49)).await.unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                ("a".to_string(), None),
                ("b".to_string(), Some(PathValue::from(49))),
            ]
        );

        drop(emitter);
        drop(recorder);
        assert!(bus.emit(Event::new("c", ""), Targets::all()).await.is_err());
    }
}
