//! Type-keyed publish/subscribe with non-owning subscriptions
//!
//! The bus only holds `Weak` references to handlers. A subscriber keeps its
//! `Arc` handler alive for as long as it wants to receive events; once that
//! `Arc` is dropped the handler is pruned on the next publish.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, trace};

/// Handler invoked with a borrowed event
pub type Handler<T> = dyn Fn(&T) + Send + Sync;

/// Subscription token returned by [`EventBus::subscribe_fn`]; dropping it unsubscribes
pub type Subscription<T> = Arc<Handler<T>>;

#[derive(Default)]
struct Registry {
    /// Each entry is a `Vec<Weak<Handler<T>>>` for the `TypeId` of `T`
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Registry {
    fn list_mut<T: 'static>(&mut self) -> Option<&mut Vec<Weak<Handler<T>>>> {
        self.handlers
            .get_mut(&TypeId::of::<T>())
            .and_then(|list| list.downcast_mut::<Vec<Weak<Handler<T>>>>())
    }
}

/// In-process event bus, cheap to clone and share
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventBus")
            .field("event_types", &registry.handlers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `T`
    ///
    /// Subscribing the same `Arc` twice is a no-op.
    pub fn subscribe<T: 'static>(&self, handler: &Arc<Handler<T>>) {
        let mut registry = self.registry.lock();
        let list = registry
            .handlers
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Vec::<Weak<Handler<T>>>::new()));
        let Some(list) = list.downcast_mut::<Vec<Weak<Handler<T>>>>() else {
            return;
        };

        let candidate = Arc::downgrade(handler);
        if list.iter().any(|existing| Weak::ptr_eq(existing, &candidate)) {
            trace!(event = type_name::<T>(), "Handler already subscribed");
            return;
        }
        list.push(candidate);
        debug!(event = type_name::<T>(), subscribers = list.len(), "Subscribed handler");
    }

    /// Wrap a closure, subscribe it, and hand back the owning token
    pub fn subscribe_fn<T: 'static>(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let handler: Arc<Handler<T>> = Arc::new(f);
        self.subscribe(&handler);
        handler
    }

    /// Remove `handler`; safe to call when it was never subscribed
    pub fn unsubscribe<T: 'static>(&self, handler: &Arc<Handler<T>>) {
        let mut registry = self.registry.lock();
        if let Some(list) = registry.list_mut::<T>() {
            let target = Arc::downgrade(handler);
            list.retain(|existing| !Weak::ptr_eq(existing, &target));
        }
    }

    /// Number of live handlers for `T`
    pub fn subscriber_count<T: 'static>(&self) -> usize {
        let mut registry = self.registry.lock();
        registry
            .list_mut::<T>()
            .map(|list| list.iter().filter(|h| h.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Invoke every live handler for `T` on the calling thread
    ///
    /// Handlers run outside the registry lock, so they may subscribe or publish
    /// themselves. A panicking handler is logged and skipped.
    pub fn publish<T: 'static>(&self, event: &T) {
        let live: Vec<Arc<Handler<T>>> = {
            let mut registry = self.registry.lock();
            let Some(list) = registry.list_mut::<T>() else {
                return;
            };
            list.retain(|h| h.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };

        trace!(event = type_name::<T>(), handlers = live.len(), "Publishing event");
        for handler in live {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!(
                    event = type_name::<T>(),
                    panic = panic_message(&panic),
                    "Event handler panicked"
                );
            }
        }
    }

    /// Publish from a blocking worker instead of the calling context
    ///
    /// Must be called inside a tokio runtime.
    pub fn publish_async<T: Send + 'static>(&self, event: T) -> tokio::task::JoinHandle<()> {
        let bus = self.clone();
        tokio::task::spawn_blocking(move || bus.publish(&event))
    }
}

pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
