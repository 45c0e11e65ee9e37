//! Event-listener plumbing for scheduler observability.
//!
//! Higher crates define their own event enums (task admitted, retrying,
//! finished, cache hit, ...) and emit them through [`EventListeners`].
//! Listeners are registered via builder hooks and must never be able to
//! take the scheduler down: panics are caught per listener.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by the scheduler and its collaborators.
pub trait SchedulerEvent: Send + Sync + fmt::Debug {
    /// Short machine-readable kind, e.g. `"task_finished"`.
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// Name of the task (or component) the event concerns.
    fn task_name(&self) -> &str;
}

/// Trait for listening to scheduler events.
pub trait EventListener<E: SchedulerEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: SchedulerEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: SchedulerEvent> EventListeners<E> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// A panicking listener is isolated: the panic is caught and the
    /// remaining listeners still run.
    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    listener_index = index,
                    task = event.task_name(),
                    event_type = event.event_type(),
                    "scheduler event listener panicked"
                );

                #[cfg(not(feature = "tracing"))]
                let _ = index;
            }
        }
    }

    /// Returns `true` if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: SchedulerEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: SchedulerEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
