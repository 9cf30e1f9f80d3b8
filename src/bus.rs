//! Named-event routing: registration map, abstract dispatch step, and the
//! canonical sequential step.
//!
//! The bus maps event-type names to ordered handler lists and hands
//! `(event, handler list)` to a [`DispatchStep`] as one call. How a list
//! is driven -- sequentially, concurrently, with or without error
//! isolation -- belongs to the step, not to the bus; the bus only
//! guarantees that the list arrives in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BoxError, DispatchError};
use crate::event::DomainEvent;
use crate::registry::{HandlerDefinition, HandlerGroup, explore_handlers};

/// The per-system dispatch policy.
///
/// Receives the emitted event together with the full ordered handler list
/// in a single call, and must complete (or fail) before
/// [`EventBus::emit`] returns. An empty list is handed through as-is.
#[async_trait]
pub trait DispatchStep<E, H>: Send + Sync {
    /// Drive the handler list for one event.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] according to the step's own policy
    /// (fail-fast, collect-and-report, ...).
    async fn handle_event(&self, event: &E, handlers: &[H]) -> Result<(), DispatchError>;
}

/// A named-event router.
///
/// Handlers are registered under an event-type name; emitting an event
/// routes it to every handler registered under its name, in registration
/// order. Multiple registrations under one name are all retained -- no
/// dedup.
///
/// Registration takes `&mut self` while emission takes `&self`, so a
/// threaded runtime cannot interleave the two on a shared bus without its
/// own lock; under the crate's cooperative single-threaded model no lock
/// is needed.
///
/// # Type Parameters
///
/// * `E` - The event type emitted through this bus.
/// * `H` - The handler definition type, chosen by the composing system.
pub struct EventBus<E, H> {
    handlers: HashMap<String, Vec<H>>,
    dispatch: Box<dyn DispatchStep<E, H>>,
}

impl<E, H> EventBus<E, H>
where
    E: DomainEvent,
{
    /// Create a bus that drives handlers through `dispatch`.
    pub fn new(dispatch: impl DispatchStep<E, H> + 'static) -> Self {
        Self {
            handlers: HashMap::new(),
            dispatch: Box::new(dispatch),
        }
    }

    /// Append `handler` to the ordered list registered under
    /// `event_name`, creating the list on first use.
    pub fn register_event_handler(&mut self, event_name: impl Into<String>, handler: H) {
        let event_name = event_name.into();
        tracing::debug!(event_name = %event_name, "event handler registered");
        self.handlers.entry(event_name).or_default().push(handler);
    }

    /// Route an event to the handlers registered under its type name.
    ///
    /// The (possibly empty) handler list is handed to the dispatch step
    /// atomically, in registration order. With nothing registered this is
    /// a silent no-op, not an error.
    ///
    /// # Errors
    ///
    /// Propagates the dispatch step's [`DispatchError`].
    pub async fn emit(&self, event: &E) -> Result<(), DispatchError> {
        let event_name = event.event_name();
        let handlers = self
            .handlers
            .get(event_name)
            .map_or(&[][..], |list| list.as_slice());
        tracing::trace!(event_name = %event_name, handlers = handlers.len(), "emitting event");
        self.dispatch.handle_event(event, handlers).await
    }
}

impl<E> EventBus<E, HandlerDefinition<E>>
where
    E: DomainEvent + Send + Sync + 'static,
{
    /// Discover `instance`'s declared handlers and register each under
    /// its tagged event name.
    ///
    /// The convenience layer over [`explore_handlers`]: one discovery
    /// pass, then one registration per descriptor, preserving discovery
    /// order.
    pub fn register_group<T>(&mut self, instance: &Arc<T>)
    where
        T: HandlerGroup<Event = E>,
    {
        for definition in explore_handlers(instance) {
            self.register_event_handler(definition.event_name().to_owned(), definition);
        }
    }
}

// Manual `Debug`: the dispatch step is opaque.
impl<E, H> std::fmt::Debug for EventBus<E, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_names", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// The canonical dispatch step: await each handler in registration
/// order, failing fast on the first handler error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDispatch;

#[async_trait]
impl<E> DispatchStep<E, HandlerDefinition<E>> for SequentialDispatch
where
    E: DomainEvent + Send + Sync,
{
    async fn handle_event(
        &self,
        event: &E,
        handlers: &[HandlerDefinition<E>],
    ) -> Result<(), DispatchError> {
        for definition in handlers {
            definition
                .invoke(event)
                .await
                .map_err(|source| DispatchError::Handler {
                    event_name: definition.event_name().to_owned(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// A source of events that feeds a bus.
///
/// Implementations bridge an external feed (queue consumer, broker
/// subscription, timer) to [`EventBus::emit`]: `subscribe` installs the
/// bridge and is expected to call `emit` as events arrive.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Start consuming the external feed.
    ///
    /// # Errors
    ///
    /// Returns the subscriber's own boxed error if the feed cannot be
    /// attached.
    async fn subscribe(&self) -> Result<(), BoxError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::registry::HandlerManifest;

    struct TestEvent(&'static str);

    impl DomainEvent for TestEvent {
        fn event_name(&self) -> &str {
            self.0
        }
    }

    /// Step that records every `(event name, handler list)` hand-off.
    #[derive(Default)]
    struct CollectingStep {
        calls: Mutex<Vec<(String, Vec<&'static str>)>>,
    }

    #[async_trait]
    impl DispatchStep<TestEvent, &'static str> for CollectingStep {
        async fn handle_event(
            &self,
            event: &TestEvent,
            handlers: &[&'static str],
        ) -> Result<(), DispatchError> {
            self.calls
                .lock()
                .expect("lock should not be poisoned")
                .push((event.event_name().to_owned(), handlers.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn register_creates_list_on_first_use() {
        let mut bus: EventBus<TestEvent, &'static str> = EventBus::new(CollectingStep::default());
        bus.register_event_handler("TestEvent", "h1");

        assert_eq!(bus.handlers.len(), 1);
        assert_eq!(bus.handlers["TestEvent"], vec!["h1"]);
    }

    #[test]
    fn repeated_registration_appends_in_order() {
        let mut bus: EventBus<TestEvent, &'static str> = EventBus::new(CollectingStep::default());
        bus.register_event_handler("TestEvent", "h1");
        bus.register_event_handler("TestEvent", "h2");

        assert_eq!(bus.handlers.len(), 1, "one key, two handlers");
        assert_eq!(bus.handlers["TestEvent"], vec!["h1", "h2"]);
    }

    /// Step shared with the test through an `Arc` so hand-offs stay
    /// observable after the bus takes ownership.
    struct SharedStep(Arc<CollectingStep>);

    #[async_trait]
    impl DispatchStep<TestEvent, &'static str> for SharedStep {
        async fn handle_event(
            &self,
            event: &TestEvent,
            handlers: &[&'static str],
        ) -> Result<(), DispatchError> {
            self.0.handle_event(event, handlers).await
        }
    }

    #[tokio::test]
    async fn emit_routes_to_registered_handlers_in_order() {
        let step = Arc::new(CollectingStep::default());
        let mut bus: EventBus<TestEvent, &'static str> = EventBus::new(SharedStep(Arc::clone(&step)));
        bus.register_event_handler("TestEvent", "h1");
        bus.register_event_handler("TestEvent", "h2");
        bus.register_event_handler("OtherEvent", "h3");

        bus.emit(&TestEvent("TestEvent"))
            .await
            .expect("emit should succeed");

        let calls = step.calls.lock().expect("lock should not be poisoned");
        assert_eq!(calls.len(), 1, "one atomic hand-off per emit");
        assert_eq!(calls[0].0, "TestEvent");
        assert_eq!(calls[0].1, vec!["h1", "h2"]);
    }

    #[tokio::test]
    async fn emit_without_handlers_is_a_silent_noop() {
        let step = Arc::new(CollectingStep::default());
        let mut bus: EventBus<TestEvent, &'static str> = EventBus::new(SharedStep(Arc::clone(&step)));
        bus.register_event_handler("OtherEvent", "h1");

        bus.emit(&TestEvent("Unregistered"))
            .await
            .expect("emit with no handlers should not error");

        let calls = step.calls.lock().expect("lock should not be poisoned");
        assert_eq!(calls.len(), 1);
        assert!(
            calls[0].1.is_empty(),
            "the step still receives the empty list"
        );
    }

    // --- SequentialDispatch with discovered handlers ---

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn on_first<'a>(&'a self, event: &'a TestEvent) -> BoxFuture<'a, Result<(), BoxError>> {
            Box::pin(async move { self.record("first", event) })
        }

        fn on_second<'a>(&'a self, event: &'a TestEvent) -> BoxFuture<'a, Result<(), BoxError>> {
            Box::pin(async move { self.record("second", event) })
        }

        fn record(&self, label: &str, event: &TestEvent) -> Result<(), BoxError> {
            if self.fail_on == Some(label) {
                return Err(format!("{label} refused {}", event.event_name()).into());
            }
            self.seen
                .lock()
                .expect("lock should not be poisoned")
                .push(format!("{label}:{}", event.event_name()));
            Ok(())
        }
    }

    impl HandlerGroup for Recorder {
        type Event = TestEvent;

        fn declare(manifest: &mut HandlerManifest<Self, Self::Event>) {
            manifest
                .event_handler("on_first", "Noted", Self::on_first)
                .saga_handler("on_second", "Noted", Self::on_second);
        }
    }

    #[tokio::test]
    async fn sequential_dispatch_runs_handlers_in_registration_order() {
        let recorder = Arc::new(Recorder::default());
        let mut bus = EventBus::new(SequentialDispatch);
        bus.register_group(&recorder);

        bus.emit(&TestEvent("Noted"))
            .await
            .expect("emit should succeed");

        let seen = recorder.seen.lock().expect("lock should not be poisoned");
        assert_eq!(*seen, vec!["first:Noted", "second:Noted"]);
    }

    #[tokio::test]
    async fn sequential_dispatch_fails_fast_and_names_the_event() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail_on: Some("first"),
        });
        let mut bus = EventBus::new(SequentialDispatch);
        bus.register_group(&recorder);

        let err = bus
            .emit(&TestEvent("Noted"))
            .await
            .expect_err("failing handler should surface");
        assert!(err.to_string().contains("'Noted'"), "got: {err}");

        let seen = recorder.seen.lock().expect("lock should not be poisoned");
        assert!(
            seen.is_empty(),
            "handlers after the failure must not run: {seen:?}"
        );
    }
}
