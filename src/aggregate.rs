//! Aggregate trait and the event-application kernel.
//!
//! An aggregate's state changes only by producing and folding domain
//! events. The [`Aggregate`] trait supplies the pure decision function
//! ([`handle`](Aggregate::handle)) and the per-variant mutation function
//! ([`apply`](Aggregate::apply)); the [`AggregateRoot`] kernel owns the
//! identity, the version counter, and the queue of not-yet-published
//! events, and enforces the stamping protocol around both.

use crate::event::{DomainEvent, EventEnvelope};
use crate::publisher::EventPublisher;

/// A domain aggregate whose state is derived from its event history.
///
/// The implementing type itself serves as the aggregate's state.
///
/// # Associated Types
///
/// - `Id`: opaque identifier for one aggregate instance.
/// - `Command`: the set of commands this aggregate can handle.
/// - `DomainEvent`: the set of events this aggregate can produce and apply.
/// - `Error`: command rejection / invariant violation error.
///
/// # Contract
///
/// - [`handle`](Aggregate::handle) must be a pure decision function: no
///   I/O, no side effects. It validates a command against the current
///   state and returns zero or more events, or rejects the command.
/// - [`apply`](Aggregate::apply) mutates the state for a single event and
///   must not suspend. A variant the aggregate does not react to returns
///   `Ok(())` unchanged; an invariant violation returns `Err`, which the
///   kernel propagates without touching the version counter.
pub trait Aggregate: Default + Send + Sync + 'static {
    /// Identifies this aggregate type (e.g. "user"). Stamped onto every
    /// applied event.
    const AGGREGATE_TYPE: &'static str;

    /// Opaque identifier for one aggregate instance.
    type Id: Clone + Send + Sync;

    /// The set of commands this aggregate can handle.
    type Command;

    /// The set of events this aggregate can produce and apply.
    type DomainEvent: DomainEvent + Send + Sync;

    /// Command rejection / invariant violation error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Validate a command against the current state and produce events.
    ///
    /// Returns `Ok(vec![])` if the command is a no-op.
    /// Returns `Err` to reject the command.
    fn handle(&self, cmd: Self::Command) -> Result<Vec<Self::DomainEvent>, Self::Error>;

    /// Apply a single event, mutating the state.
    ///
    /// Must be total over the event enum: unknown-to-this-state variants
    /// are ignored with `Ok(())` rather than treated as errors.
    fn apply(&mut self, event: &Self::DomainEvent) -> Result<(), Self::Error>;
}

/// The event-application kernel for one aggregate instance.
///
/// Owns the identity, the version counter, the folded state, and the
/// ordered queue of uncommitted events. The version and the queue are
/// mutated only by [`execute`](AggregateRoot::execute),
/// [`load_from_history`](AggregateRoot::load_from_history), and
/// [`commit`](AggregateRoot::commit) -- there is no other mutation path.
///
/// # Version semantics
///
/// The version always equals the version of the most recently applied
/// event and is updated only **after** the aggregate's
/// [`apply`](Aggregate::apply) succeeds. A failing `apply` therefore
/// leaves the version exactly as it was, so the instance remains usable
/// for a corrected retry. The update happens even when the mutation arm
/// is a no-op for the event's variant.
///
/// A failing `apply` on the live path does **not** remove the
/// already-stamped event from the uncommitted queue: the stamp was taken
/// before the mutation ran, and unstamping would renumber any later
/// event. Callers that must never publish the event of a failed mutation
/// should discard the instance (or rebuild it from history) instead of
/// committing.
pub struct AggregateRoot<A: Aggregate> {
    id: A::Id,
    version: u64,
    uncommitted: Vec<EventEnvelope<A::Id, A::DomainEvent>>,
    state: A,
}

// Manual `Debug` because `A::Id` and `A::DomainEvent` need not be `Debug`.
impl<A: Aggregate> std::fmt::Debug for AggregateRoot<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateRoot")
            .field("aggregate_type", &A::AGGREGATE_TYPE)
            .field("version", &self.version)
            .field("uncommitted", &self.uncommitted.len())
            .finish_non_exhaustive()
    }
}

impl<A: Aggregate> AggregateRoot<A> {
    /// Create a fresh instance: version `0`, empty queue, default state.
    pub fn new(id: A::Id) -> Self {
        Self {
            id,
            version: 0,
            uncommitted: Vec::new(),
            state: A::default(),
        }
    }

    /// The identifier of this aggregate instance.
    pub fn id(&self) -> &A::Id {
        &self.id
    }

    /// Current version: the version of the most recently applied event,
    /// or `0` if no event has been applied.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The folded domain state.
    pub fn state(&self) -> &A {
        &self.state
    }

    /// Read view of the events applied on the live path and not yet
    /// committed, in application order.
    pub fn uncommitted_events(&self) -> &[EventEnvelope<A::Id, A::DomainEvent>] {
        &self.uncommitted
    }

    /// Execute a command: decide, then apply every produced event on the
    /// live path.
    ///
    /// Each event is stamped with the aggregate type and the next version,
    /// appended to the uncommitted queue, and folded into the state.
    ///
    /// # Errors
    ///
    /// Returns the aggregate's error if [`handle`](Aggregate::handle)
    /// rejects the command (nothing is stamped or queued), or if
    /// [`apply`](Aggregate::apply) fails partway through the produced
    /// events (earlier events stay applied and queued; the failing event
    /// stays queued but the version does not advance past the last
    /// successful application -- see the type-level notes).
    pub fn execute(&mut self, cmd: A::Command) -> Result<(), A::Error> {
        let _span = tracing::info_span!("execute", aggregate_type = A::AGGREGATE_TYPE).entered();

        let events = self.state.handle(cmd)?;
        let count = events.len();
        for payload in events {
            let envelope = EventEnvelope::new(self.id.clone(), payload);
            self.apply_event(envelope, false)?;
        }

        if count > 0 {
            tracing::debug!(count, version = self.version, "events applied");
        }
        Ok(())
    }

    /// Rebuild state by replaying a previously persisted, ordered event
    /// history.
    ///
    /// Each event is applied in input order with its persisted version
    /// left untouched; nothing is queued for commit. The aggregate type is
    /// still stamped, keeping replayed envelopes self-describing.
    ///
    /// # Errors
    ///
    /// Returns the aggregate's error from the first failing
    /// [`apply`](Aggregate::apply); events before it stay applied, the
    /// version stays at the last successfully applied event.
    pub fn load_from_history<I>(&mut self, history: I) -> Result<(), A::Error>
    where
        I: IntoIterator<Item = EventEnvelope<A::Id, A::DomainEvent>>,
    {
        for event in history {
            self.apply_event(event, true)?;
        }
        Ok(())
    }

    /// Hand the uncommitted queue to a publisher, clearing it on success.
    ///
    /// The queue is cleared **iff** `publish_all` resolves; on failure it
    /// is left intact so a retry can re-attempt delivery of the same
    /// events.
    ///
    /// # Errors
    ///
    /// Propagates the publisher's error unmodified.
    pub async fn commit<P>(&mut self, publisher: &P) -> Result<(), P::Error>
    where
        P: EventPublisher<EventEnvelope<A::Id, A::DomainEvent>> + ?Sized,
    {
        publisher.publish_all(&self.uncommitted).await?;
        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            count = self.uncommitted.len(),
            "events committed"
        );
        self.uncommitted.clear();
        Ok(())
    }

    /// Apply one event to this instance.
    ///
    /// The single mutation point behind both the live path (`execute`) and
    /// the replay path (`load_from_history`):
    ///
    /// 1. stamp the aggregate type (always);
    /// 2. live path only: stamp `version = current + 1` and queue the
    ///    event;
    /// 3. fold the event into the state;
    /// 4. only after step 3 succeeds, adopt the event's version.
    fn apply_event(
        &mut self,
        mut event: EventEnvelope<A::Id, A::DomainEvent>,
        is_from_history: bool,
    ) -> Result<(), A::Error> {
        event.stamp_aggregate_type(A::AGGREGATE_TYPE);

        if !is_from_history {
            event.stamp_version(self.version + 1);
        }
        let applied_version = event.version();

        if is_from_history {
            self.state.apply(event.payload())?;
        } else {
            self.uncommitted.push(event);
            let payload = self
                .uncommitted
                .last()
                .expect("event was queued above")
                .payload();
            self.state.apply(payload)?;
        }

        self.version = applied_version;
        Ok(())
    }
}
