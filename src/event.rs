//! Event-type naming and the envelope the aggregate kernel stamps.
//!
//! Domain events are closed enums owned by each aggregate; the kernel wraps
//! them in an [`EventEnvelope`] that carries the aggregate identity, the
//! version stamped at apply time, and the aggregate type tag. Everything
//! here is pure data -- no I/O occurs in this module.

use serde::{Deserialize, Serialize};

/// A named domain event.
///
/// The event name identifies the event's concrete kind (typically the enum
/// variant) and is the key the [`EventBus`](crate::EventBus) routes on and
/// the name handler manifests are tagged with. Names must be stable: they
/// outlive the process in persisted histories.
///
/// # Examples
///
/// ```
/// use eventroot::DomainEvent;
///
/// enum OrderEvent {
///     Placed,
///     Cancelled,
/// }
///
/// impl DomainEvent for OrderEvent {
///     fn event_name(&self) -> &str {
///         match self {
///             OrderEvent::Placed => "OrderPlaced",
///             OrderEvent::Cancelled => "OrderCancelled",
///         }
///     }
/// }
/// ```
pub trait DomainEvent {
    /// Stable name of this event's concrete kind.
    fn event_name(&self) -> &str;
}

/// An immutable fact about a state change to one aggregate instance.
///
/// Created by domain logic with version `0` ("not yet applied") and no
/// aggregate type; the kernel stamps both exactly once when the event is
/// applied. After stamping, the envelope is treated as immutable -- there
/// is no public mutation path.
///
/// Envelopes serialize with their stamps intact so a durable store can
/// round-trip them back into
/// [`load_from_history`](crate::AggregateRoot::load_from_history).
///
/// # Type Parameters
///
/// * `Id` - Opaque aggregate identifier type.
/// * `E` - The aggregate's domain event enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<Id, E> {
    aggregate_id: Id,
    version: u64,
    aggregate_type: Option<String>,
    payload: E,
}

impl<Id, E> EventEnvelope<Id, E> {
    /// Wrap a freshly produced domain event.
    ///
    /// The envelope starts unstamped: version `0`, no aggregate type.
    pub fn new(aggregate_id: Id, payload: E) -> Self {
        Self {
            aggregate_id,
            version: 0,
            aggregate_type: None,
            payload,
        }
    }

    /// Set the version on an envelope being reconstructed from persisted
    /// history.
    ///
    /// Live events are stamped by the kernel; this builder exists for the
    /// durable-store boundary and for tests that fabricate histories.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// The identifier of the aggregate instance this event belongs to.
    pub fn aggregate_id(&self) -> &Id {
        &self.aggregate_id
    }

    /// The event's version within its aggregate's stream. `0` means the
    /// event has not been applied yet.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The aggregate type tag, populated by the kernel at apply time.
    pub fn aggregate_type(&self) -> Option<&str> {
        self.aggregate_type.as_deref()
    }

    /// The wrapped domain event.
    pub fn payload(&self) -> &E {
        &self.payload
    }

    /// Consume the envelope, returning the wrapped domain event.
    pub fn into_payload(self) -> E {
        self.payload
    }

    pub(crate) fn stamp_aggregate_type(&mut self, aggregate_type: &'static str) {
        self.aggregate_type = Some(aggregate_type.to_owned());
    }

    pub(crate) fn stamp_version(&mut self, version: u64) {
        self.version = version;
    }
}

// The envelope routes under its payload's name.
impl<Id, E: DomainEvent> DomainEvent for EventEnvelope<Id, E> {
    fn event_name(&self) -> &str {
        self.payload.event_name()
    }
}
