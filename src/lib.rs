//! Event-sourcing primitives: aggregates that mutate only through applied
//! events, a named-event bus with pluggable dispatch, sequential event
//! publishing, and declarative handler discovery.

mod aggregate;
pub use aggregate::{Aggregate, AggregateRoot};
mod bus;
pub use bus::{DispatchStep, EventBus, EventSubscriber, SequentialDispatch};
mod error;
pub use error::{BoxError, DispatchError};
mod event;
pub use event::{DomainEvent, EventEnvelope};
mod publisher;
pub use publisher::EventPublisher;
mod registry;
pub use registry::{
    HandlerDefinition, HandlerGroup, HandlerKind, HandlerManifest, HandlerMethod, explore_handlers,
};
mod value_object;
pub use value_object::ValueObject;
