//! Crate-level error types for the dispatch path.
//!
//! Aggregate and publisher failures surface as the caller's own error types
//! (`Aggregate::Error`, `EventPublisher::Error`) without wrapping; only the
//! bus needs a crate error, because handler callbacks are type-erased.

/// Boxed error returned by type-erased handler callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned when dispatching an event to registered handlers fails.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A handler rejected the event.
    ///
    /// Carries the event-type name the failing handler was registered
    /// under, with the handler's own error as the source.
    #[error("handler for '{event_name}' failed: {source}")]
    Handler {
        /// Event-type name the failing handler was registered under.
        event_name: String,
        /// The handler's underlying error.
        #[source]
        source: BoxError,
    },
}
