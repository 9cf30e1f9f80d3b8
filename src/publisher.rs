//! Sequential, ordered event delivery to an external sink.

use async_trait::async_trait;

/// Delivers events to an external sink, one at a time, in submission order.
///
/// Implementors define [`publish`](EventPublisher::publish); the provided
/// [`publish_all`](EventPublisher::publish_all) supplies the ordering
/// guarantee the aggregate kernel's `commit` relies on.
///
/// # Contract
///
/// - `publish` may fail, but must not silently drop: a delivery failure
///   must surface as `Err` so `publish_all` can halt.
/// - `publish_all` awaits each event's delivery to completion before the
///   next delivery is even attempted, regardless of per-event latency. A
///   sink that could deliver concurrently must still be driven
///   sequentially here.
/// - On the first failure, `publish_all` stops: later events are not
///   attempted, and the error propagates to the caller, which owns
///   recovery (the kernel keeps the uncommitted queue intact for retry).
#[async_trait]
pub trait EventPublisher<E: Send + Sync>: Send + Sync {
    /// Delivery failure type, chosen by the concrete sink.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Deliver a single event to the sink.
    async fn publish(&self, event: &E) -> Result<(), Self::Error>;

    /// Deliver each event strictly sequentially, failing fast.
    async fn publish_all(&self, events: &[E]) -> Result<(), Self::Error> {
        for event in events {
            self.publish(event).await?;
        }
        if !events.is_empty() {
            tracing::debug!(count = events.len(), "event batch published");
        }
        Ok(())
    }
}
