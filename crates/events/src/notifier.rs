//! Best-effort publisher used inside the mutation path.

use crate::bus::EventBus;
use crate::event::StockEvent;

/// Fire-and-forget wrapper around an [`EventBus`].
///
/// A flaky notification transport must never cause a correct stock mutation
/// to be reported as failed, so publish errors are logged at debug and
/// dropped here rather than propagated.
#[derive(Debug)]
pub struct Notifier<B> {
    bus: std::sync::Arc<B>,
}

impl<B> Notifier<B>
where
    B: EventBus<StockEvent>,
{
    pub fn new(bus: std::sync::Arc<B>) -> Self {
        Self { bus }
    }

    pub fn publish(&self, event: StockEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.bus.publish(event) {
            tracing::debug!(event = event_type, error = ?e, "dropped stock event");
        }
    }
}
