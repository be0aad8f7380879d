//! Tokio broadcast bus for factoid events.

use crate::models::FactoidEvent;
use tokio::sync::broadcast;

const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Fans factoid events out to any number of subscribers.
///
/// Publishing never blocks and never fails the caller: with no subscribers
/// the event is dropped, and slow subscribers see a lag count instead of
/// stalling the engine.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FactoidEvent>,
}

/// Receiver that only yields events matching a predicate.
pub struct FilteredReceiver<F> {
    receiver: broadcast::Receiver<FactoidEvent>,
    predicate: F,
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: FactoidEvent) {
        metrics::counter!("event_bus_publish_total", "event" => event.event_type())
            .increment(1);
        if self.sender.send(event).is_err() {
            tracing::trace!("factoid event dropped, no subscribers");
        }
    }

    /// Subscribes to every event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FactoidEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to events of one type, e.g. `"recalled"`.
    #[must_use]
    pub fn subscribe_event_type(
        &self,
        event_type: &'static str,
    ) -> FilteredReceiver<impl Fn(&FactoidEvent) -> bool> {
        FilteredReceiver {
            receiver: self.sender.subscribe(),
            predicate: move |event: &FactoidEvent| event.event_type() == event_type,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&FactoidEvent) -> bool,
{
    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Closed`] once every sender is gone.
    pub async fn recv(&mut self) -> Result<FactoidEvent, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.predicate)(&event) => return Ok(event),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!("event_bus_lagged_total").increment(skipped);
                },
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventMeta, FactoidId, ScopeId};

    #[tokio::test]
    async fn test_subscribe_event_type_skips_other_events() {
        let bus = EventBus::new(16);
        let mut recalled = bus.subscribe_event_type("recalled");

        bus.publish(FactoidEvent::Deleted {
            meta: EventMeta::with_timestamp("test", 1),
            factoid_id: FactoidId::new("a"),
            scope: ScopeId::new("#chan"),
        });
        bus.publish(FactoidEvent::Recalled {
            meta: EventMeta::with_timestamp("test", 2),
            factoid_id: FactoidId::new("b"),
            scope: ScopeId::new("#chan"),
        });

        let event = recalled.recv().await.expect("receive event");
        assert_eq!(event.factoid_id().as_str(), "b");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(FactoidEvent::Deleted {
            meta: EventMeta::new("test"),
            factoid_id: FactoidId::new("a"),
            scope: ScopeId::new("#chan"),
        });
    }
}
