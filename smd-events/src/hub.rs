//! In-process broadcast fan-out.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{EventError, EventSink, LifecycleEvent, DEFAULT_STREAM_CAPACITY};

/// Broadcast sink feeding live subscribers such as the event stream endpoint.
///
/// Slow subscribers lag and miss events; the hub never waits for them.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_CAPACITY)
    }
}

#[async_trait]
impl EventSink for EventHub {
    fn name(&self) -> &str {
        "hub"
    }

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), EventError> {
        match self.tx.send(event.clone()) {
            Ok(receivers) => {
                debug!(event_type = %event.event_type, receivers, "Broadcast event");
            }
            Err(_) => {
                // no subscribers is not a failure
                debug!(event_type = %event.event_type, "No subscribers for event");
            }
        }
        Ok(())
    }
}
