//! Event sinks.

use async_trait::async_trait;
use tracing::debug;

use crate::{EventError, LifecycleEvent};

/// Destination of lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), EventError>;
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), EventError> {
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            kind = %event.kind,
            uid = %event.uid,
            name = %event.name,
            "Lifecycle event"
        );
        Ok(())
    }
}
