//! Bounded fire-and-forget emitter.

use serde::Serialize;
use smd_core::{Timestamp, Uid};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{EventAction, EventError, EventSink, LifecycleEvent, DEFAULT_QUEUE_CAPACITY};

/// Called by the worker for every failed sink delivery.
pub type DeliveryFailureHook = Arc<dyn Fn(&LifecycleEvent, &str, &EventError) + Send + Sync>;

/// Handle used by request handlers to queue lifecycle events.
///
/// Cloning is cheap; every clone feeds the same worker.
#[derive(Clone)]
pub struct EventEmitter {
    source: Arc<str>,
    tx: mpsc::Sender<LifecycleEvent>,
}

impl EventEmitter {
    pub fn builder(source: impl Into<String>) -> EventEmitterBuilder {
        EventEmitterBuilder {
            source: source.into(),
            capacity: DEFAULT_QUEUE_CAPACITY,
            sinks: Vec::new(),
            on_failure: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Queue a created event carrying the full resource.
    pub fn publish_created<R: Serialize>(
        &self,
        kind: &str,
        uid: &Uid,
        name: &str,
        resource: &R,
    ) -> Result<(), EventError> {
        let event = self
            .event(EventAction::Created, kind, uid, name)
            .with_data(encode(resource)?);
        self.enqueue(event)
    }

    /// Queue an updated event carrying the resource and its new `updatedAt`.
    pub fn publish_updated<R: Serialize>(
        &self,
        kind: &str,
        uid: &Uid,
        name: &str,
        resource: &R,
        updated_at: Timestamp,
    ) -> Result<(), EventError> {
        let event = self
            .event(EventAction::Updated, kind, uid, name)
            .with_data(encode(resource)?)
            .with_metadata("updatedAt", updated_at.to_rfc3339());
        self.enqueue(event)
    }

    /// Queue a deleted event. No resource snapshot is attached.
    pub fn publish_deleted(
        &self,
        kind: &str,
        uid: &Uid,
        name: &str,
        deleted_at: Timestamp,
    ) -> Result<(), EventError> {
        let event = self
            .event(EventAction::Deleted, kind, uid, name)
            .with_metadata("deletedAt", deleted_at.to_rfc3339());
        self.enqueue(event)
    }

    fn event(&self, action: EventAction, kind: &str, uid: &Uid, name: &str) -> LifecycleEvent {
        LifecycleEvent::new(&self.source, action, kind, uid.clone(), name)
    }

    fn enqueue(&self, event: LifecycleEvent) -> Result<(), EventError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => EventError::QueueFull {
                event_type: event.event_type,
            },
            mpsc::error::TrySendError::Closed(_) => EventError::Closed,
        })
    }
}

fn encode<R: Serialize>(resource: &R) -> Result<serde_json::Value, EventError> {
    serde_json::to_value(resource).map_err(|e| EventError::Encode {
        reason: e.to_string(),
    })
}

pub struct EventEmitterBuilder {
    source: String,
    capacity: usize,
    sinks: Vec<Arc<dyn EventSink>>,
    on_failure: Option<DeliveryFailureHook>,
}

impl EventEmitterBuilder {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn on_delivery_failure(mut self, hook: DeliveryFailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    /// Start the worker on the current tokio runtime.
    ///
    /// The worker exits once every [`EventEmitter`] clone has been dropped and
    /// the queue is drained; await the returned handle to flush on shutdown.
    pub fn spawn(self) -> (EventEmitter, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let worker = tokio::spawn(run_worker(rx, self.sinks, self.on_failure));
        let emitter = EventEmitter {
            source: Arc::from(self.source),
            tx,
        };
        (emitter, worker)
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<LifecycleEvent>,
    sinks: Vec<Arc<dyn EventSink>>,
    on_failure: Option<DeliveryFailureHook>,
) {
    debug!(sinks = sinks.len(), "Event worker started");
    while let Some(event) = rx.recv().await {
        for sink in &sinks {
            if let Err(e) = sink.publish(&event).await {
                warn!(
                    sink = sink.name(),
                    event_type = %event.event_type,
                    uid = %event.uid,
                    error = %e,
                    "Failed to deliver lifecycle event"
                );
                if let Some(hook) = &on_failure {
                    hook(&event, sink.name(), &e);
                }
            }
        }
    }
    debug!("Event worker stopped");
}
