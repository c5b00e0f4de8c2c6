//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use smd_core::{Component, PrefixedUidGenerator, VersionPolicy, COMPONENT_KIND};
use smd_events::{EventEmitter, EventError, EventHub, EventSink, LifecycleEvent, TracingSink};
use smd_storage::{FileStore, InMemoryStore, ResourceStore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{ApiConfig, StoreBackend};
use crate::error::ApiResult;
use crate::lifecycle::ComponentManager;
use crate::telemetry::metrics::metrics;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub components: ComponentManager,
    pub policy: Arc<VersionPolicy>,
    /// Live lifecycle events for WebSocket subscribers.
    pub hub: EventHub,
    pub start_time: Instant,
}

crate::impl_from_ref!(ComponentManager, components);
crate::impl_from_ref!(Arc<VersionPolicy>, policy);
crate::impl_from_ref!(EventHub, hub);
crate::impl_from_ref!(Instant, start_time);

impl AppState {
    pub fn new(components: ComponentManager, policy: VersionPolicy, hub: EventHub) -> Self {
        Self {
            components,
            policy: Arc::new(policy),
            hub,
            start_time: Instant::now(),
        }
    }

    /// Wire the service together from configuration.
    ///
    /// Returns the state and the event worker handle. The worker exits once
    /// every clone of the state has been dropped.
    pub async fn from_config(config: &ApiConfig) -> ApiResult<(Self, JoinHandle<()>)> {
        let policy = config.version_policy()?;
        let uids = PrefixedUidGenerator::new(config.kind_prefixes()?);

        let store: Arc<dyn ResourceStore<Component>> = match config.store_backend()? {
            StoreBackend::Memory => Arc::new(InMemoryStore::<Component>::new()),
            StoreBackend::File => {
                let store = FileStore::<Component>::open(&config.data_dir, COMPONENT_KIND).await?;
                info!(dir = %store.dir().display(), "Using file store");
                Arc::new(store)
            }
        };

        // uids issued by an earlier run must never be handed out again
        let existing = store.load_all().await?;
        uids.reserve(existing.iter().map(|c| c.uid()));
        info!(count = existing.len(), "Loaded stored Components");

        let hub = EventHub::new(config.event_stream_capacity);
        let (events, worker) = EventEmitter::builder(config.event_source.clone())
            .capacity(config.event_queue_capacity)
            .sink(Arc::new(TracingSink) as Arc<dyn EventSink>)
            .sink(Arc::new(hub.clone()) as Arc<dyn EventSink>)
            .on_delivery_failure(Arc::new(
                |event: &LifecycleEvent, sink: &str, error: &EventError| {
                    warn!(event_id = %event.id, sink, error = %error, "Lifecycle event not delivered");
                    if let Some(m) = metrics() {
                        m.record_event("failed");
                    }
                },
            ))
            .spawn();

        let components = ComponentManager::new(store, Arc::new(uids), events)
            .enforce_unique_ids(config.enforce_unique_ids);

        Ok((Self::new(components, policy, hub), worker))
    }
}
