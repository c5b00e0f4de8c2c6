//! SMD2 Test Utilities
//!
//! Shared test infrastructure for the SMD2 workspace:
//! - Proptest generators for Component specs and metadata
//! - Fault-injecting collaborators (uid generator, stores, event sinks)
//! - Fixtures for common scenarios

pub use smd_core::{Component, ComponentSpec, Nid, Uid};

// ============================================================================
// MOCK COLLABORATORS
// ============================================================================

pub mod mocks {
    use async_trait::async_trait;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use smd_core::{IdError, Identified, Uid, UidGenerator};
    use smd_events::{EventError, EventSink, LifecycleEvent};
    use smd_storage::{InMemoryStore, ResourceStore, StorageError, StorageResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Barrier;

    /// Uid generator whose entropy source is always broken.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingUidGenerator;

    impl UidGenerator for FailingUidGenerator {
        fn generate(&self, _kind: &str) -> Result<Uid, IdError> {
            Err(IdError::Entropy {
                reason: "entropy source unavailable".to_string(),
            })
        }
    }

    /// In-memory store that accepts `successes` saves, then fails every
    /// further save.
    pub struct FailAfterStore<R> {
        inner: InMemoryStore<R>,
        successes: usize,
        saves: AtomicUsize,
    }

    impl<R> FailAfterStore<R> {
        pub fn new(inner: InMemoryStore<R>, successes: usize) -> Self {
            Self {
                inner,
                successes,
                saves: AtomicUsize::new(0),
            }
        }

        /// Save attempts seen so far, failed ones included.
        pub fn save_attempts(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<R> ResourceStore<R> for FailAfterStore<R>
    where
        R: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        async fn load_all(&self) -> StorageResult<Vec<R>> {
            self.inner.load_all().await
        }

        async fn save(&self, record: &R) -> StorageResult<()> {
            let attempt = self.saves.fetch_add(1, Ordering::SeqCst);
            if attempt >= self.successes {
                return Err(StorageError::Unavailable {
                    reason: format!("injected failure on save #{}", attempt + 1),
                });
            }
            self.inner.save(record).await
        }

        async fn delete_by_uid(&self, uid: &Uid) -> StorageResult<()> {
            self.inner.delete_by_uid(uid).await
        }
    }

    /// Store whose first `parties` loads wait for each other before
    /// returning, so concurrent operations all observe the same snapshot.
    pub struct BarrierStore<R> {
        inner: InMemoryStore<R>,
        parties: usize,
        loads: AtomicUsize,
        barrier: Barrier,
    }

    impl<R> BarrierStore<R> {
        pub fn new(inner: InMemoryStore<R>, parties: usize) -> Self {
            Self {
                inner,
                parties,
                loads: AtomicUsize::new(0),
                barrier: Barrier::new(parties),
            }
        }
    }

    #[async_trait]
    impl<R> ResourceStore<R> for BarrierStore<R>
    where
        R: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        async fn load_all(&self) -> StorageResult<Vec<R>> {
            let snapshot = self.inner.load_all().await?;
            if self.loads.fetch_add(1, Ordering::SeqCst) < self.parties {
                self.barrier.wait().await;
            }
            Ok(snapshot)
        }

        async fn save(&self, record: &R) -> StorageResult<()> {
            self.inner.save(record).await
        }

        async fn delete_by_uid(&self, uid: &Uid) -> StorageResult<()> {
            self.inner.delete_by_uid(uid).await
        }
    }

    /// Store that is never reachable.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UnavailableStore;

    #[async_trait]
    impl<R> ResourceStore<R> for UnavailableStore
    where
        R: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        async fn load_all(&self) -> StorageResult<Vec<R>> {
            Err(unavailable())
        }

        async fn save(&self, _record: &R) -> StorageResult<()> {
            Err(unavailable())
        }

        async fn delete_by_uid(&self, _uid: &Uid) -> StorageResult<()> {
            Err(unavailable())
        }
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable {
            reason: "store offline".to_string(),
        }
    }

    /// Sink that rejects every event.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn publish(&self, _event: &LifecycleEvent) -> Result<(), EventError> {
            Err(EventError::Sink {
                sink: "failing".to_string(),
                reason: "downstream rejected the event".to_string(),
            })
        }
    }

    /// Sink that keeps every delivered event, in delivery order.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<LifecycleEvent> {
            match self.events.lock() {
                Ok(events) => events.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            }
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn publish(&self, event: &LifecycleEvent) -> Result<(), EventError> {
            match self.events.lock() {
                Ok(mut events) => events.push(event.clone()),
                Err(poisoned) => poisoned.into_inner().push(event.clone()),
            }
            Ok(())
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use proptest::collection::btree_map;
    use proptest::option;
    use proptest::prelude::*;
    use smd_core::{ComponentSpec, Nid};
    use std::collections::BTreeMap;

    /// Node xnames such as `x3000c0s17b0n1`.
    pub fn arb_xname() -> impl Strategy<Value = String> {
        "x[0-9]{1,4}c[0-7]s[0-9]{1,2}b[0-1]n[0-7]"
    }

    pub fn arb_nid() -> impl Strategy<Value = Nid> {
        (0i64..1_000_000).prop_map(Nid::from)
    }

    pub fn arb_component_type() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Node".to_string()),
            Just("NodeBMC".to_string()),
            Just("Chassis".to_string()),
            Just("Processor".to_string()),
        ]
    }

    pub fn arb_state() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("On".to_string()),
            Just("Off".to_string()),
            Just("Ready".to_string()),
            Just("Standby".to_string()),
            Just(String::new()),
        ]
    }

    /// Description within the 200 character limit.
    pub fn arb_description() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{0,200}"
    }

    /// Specs that pass validation.
    pub fn arb_component_spec() -> impl Strategy<Value = ComponentSpec> {
        (
            arb_xname(),
            arb_component_type(),
            arb_state(),
            arb_description(),
            option::of(arb_nid()),
            option::of(any::<bool>()),
            "[A-Za-z]{0,10}",
        )
            .prop_map(|(id, component_type, state, description, nid, enabled, role)| {
                ComponentSpec {
                    description,
                    id,
                    component_type,
                    state,
                    enabled,
                    role,
                    nid,
                    ..Default::default()
                }
            })
    }

    pub fn arb_labels() -> impl Strategy<Value = BTreeMap<String, String>> {
        btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..5)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use smd_core::{ComponentSpec, Nid, DESCRIPTION_MAX_CHARS};

    /// A compute node spec.
    pub fn node_spec(id: &str) -> ComponentSpec {
        ComponentSpec {
            id: id.to_string(),
            component_type: "Node".to_string(),
            state: "Ready".to_string(),
            enabled: Some(true),
            role: "Compute".to_string(),
            nid: Some(Nid::from(1)),
            ..Default::default()
        }
    }

    /// A spec whose description is `chars` characters long.
    pub fn spec_with_description(id: &str, chars: usize) -> ComponentSpec {
        ComponentSpec {
            description: "d".repeat(chars),
            ..node_spec(id)
        }
    }

    /// A spec one character over the description limit.
    pub fn invalid_spec(id: &str) -> ComponentSpec {
        spec_with_description(id, DESCRIPTION_MAX_CHARS + 1)
    }
}
