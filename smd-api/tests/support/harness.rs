//! Shared wiring for the smd-api integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use smd_api::{create_api_router, ApiConfig, AppState, ComponentManager, RequestContext};
use smd_core::{Component, KindPrefixes, PrefixedUidGenerator, UidGenerator, VersionPolicy};
use smd_events::{EventEmitter, EventHub, EventSink, TracingSink};
use smd_storage::{InMemoryStore, ResourceStore};
use smd_test_utils::mocks::RecordingSink;
use tokio::task::JoinHandle;

pub struct Harness {
    pub manager: ComponentManager,
    pub hub: EventHub,
    pub recorder: Arc<RecordingSink>,
    pub worker: JoinHandle<()>,
}

pub fn policy() -> VersionPolicy {
    VersionPolicy::default()
}

pub fn ctx() -> RequestContext {
    RequestContext::default_for(&policy()).expect("default version resolves")
}

pub fn ctx_as(caller: &str) -> RequestContext {
    RequestContext {
        caller: Some(caller.to_string()),
        ..ctx()
    }
}

pub fn uids() -> Arc<dyn UidGenerator> {
    Arc::new(PrefixedUidGenerator::new(KindPrefixes::default()))
}

/// Manager over `store`, publishing to a tracing sink, a recorder and a hub.
/// Must be called inside a tokio runtime.
pub fn harness_with(store: Arc<dyn ResourceStore<Component>>, uids: Arc<dyn UidGenerator>) -> Harness {
    let hub = EventHub::new(64);
    let recorder = Arc::new(RecordingSink::new());
    let (events, worker) = EventEmitter::builder("smd")
        .sink(Arc::new(TracingSink) as Arc<dyn EventSink>)
        .sink(recorder.clone() as Arc<dyn EventSink>)
        .sink(Arc::new(hub.clone()) as Arc<dyn EventSink>)
        .spawn();

    Harness {
        manager: ComponentManager::new(store, uids, events),
        hub,
        recorder,
        worker,
    }
}

pub fn harness() -> (Harness, InMemoryStore<Component>) {
    let store = InMemoryStore::new();
    (harness_with(Arc::new(store.clone()), uids()), store)
}

impl Harness {
    pub fn app(&self) -> Router {
        self.app_with_policy(policy())
    }

    pub fn app_with_policy(&self, policy: VersionPolicy) -> Router {
        let state = AppState::new(self.manager.clone(), policy, self.hub.clone());
        create_api_router(state, &ApiConfig::default())
    }

    /// Drop the manager and wait until every queued event was delivered.
    pub async fn drain(self) -> Arc<RecordingSink> {
        let Harness {
            manager,
            worker,
            recorder,
            ..
        } = self;
        drop(manager);
        let _ = worker.await;
        recorder
    }
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
