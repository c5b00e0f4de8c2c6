//! Component lifecycle manager.
//!
//! Orchestrates the collaborators for every Component operation:
//! uid generation, the validation pipeline, the store and the event emitter.
//!
//! The store has no secondary index, so every lookup by domain `ID` loads the
//! whole collection and scans it; the first record whose `spec.ID` matches
//! wins. There is no locking around load, mutate and save: two concurrent
//! updates of the same `ID` race and the last save wins.

use chrono::Utc;
use smd_core::{
    BusinessRules, Component, ComponentSpec, Metadata, UidGenerator, ValidationContext,
    ValidationPipeline, COMPONENT_KIND,
};
use smd_events::{EventEmitter, EventError};
use smd_storage::ResourceStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics::metrics;
use crate::types::UpdateComponentRequest;
use crate::versioning::RequestContext;

#[derive(Clone)]
pub struct ComponentManager {
    store: Arc<dyn ResourceStore<Component>>,
    uids: Arc<dyn UidGenerator>,
    validator: ValidationPipeline<Component>,
    events: EventEmitter,
    enforce_unique_ids: bool,
}

impl ComponentManager {
    pub fn new(
        store: Arc<dyn ResourceStore<Component>>,
        uids: Arc<dyn UidGenerator>,
        events: EventEmitter,
    ) -> Self {
        Self {
            store,
            uids,
            validator: ValidationPipeline::default(),
            events,
            enforce_unique_ids: false,
        }
    }

    /// Replace the business rules run by the contextual validation pass.
    pub fn with_rules(mut self, rules: Arc<dyn BusinessRules<Component>>) -> Self {
        self.validator = ValidationPipeline::new(rules);
        self
    }

    /// Reject creating a Component whose `ID` is already stored (409).
    pub fn enforce_unique_ids(mut self, enforce: bool) -> Self {
        self.enforce_unique_ids = enforce;
        self
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore<Component>> {
        &self.store
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Every stored spec, in the store's order.
    pub async fn list(&self) -> ApiResult<Vec<ComponentSpec>> {
        let result = self
            .store
            .load_all()
            .await
            .map(|all| all.into_iter().map(|c| c.spec).collect())
            .map_err(ApiError::from);
        observe("list", result)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Component> {
        let result = match self.find_by_id(id).await {
            Ok(Some(component)) => Ok(component),
            Ok(None) => Err(ApiError::entity_not_found(COMPONENT_KIND, id)),
            Err(e) => Err(e),
        };
        observe("get", result)
    }

    /// Create every spec in order.
    ///
    /// Items are validated and persisted one at a time. The first failure
    /// aborts the rest of the batch; items already saved stay saved.
    pub async fn create(
        &self,
        specs: Vec<ComponentSpec>,
        ctx: &RequestContext,
    ) -> ApiResult<Vec<Component>> {
        let total = specs.len();
        let mut created = Vec::with_capacity(total);
        let mut taken = if self.enforce_unique_ids {
            Some(self.stored_ids().await?)
        } else {
            None
        };

        for spec in specs {
            let result = match &taken {
                Some(ids) if ids.contains(&spec.id) => {
                    Err(ApiError::entity_already_exists(COMPONENT_KIND, &spec.id))
                }
                _ => self.create_one(spec, ctx).await,
            };
            match result {
                Ok(component) => {
                    if let Some(ids) = taken.as_mut() {
                        ids.insert(component.spec.id.clone());
                    }
                    created.push(component);
                }
                Err(e) => {
                    if !created.is_empty() {
                        warn!(
                            committed = created.len(),
                            total,
                            error = %e,
                            "Component batch aborted after partial commit"
                        );
                    }
                    return observe("create", Err(e));
                }
            }
        }
        observe("create", Ok(created))
    }

    /// Update the Component with domain `ID` == `id`.
    ///
    /// `request` is the outcome of decoding the body. It is only looked at
    /// once the Component is known to exist, so a missing Component is
    /// reported as not-found even when the body is malformed.
    pub async fn update(
        &self,
        id: &str,
        request: ApiResult<UpdateComponentRequest>,
        ctx: &RequestContext,
    ) -> ApiResult<Component> {
        let result = self.update_inner(id, request, ctx).await;
        observe("update", result)
    }

    /// Delete the Component with domain `ID` == `id`.
    ///
    /// Returns the removed record, or `None` when nothing matched. Not
    /// finding the Component is not an error.
    pub async fn delete(&self, id: &str) -> ApiResult<Option<Component>> {
        let result = self.delete_inner(id).await;
        observe("delete", result)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    async fn find_by_id(&self, id: &str) -> ApiResult<Option<Component>> {
        require_id(id)?;
        let all = self.store.load_all().await?;
        Ok(all.into_iter().find(|c| c.spec.id == id))
    }

    async fn stored_ids(&self) -> ApiResult<HashSet<String>> {
        let all = self.store.load_all().await?;
        Ok(all.into_iter().map(|c| c.spec.id).collect())
    }

    async fn create_one(
        &self,
        spec: ComponentSpec,
        ctx: &RequestContext,
    ) -> ApiResult<Component> {
        let uid = self.uids.generate(COMPONENT_KIND)?;
        let metadata = Metadata::initialize(spec.id.clone(), uid);
        let component = Component::new(COMPONENT_KIND, &ctx.version, metadata, spec);

        self.validator.run(
            &component,
            &ValidationContext {
                caller: ctx.caller.as_deref(),
                version: &ctx.version,
                prior: None,
            },
        )?;

        self.store.save(&component).await?;
        info!(
            kind = COMPONENT_KIND,
            uid = %component.uid(),
            id = %component.spec.id,
            "Component created"
        );

        self.notify(
            self.events
                .publish_created(COMPONENT_KIND, component.uid(), component.name(), &component),
            &component,
        );
        Ok(component)
    }

    async fn update_inner(
        &self,
        id: &str,
        request: ApiResult<UpdateComponentRequest>,
        ctx: &RequestContext,
    ) -> ApiResult<Component> {
        let mut component = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::entity_not_found(COMPONENT_KIND, id))?;
        let request = request?;
        let prior = component.clone();

        if let Some(name) = request.name.filter(|n| !n.is_empty()) {
            component.metadata.set_name(name);
        }
        // wholesale replace; status is left alone
        component.spec = request.spec;
        if let Some(labels) = request.labels {
            component.metadata.merge_labels(labels);
        }
        if let Some(annotations) = request.annotations {
            component.metadata.merge_annotations(annotations);
        }
        component.touch();

        self.validator.run(
            &component,
            &ValidationContext {
                caller: ctx.caller.as_deref(),
                version: &ctx.version,
                prior: Some(&prior),
            },
        )?;

        self.store.save(&component).await?;
        info!(
            kind = COMPONENT_KIND,
            uid = %component.uid(),
            id,
            "Component updated"
        );

        self.notify(
            self.events.publish_updated(
                COMPONENT_KIND,
                component.uid(),
                component.name(),
                &component,
                component.metadata.updated_at(),
            ),
            &component,
        );
        Ok(component)
    }

    async fn delete_inner(&self, id: &str) -> ApiResult<Option<Component>> {
        let Some(component) = self.find_by_id(id).await? else {
            debug!(kind = COMPONENT_KIND, id, "Delete of unknown Component ignored");
            return Ok(None);
        };

        self.store.delete_by_uid(component.uid()).await?;
        info!(
            kind = COMPONENT_KIND,
            uid = %component.uid(),
            id,
            "Component deleted"
        );

        self.notify(
            self.events
                .publish_deleted(COMPONENT_KIND, component.uid(), component.name(), Utc::now()),
            &component,
        );
        Ok(Some(component))
    }

    /// Publishing problems are logged and counted, never returned.
    fn notify(&self, result: Result<(), EventError>, component: &Component) {
        match result {
            Ok(()) => {
                if let Some(m) = metrics() {
                    m.record_event("queued");
                }
            }
            Err(e) => {
                warn!(
                    kind = COMPONENT_KIND,
                    uid = %component.uid(),
                    error = %e,
                    "Failed to publish lifecycle event"
                );
                if let Some(m) = metrics() {
                    m.record_event("dropped");
                }
            }
        }
    }
}

fn require_id(id: &str) -> ApiResult<()> {
    if id.is_empty() {
        return Err(ApiError::missing_field("id"));
    }
    Ok(())
}

fn observe<T>(operation: &str, result: ApiResult<T>) -> ApiResult<T> {
    if let Some(m) = metrics() {
        m.record_operation(operation, result.is_ok());
    }
    result
}
