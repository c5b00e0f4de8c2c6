//! Lifecycle event model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use smd_core::{Timestamp, Uid};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Created,
    Updated,
    Deleted,
}

impl EventAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Created => "created",
            EventAction::Updated => "updated",
            EventAction::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource mutation notice, shaped after a CloudEvent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: Uuid,
    pub source: String,
    /// `{source}.{kind lowercase}.{action}`, e.g. `smd.component.created`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub action: EventAction,
    pub kind: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub uid: Uid,
    pub name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub time: Timestamp,
    /// Resource snapshot. Absent for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LifecycleEvent {
    pub fn new(
        source: &str,
        action: EventAction,
        kind: &str,
        uid: Uid,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.to_string(),
            event_type: format!("{}.{}.{}", source, kind.to_lowercase(), action),
            action,
            kind: kind.to_string(),
            uid,
            name: name.into(),
            time: Utc::now(),
            data: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_is_namespaced() {
        let event = LifecycleEvent::new(
            "smd",
            EventAction::Updated,
            "Component",
            Uid::new("com-01020304"),
            "x0c0s1b0n0",
        );
        assert_eq!(event.event_type, "smd.component.updated");
        assert_eq!(event.kind, "Component");
    }

    #[test]
    fn test_wire_shape() -> Result<(), serde_json::Error> {
        let event = LifecycleEvent::new(
            "smd",
            EventAction::Deleted,
            "Component",
            Uid::new("com-01020304"),
            "x0",
        )
        .with_metadata("deletedAt", "2026-01-01T00:00:00Z");

        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], "smd.component.deleted");
        assert_eq!(value["action"], "deleted");
        assert_eq!(value["uid"], "com-01020304");
        assert_eq!(value["metadata"], json!({"deletedAt": "2026-01-01T00:00:00Z"}));
        assert!(value.get("data").is_none());
        Ok(())
    }
}
