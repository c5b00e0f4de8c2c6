//! Generic resource envelope shared by every resource kind.

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::identity::{Timestamp, Uid};
use crate::version::VersionContext;

// ============================================================================
// METADATA
// ============================================================================

/// Resource metadata. `uid` and `createdAt` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    name: String,
    uid: Uid,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    updated_at: Timestamp,
}

impl Metadata {
    /// Initialize metadata for a freshly created resource.
    pub fn initialize(name: impl Into<String>, uid: Uid) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            uid,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Insert or overwrite labels. Keys not present in `labels` are kept.
    pub fn merge_labels<I, K, V>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in labels {
            self.set_label(k, v);
        }
    }

    /// Insert or overwrite annotations. Keys not present in `annotations` are kept.
    pub fn merge_annotations<I, K, V>(&mut self, annotations: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in annotations {
            self.set_annotation(k, v);
        }
    }

    /// Advance `updatedAt`. The new value is always strictly later than the
    /// previous one, even when the clock has not moved.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + TimeDelta::microseconds(1)
        };
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// The kind/apiVersion/metadata/spec/status wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<S, St> {
    pub api_version: String,
    pub kind: String,
    pub schema_version: String,
    pub metadata: Metadata,
    pub spec: S,
    #[serde(default)]
    pub status: St,
}

impl<S, St: Default> Resource<S, St> {
    /// Build a new envelope stamped with the request's version context.
    /// Status starts at its default.
    pub fn new(kind: impl Into<String>, version: &VersionContext, metadata: Metadata, spec: S) -> Self {
        Self {
            api_version: version.group_version.clone(),
            kind: kind.into(),
            schema_version: version.serve_version.clone(),
            metadata,
            spec,
            status: St::default(),
        }
    }
}

impl<S, St> Resource<S, St> {
    pub fn uid(&self) -> &Uid {
        self.metadata.uid()
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn touch(&mut self) {
        self.metadata.touch();
    }
}

/// Records the persistence layer can key by uid.
pub trait Identified {
    fn uid(&self) -> &Uid;
    fn kind(&self) -> &str;
}

impl<S, St> Identified for Resource<S, St> {
    fn uid(&self) -> &Uid {
        self.metadata.uid()
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_sets_equal_timestamps() {
        let meta = Metadata::initialize("x0c0s1b0n0", Uid::new("com-00000001"));
        assert_eq!(meta.created_at(), meta.updated_at());
        assert_eq!(meta.name(), "x0c0s1b0n0");
        assert!(meta.labels().is_empty());
    }

    #[test]
    fn test_touch_strictly_advances() {
        let mut meta = Metadata::initialize("n", Uid::new("com-00000001"));
        let created = meta.created_at();
        let mut previous = meta.updated_at();
        for _ in 0..100 {
            meta.touch();
            assert!(meta.updated_at() > previous);
            previous = meta.updated_at();
        }
        assert_eq!(meta.created_at(), created);
    }

    #[test]
    fn test_merge_labels_is_additive() {
        let mut meta = Metadata::initialize("n", Uid::new("com-00000001"));
        meta.set_label("a", "1");
        meta.merge_labels([("b", "2"), ("a", "3")]);
        assert_eq!(meta.labels().len(), 2);
        assert_eq!(meta.labels().get("a").map(String::as_str), Some("3"));
        assert_eq!(meta.labels().get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_metadata_wire_names() -> Result<(), serde_json::Error> {
        let mut meta = Metadata::initialize("n", Uid::new("com-00000001"));
        meta.set_annotation("note", "hi");
        let json = serde_json::to_value(&meta)?;
        assert_eq!(json["uid"], "com-00000001");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("labels").is_none());
        assert_eq!(json["annotations"]["note"], "hi");
        Ok(())
    }
}
