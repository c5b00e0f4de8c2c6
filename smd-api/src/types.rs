//! Request and response bodies of the HSM v2 Component endpoints.

use serde::{Deserialize, Serialize};
use smd_core::ComponentSpec;
use std::collections::BTreeMap;

/// Body of list responses and create requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentArray {
    #[serde(rename = "Components", default)]
    pub components: Vec<ComponentSpec>,
}

/// PUT body: spec fields at the top level plus optional metadata changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateComponentRequest {
    /// New metadata name. Empty or absent leaves the name unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Replaces the stored spec wholesale.
    #[serde(flatten)]
    pub spec: ComponentSpec,

    /// Merged into existing labels; keys not listed are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Merged into existing annotations; keys not listed are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteComponentResponse {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "ID")]
    pub id: String,
}

impl DeleteComponentResponse {
    pub fn deleted(id: impl Into<String>) -> Self {
        Self {
            message: "Component deleted successfully".to_string(),
            id: id.into(),
        }
    }
}
