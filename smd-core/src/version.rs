//! API / schema version negotiation.
//!
//! A [`VersionPolicy`] lists the schema versions the server is willing to
//! serve for one API group and resolves a caller's requested version into a
//! [`VersionContext`], which is what gets stamped into a resource envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The version in effect for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct VersionContext {
    /// `{group}/{version}`, stored as a resource's `apiVersion`.
    pub group_version: String,
    /// Bare schema version, stored as a resource's `schemaVersion`.
    pub serve_version: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("No schema versions configured for API group '{group}'")]
    NoServedVersions { group: String },

    #[error("Unsupported API version '{requested}', served versions: {}", .served.join(", "))]
    Unsupported {
        requested: String,
        served: Vec<String>,
    },
}

/// Versions served for one API group. The first served version is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    group: String,
    served: Vec<String>,
}

impl VersionPolicy {
    pub fn new(group: impl Into<String>, served: Vec<String>) -> Result<Self, VersionError> {
        let group = group.into();
        if served.is_empty() {
            return Err(VersionError::NoServedVersions { group });
        }
        Ok(Self { group, served })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn served(&self) -> &[String] {
        &self.served
    }

    pub fn default_version(&self) -> &str {
        // `new` guarantees at least one entry
        self.served.first().map(String::as_str).unwrap_or_default()
    }

    /// Resolve the requested version, falling back to the default when the
    /// caller did not ask for one.
    pub fn resolve(&self, requested: Option<&str>) -> Result<VersionContext, VersionError> {
        let version = match requested.map(str::trim).filter(|v| !v.is_empty()) {
            None => self.default_version(),
            Some(v) => self
                .served
                .iter()
                .map(String::as_str)
                .find(|served| served.eq_ignore_ascii_case(v))
                .ok_or_else(|| VersionError::Unsupported {
                    requested: v.to_string(),
                    served: self.served.clone(),
                })?,
        };

        Ok(VersionContext {
            group_version: format!("{}/{}", self.group, version),
            serve_version: version.to_string(),
        })
    }
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            group: "smd.openchami.io".to_string(),
            served: vec!["v1".to_string()],
        }
    }
}
