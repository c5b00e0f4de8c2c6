//! Identity types for SMD2 resources
//!
//! Every resource carries a system-generated `uid` of the form
//! `{prefix}-{8 hex digits}`, where the prefix is looked up from an injected
//! [`KindPrefixes`] table (e.g. `Component` → `com`).

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Number of random bytes encoded into a uid suffix.
const UID_RANDOM_BYTES: usize = 4;

/// Attempts made before giving up on finding an unused uid.
const MAX_GENERATE_ATTEMPTS: u32 = 16;

// ============================================================================
// UID
// ============================================================================

/// System-generated, immutable resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String, example = "com-1a2b3c4d"))]
pub struct Uid(String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The kind prefix portion of the uid (text before the first `-`).
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once('-').map(|(prefix, _)| prefix)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Uid generation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("No uid prefix registered for resource kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("Entropy source failed: {reason}")]
    Entropy { reason: String },

    #[error("No unused uid found for kind '{kind}' after {attempts} attempts")]
    Exhausted { kind: String, attempts: u32 },

    #[error("Invalid kind prefix entry '{entry}', expected Kind=prefix")]
    InvalidPrefixEntry { entry: String },
}

// ============================================================================
// KIND PREFIX TABLE
// ============================================================================

/// Mapping from resource kind to uid prefix.
///
/// Built once from configuration and handed to a generator at construction;
/// there is no process-wide registration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindPrefixes(BTreeMap<String, String>);

impl KindPrefixes {
    /// An empty table. Every kind must be registered before use.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style registration.
    pub fn with(mut self, kind: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.register(kind, prefix);
        self
    }

    pub fn register(&mut self, kind: impl Into<String>, prefix: impl Into<String>) {
        self.0.insert(kind.into(), prefix.into());
    }

    pub fn prefix_for(&self, kind: &str) -> Option<&str> {
        self.0.get(kind).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a comma-separated `Kind=prefix` list (e.g. `Component=com,Node=nod`).
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let mut table = Self::empty();
        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (kind, prefix) = entry
                .split_once('=')
                .map(|(k, p)| (k.trim(), p.trim()))
                .filter(|(k, p)| !k.is_empty() && !p.is_empty() && !p.contains('-'))
                .ok_or_else(|| IdError::InvalidPrefixEntry {
                    entry: entry.to_string(),
                })?;
            table.register(kind, prefix);
        }
        Ok(table)
    }
}

impl Default for KindPrefixes {
    fn default() -> Self {
        Self::empty().with(crate::component::COMPONENT_KIND, "com")
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Issues unique identifiers for new resource instances.
pub trait UidGenerator: Send + Sync {
    fn generate(&self, kind: &str) -> Result<Uid, IdError>;
}

/// Default generator: `{prefix}-{random hex}` drawn from the OS entropy source.
///
/// Every issued uid is remembered for the lifetime of the generator, so a uid
/// is never handed out twice even if the random suffix collides.
pub struct PrefixedUidGenerator {
    prefixes: KindPrefixes,
    issued: Mutex<HashSet<Uid>>,
}

impl PrefixedUidGenerator {
    pub fn new(prefixes: KindPrefixes) -> Self {
        Self {
            prefixes,
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Mark uids as taken, e.g. the ones already present in a durable store.
    pub fn reserve<'a>(&self, uids: impl IntoIterator<Item = &'a Uid>) {
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        issued.extend(uids.into_iter().cloned());
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn prefixes(&self) -> &KindPrefixes {
        &self.prefixes
    }
}

impl UidGenerator for PrefixedUidGenerator {
    fn generate(&self, kind: &str) -> Result<Uid, IdError> {
        let prefix = self
            .prefixes
            .prefix_for(kind)
            .ok_or_else(|| IdError::UnknownKind {
                kind: kind.to_string(),
            })?;

        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let mut bytes = [0u8; UID_RANDOM_BYTES];
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| IdError::Entropy {
                    reason: e.to_string(),
                })?;

            let suffix: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            let uid = Uid::new(format!("{}-{}", prefix, suffix));

            let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
            if issued.insert(uid.clone()) {
                return Ok(uid);
            }
        }

        Err(IdError::Exhausted {
            kind: kind.to_string(),
            attempts: MAX_GENERATE_ATTEMPTS,
        })
    }
}
