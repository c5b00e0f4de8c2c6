//! SMD2 Core - resource model and domain rules
//!
//! Data types and pure rules shared by every other crate: the generic resource
//! envelope, the Component resource, uid generation, the validation pipeline
//! and version negotiation. This crate does no I/O.

pub mod component;
pub mod identity;
pub mod resource;
pub mod validation;
pub mod version;

pub use component::{
    Component, ComponentSpec, ComponentStatus, Nid, NidError, COMPONENT_KIND, DESCRIPTION_MAX_CHARS,
};
pub use identity::{IdError, KindPrefixes, PrefixedUidGenerator, Timestamp, Uid, UidGenerator};
pub use resource::{Identified, Metadata, Resource};
pub use validation::{
    BusinessRules, NoBusinessRules, Validate, ValidationContext, ValidationError, ValidationPipeline,
    Violation,
};
pub use version::{VersionContext, VersionError, VersionPolicy};
