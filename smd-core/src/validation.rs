//! Validation pipeline.
//!
//! Two ordered passes run before anything is persisted:
//!
//! 1. **Structural** - field-level constraints declared on the resource
//!    ([`Validate`]). All violations are collected and returned together.
//! 2. **Contextual** - business rules ([`BusinessRules`]) that see the fully
//!    populated resource plus the request context (caller, version, prior state).
//!
//! The contextual pass only runs once the structural pass is clean.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resource::Resource;
use crate::version::VersionContext;

// ============================================================================
// VIOLATIONS
// ============================================================================

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Violation {
    /// Dotted path of the offending field (e.g. `spec.description`).
    pub field: String,
    /// Constraint tag (e.g. `max=200`, `required`).
    pub constraint: String,
    pub message: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    fn prefixed(mut self, prefix: &str) -> Self {
        self.field = format!("{}.{}", prefix, self.field);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.constraint, self.message)
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("structural validation failed: {}", summarize(.0))]
    Structural(Vec<Violation>),

    #[error("business validation failed: {}", summarize(.0))]
    Contextual(Vec<Violation>),
}

impl ValidationError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationError::Structural(v) | ValidationError::Contextual(v) => v,
        }
    }
}

// ============================================================================
// STRUCTURAL PASS
// ============================================================================

/// Field-level constraints of a value.
pub trait Validate {
    /// Every violated constraint; empty when the value is valid.
    fn validate(&self) -> Vec<Violation>;
}

impl<S: Validate, St> Validate for Resource<S, St> {
    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.kind.trim().is_empty() {
            violations.push(Violation::new("kind", "required", "kind must be set"));
        }
        if self.api_version.trim().is_empty() {
            violations.push(Violation::new("apiVersion", "required", "apiVersion must be set"));
        }
        if self.metadata.uid().is_empty() {
            violations.push(Violation::new("metadata.uid", "required", "uid must be assigned"));
        }
        violations.extend(self.spec.validate().into_iter().map(|v| v.prefixed("spec")));
        violations
    }
}

// ============================================================================
// CONTEXTUAL PASS
// ============================================================================

/// Request context handed to business rules.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a, R> {
    /// Caller identity, when the request carried one.
    pub caller: Option<&'a str>,
    pub version: &'a VersionContext,
    /// Stored state before this mutation; `None` on create.
    pub prior: Option<&'a R>,
}

/// Business rules evaluated after structural validation.
pub trait BusinessRules<R>: Send + Sync {
    fn check(&self, resource: &R, ctx: &ValidationContext<'_, R>) -> Vec<Violation>;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBusinessRules;

impl<R> BusinessRules<R> for NoBusinessRules {
    fn check(&self, _resource: &R, _ctx: &ValidationContext<'_, R>) -> Vec<Violation> {
        Vec::new()
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Structural pass followed by the contextual pass.
pub struct ValidationPipeline<R> {
    rules: Arc<dyn BusinessRules<R>>,
}

impl<R> Clone for ValidationPipeline<R> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
        }
    }
}

impl<R: Validate + 'static> ValidationPipeline<R> {
    pub fn new(rules: Arc<dyn BusinessRules<R>>) -> Self {
        Self { rules }
    }

    pub fn run(&self, resource: &R, ctx: &ValidationContext<'_, R>) -> Result<(), ValidationError> {
        let structural = resource.validate();
        if !structural.is_empty() {
            return Err(ValidationError::Structural(structural));
        }

        let contextual = self.rules.check(resource, ctx);
        if !contextual.is_empty() {
            return Err(ValidationError::Contextual(contextual));
        }
        Ok(())
    }
}

impl<R: Validate + 'static> Default for ValidationPipeline<R> {
    fn default() -> Self {
        Self::new(Arc::new(NoBusinessRules))
    }
}
