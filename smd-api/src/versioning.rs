//! Version negotiation and request context.
//!
//! `version_middleware` resolves the API version a caller asked for before the
//! handler runs, rejects unsupported versions with 400, stores the resolved
//! [`RequestContext`] in the request extensions and echoes the served
//! version back in the `X-API-Version` response header.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use smd_core::{VersionContext, VersionPolicy};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

pub const API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-api-version");
pub const CALLER_ID_HEADER: HeaderName = HeaderName::from_static("x-caller-id");

/// Per-request context handed to the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub version: VersionContext,
    /// Caller identity from `X-Caller-ID`. Not authenticated.
    pub caller: Option<String>,
}

impl RequestContext {
    /// Context for the policy's default version and no caller.
    pub fn default_for(policy: &VersionPolicy) -> ApiResult<Self> {
        Ok(Self {
            version: policy.resolve(None)?,
            caller: None,
        })
    }
}

/// Version requested by the caller: `X-API-Version`, then a `version=`
/// parameter of the `Accept` header.
pub fn requested_version(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers
        .get(&API_VERSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(v.to_string());
    }

    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(','))
        .flat_map(|media| media.split(';').skip(1))
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("version"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(&CALLER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn version_middleware(
    State(policy): State<Arc<VersionPolicy>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let requested = requested_version(request.headers());
    let version = policy.resolve(requested.as_deref())?;
    let served = version.serve_version.clone();

    let context = RequestContext {
        version,
        caller: caller_id(request.headers()),
    };
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&served) {
        response.headers_mut().insert(API_VERSION_HEADER, value);
    }
    Ok(response)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| {
                ApiError::internal_error(
                    "RequestContext not found in request extensions. \
                     Ensure version_middleware is applied to this route.",
                )
            })
    }
}
