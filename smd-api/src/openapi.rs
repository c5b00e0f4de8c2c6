//! OpenAPI document for the SMD2 service, generated with utoipa from the
//! route annotations and schema derives.

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{component, health};
use crate::telemetry::metrics;
use crate::types::{ComponentArray, DeleteComponentResponse, UpdateComponentRequest};
use smd_core::{ComponentSpec, ComponentStatus, Metadata, Violation};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SMD2 State Manager API",
        version = "0.1.0",
        description = "Versioned lifecycle management of HSM v2 Components",
        license(name = "MIT"),
    ),
    paths(
        component::list_components,
        component::create_components,
        component::get_component,
        component::update_component,
        component::delete_component,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        ComponentArray,
        ComponentSpec,
        ComponentStatus,
        Metadata,
        UpdateComponentRequest,
        DeleteComponentResponse,
        ApiError,
        ErrorCode,
        Violation,
        health::HealthResponse,
        health::HealthStatus,
        health::HealthDetails,
        health::ComponentHealth,
    )),
    tags(
        (name = "Components", description = "HSM v2 Component state"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
)]
pub struct ApiDoc;

/// GET /openapi.json
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
