//! HSM v2 Component REST routes.
//!
//! Mounted under `/hsm/v2`. Every handler runs behind the version
//! middleware, so an unsupported `X-API-Version` is rejected before any of
//! them executes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use smd_core::ComponentSpec;

use crate::error::{ApiError, ApiResult};
use crate::lifecycle::ComponentManager;
use crate::state::AppState;
use crate::types::{ComponentArray, DeleteComponentResponse, UpdateComponentRequest};
use crate::versioning::RequestContext;

/// GET /hsm/v2/State/Components
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/hsm/v2/State/Components",
    tag = "Components",
    responses(
        (status = 200, description = "All stored Components", body = ComponentArray),
        (status = 400, description = "Unsupported API version", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    ),
))]
pub async fn list_components(
    State(components): State<ComponentManager>,
) -> ApiResult<Json<ComponentArray>> {
    let components = components.list().await?;
    Ok(Json(ComponentArray { components }))
}

/// POST /hsm/v2/State/Components
///
/// Items are created in order; the first failing item stops the batch and
/// earlier items stay persisted.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/hsm/v2/State/Components",
    tag = "Components",
    request_body = ComponentArray,
    responses(
        (status = 201, description = "Components created"),
        (status = 400, description = "Malformed body or validation failure", body = ApiError),
        (status = 409, description = "Duplicate ID (uniqueness enforced)", body = ApiError),
        (status = 500, description = "uid generation or store failure", body = ApiError),
    ),
))]
pub async fn create_components(
    State(components): State<ComponentManager>,
    ctx: RequestContext,
    payload: Result<Json<ComponentArray>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = payload?;
    components.create(body.components, &ctx).await?;
    Ok(StatusCode::CREATED)
}

/// GET /hsm/v2/State/Components/{id}
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/hsm/v2/State/Components/{id}",
    tag = "Components",
    params(("id" = String, Path, description = "Component ID (xname)")),
    responses(
        (status = 200, description = "Component found", body = ComponentSpec),
        (status = 404, description = "No Component with this ID", body = ApiError),
    ),
))]
pub async fn get_component(
    State(components): State<ComponentManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComponentSpec>> {
    let component = components.get(&id).await?;
    Ok(Json(component.spec))
}

/// PUT /hsm/v2/State/Components/{id}
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/hsm/v2/State/Components/{id}",
    tag = "Components",
    params(("id" = String, Path, description = "Component ID (xname)")),
    request_body = UpdateComponentRequest,
    responses(
        (status = 200, description = "Updated spec", body = ComponentSpec),
        (status = 400, description = "Malformed body or validation failure", body = ApiError),
        (status = 404, description = "No Component with this ID", body = ApiError),
    ),
))]
pub async fn update_component(
    State(components): State<ComponentManager>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateComponentRequest>, JsonRejection>,
) -> ApiResult<Json<ComponentSpec>> {
    let request = payload.map(|Json(body)| body).map_err(ApiError::from);
    let component = components.update(&id, request, &ctx).await?;
    Ok(Json(component.spec))
}

/// DELETE /hsm/v2/State/Components/{id}
///
/// Succeeds whether or not a Component matched.
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/hsm/v2/State/Components/{id}",
    tag = "Components",
    params(("id" = String, Path, description = "Component ID (xname)")),
    responses(
        (status = 200, description = "Deleted, or nothing to delete", body = DeleteComponentResponse),
        (status = 500, description = "Store failure", body = ApiError),
    ),
))]
pub async fn delete_component(
    State(components): State<ComponentManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteComponentResponse>> {
    components.delete(&id).await?;
    Ok(Json(DeleteComponentResponse::deleted(id)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/State/Components",
            get(list_components).post(create_components),
        )
        .route(
            "/State/Components/",
            get(list_components).post(create_components),
        )
        .route(
            "/State/Components/:id",
            get(get_component)
                .put(update_component)
                .delete(delete_component),
        )
}
