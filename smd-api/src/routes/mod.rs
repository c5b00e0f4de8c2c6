//! Router assembly.

pub mod component;
pub mod health;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::metrics_handler;
use crate::versioning::{version_middleware, API_VERSION_HEADER, CALLER_ID_HEADER};
use crate::ws;

/// Build the complete service router.
///
/// - `/hsm/v2/State/Components[/:id]` Component CRUD (version negotiated)
/// - `/hsm/v2/events` WebSocket lifecycle event stream
/// - `/health/*`, `/metrics`, `/openapi.json`
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let hsm = component::create_router()
        .route("/events", get(ws::event_stream))
        .layer(middleware::from_fn_with_state(
            state.policy.clone(),
            version_middleware,
        ));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/hsm/v2", hsm)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(crate::openapi::openapi_json));
    }

    #[allow(unused_mut)]
    let mut router = router.with_state(state);

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            API_VERSION_HEADER,
            CALLER_ID_HEADER,
        ])
        .expose_headers([API_VERSION_HEADER])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: allowing configured origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}
