//! SMD2 API - versioned HTTP surface for HSM v2 Components
//!
//! Hosts the [`ComponentManager`] lifecycle orchestration, the axum routes
//! that expose it under `/hsm/v2`, the WebSocket event stream, and the
//! service's configuration, error mapping and telemetry.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod versioning;
pub mod ws;

pub use config::{ApiConfig, LogFormat, StoreBackend, DEFAULT_PORT};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use lifecycle::ComponentManager;
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use server::{serve, shutdown_signal};
pub use state::AppState;
pub use types::{ComponentArray, DeleteComponentResponse, UpdateComponentRequest};
pub use versioning::{RequestContext, API_VERSION_HEADER, CALLER_ID_HEADER};
