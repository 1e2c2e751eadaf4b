//! HTTP surface: the `/api` router and its shared middleware.

pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use axum::{Router, middleware as axum_middleware};

use middleware::{log_responses, set_request_context};

/// Assemble the complete application router.
///
/// Request ids are assigned before response logging runs so that every
/// logged failure can be correlated with the caller.
pub fn build_router(state: ApiState) -> Router {
    build_api_router(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
