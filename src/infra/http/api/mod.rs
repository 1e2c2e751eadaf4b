pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{Router, routing::get};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route("/api/items/{id}", get(handlers::get_item))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/health", get(handlers::health))
        .with_state(state)
}
