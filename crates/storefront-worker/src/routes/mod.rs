//! HTTP routes.

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod admin_ws;
pub mod health;

/// Builds the full HTTP surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(admin_ws::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
