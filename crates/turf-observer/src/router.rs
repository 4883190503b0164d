//! Axum router construction for the observer server.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the observer router.
///
/// - `GET /ws/changes` -- `WebSocket` notification stream
/// - `GET /api/health` -- cache coordinator health
///
/// CORS allows any origin so dashboards on other hosts can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/changes", get(ws::ws_changes))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
