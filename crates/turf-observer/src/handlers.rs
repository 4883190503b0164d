//! REST handlers for the observer server.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/health` | Cache backend health, counters, connected clients |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use turf_cache::{CacheHealth, CacheStats};

use crate::state::AppState;

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` when the active backend answered its probe, else `degraded`.
    pub status: &'static str,
    /// Probe of the active backend.
    pub cache: CacheHealth,
    /// Coordinator counters.
    pub stats: CacheStats,
    /// Connected `WebSocket` clients.
    pub clients: usize,
}

/// Report cache coordinator health.
///
/// Always answers `200`: running on the fallback store is a degraded
/// state, not an outage.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.cache.health_check().await;
    let stats = state.cache.stats().await;
    let status = if cache.backend_healthy { "ok" } else { "degraded" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            cache,
            stats,
            clients: state.client_count(),
        }),
    )
}
