//! HTTP route definitions

use std::convert::Infallible;
use std::path::Path;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/health";

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let origins: Vec<header::HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<header::HeaderValue>().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    }
    .allow_methods([Method::GET, Method::OPTIONS]);

    // Everything not routed below comes from the client bundle
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route(&state.config.ws_path, get(ws_handler))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Answer `request` from the static directory
pub async fn serve_static(dir: &Path, request: Request) -> Response {
    let result: Result<_, Infallible> = ServeDir::new(dir).oneshot(request).await;
    match result {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub connected_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: uptime_secs(),
        connected_players: state.relay.player_count(),
    })
}
