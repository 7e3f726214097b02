//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::snapshot::PlayerSummary;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/players", get(players_handler))
        .route("/api/players/:id", get(player_handler))
        .route("/ws", get(ws_handler));

    let cors = cors_layer(&state.config.client_origin);

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS configuration - `*` allows any origin, otherwise a comma-separated list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Status endpoints
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick: u64,
    players: usize,
    connections: usize,
    snapshots_sent: u64,
    is_game_active: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.game.status();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tick: status.tick,
        players: status.players.len(),
        connections: status.connections,
        snapshots_sent: status.snapshots_sent,
        is_game_active: status.is_game_active,
    })
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    players: usize,
    projectiles: usize,
    game_time: f64,
    is_game_active: bool,
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.game.status();

    Json(StatusResponse {
        status: "running",
        players: status.players.len(),
        projectiles: status.projectiles,
        game_time: status.game_time,
        is_game_active: status.is_game_active,
    })
}

async fn players_handler(State(state): State<AppState>) -> Json<Vec<PlayerSummary>> {
    Json(state.game.status().players)
}

async fn player_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerSummary>, AppError> {
    state
        .game
        .status()
        .players
        .into_iter()
        .find(|p| p.id == id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("player {id}")))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
