//! REST API for the session player
//!
//! One router per player daemon. Transport and queue control live
//! under /api/v1; observers stream state changes from /api/v1/events.

pub mod handlers;
pub mod sse;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::playback::SessionController;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: SessionController,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                // Transport control
                .route("/playback/play", post(handlers::play))
                .route("/playback/pause", post(handlers::pause))
                .route("/playback/seek", post(handlers::seek))
                .route("/playback/next", post(handlers::next))
                .route("/playback/previous", post(handlers::previous))
                .route("/playback/skip/:index", post(handlers::skip_to))
                .route("/playback/state", get(handlers::get_state))
                // Queue management
                .route("/queue", get(handlers::get_queue))
                .route("/queue", put(handlers::set_queue))
                .route("/queue/playlist/:playlist_id", post(handlers::load_playlist))
                // Mode settings
                .route("/modes", get(handlers::get_modes))
                .route("/modes/shuffle", post(handlers::toggle_shuffle))
                .route("/modes/repeat", post(handlers::cycle_repeat))
                .route("/modes/view", put(handlers::set_view_mode))
                // SSE events
                .route("/events", get(sse::events_handler)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "encore-player",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}
