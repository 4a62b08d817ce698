//! HTTP request handlers
//!
//! Thin adapters between the REST surface and the session controller.
//! Transport operations are forgiving by design (empty queue and
//! out-of-range skips are accepted and ignored), so most handlers
//! always return 200 with the resulting status.

use axum::{
    extract::{Path, State},
    Json,
};
use encore_common::{Track, ViewMode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::modes::PlayerModes;
use crate::playback::PlayerSnapshot;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub position_seconds: f64,
}

#[derive(Debug, Deserialize)]
pub struct SetQueueRequest {
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub start_index: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SetViewModeRequest {
    pub view_mode: String,
}

#[derive(Debug, Serialize)]
pub struct ShuffleResponse {
    pub shuffle: bool,
}

#[derive(Debug, Serialize)]
pub struct RepeatResponse {
    pub repeat: encore_common::RepeatMode,
}

// ============================================================================
// Transport Control
// ============================================================================

/// POST /playback/play
pub async fn play(State(state): State<AppState>) -> Json<StatusResponse> {
    state.controller.play().await;
    Json(StatusResponse::ok())
}

/// POST /playback/pause
pub async fn pause(State(state): State<AppState>) -> Json<StatusResponse> {
    state.controller.pause().await;
    Json(StatusResponse::ok())
}

/// POST /playback/seek
pub async fn seek(
    State(state): State<AppState>,
    Json(request): Json<SeekRequest>,
) -> Json<StatusResponse> {
    state.controller.seek(request.position_seconds).await;
    Json(StatusResponse::ok())
}

/// POST /playback/next
pub async fn next(State(state): State<AppState>) -> Json<StatusResponse> {
    state.controller.next().await;
    Json(StatusResponse::ok())
}

/// POST /playback/previous
pub async fn previous(State(state): State<AppState>) -> Json<StatusResponse> {
    state.controller.previous().await;
    Json(StatusResponse::ok())
}

/// POST /playback/skip/:index
pub async fn skip_to(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Json<StatusResponse> {
    state.controller.skip_to(index).await;
    Json(StatusResponse::ok())
}

/// GET /playback/state
pub async fn get_state(State(state): State<AppState>) -> Json<PlayerSnapshot> {
    Json(state.controller.snapshot().await)
}

// ============================================================================
// Queue Management
// ============================================================================

/// GET /queue
pub async fn get_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    let tracks = state.controller.queue_tracks().await;
    let current_index = state.controller.snapshot().await.current_index;
    Json(QueueResponse {
        tracks,
        current_index,
    })
}

/// PUT /queue
pub async fn set_queue(
    State(state): State<AppState>,
    Json(request): Json<SetQueueRequest>,
) -> Json<StatusResponse> {
    info!(
        track_count = request.tracks.len(),
        start_index = request.start_index,
        "queue replaced via API"
    );
    state
        .controller
        .set_queue(request.tracks, request.start_index)
        .await;
    Json(StatusResponse::ok())
}

/// POST /queue/playlist/:playlist_id
pub async fn load_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Json<StatusResponse> {
    state.controller.load_playlist(&playlist_id).await;
    Json(StatusResponse::ok())
}

// ============================================================================
// Mode Settings
// ============================================================================

/// GET /modes
pub async fn get_modes(State(state): State<AppState>) -> Json<PlayerModes> {
    Json(state.controller.modes().await)
}

/// POST /modes/shuffle - toggle shuffle
pub async fn toggle_shuffle(State(state): State<AppState>) -> Json<ShuffleResponse> {
    let shuffle = state.controller.toggle_shuffle().await;
    Json(ShuffleResponse { shuffle })
}

/// POST /modes/repeat - cycle repeat off -> all -> one -> off
pub async fn cycle_repeat(State(state): State<AppState>) -> Json<RepeatResponse> {
    let repeat = state.controller.cycle_repeat().await;
    Json(RepeatResponse { repeat })
}

/// PUT /modes/view
pub async fn set_view_mode(
    State(state): State<AppState>,
    Json(request): Json<SetViewModeRequest>,
) -> Result<Json<StatusResponse>> {
    let mode: ViewMode = request
        .view_mode
        .parse()
        .map_err(|_| Error::BadRequest(format!("unknown view mode: {}", request.view_mode)))?;
    state.controller.set_view_mode(mode).await;
    Ok(Json(StatusResponse::ok()))
}
