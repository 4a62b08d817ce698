//! Analytics sink port.
//!
//! Playback milestones (play, pause, seek, ended) are forwarded to the
//! portal's tracking endpoint. Delivery is strictly best-effort: a
//! down analytics service must never affect playback, so failures are
//! logged at warn and dropped.

use encore_common::Track;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Payload attached to every tracking call.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingPayload {
    pub track_id: String,
    pub track_title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub content_type: encore_common::MediaKind,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    /// Where in the portal the player is embedded ("artist_page",
    /// "discover", ...).
    pub player_context: String,
    /// Correlates all milestones from one player session.
    pub session_id: uuid::Uuid,
    pub position_seconds: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl TrackingPayload {
    pub fn new(
        track: &Track,
        playlist_id: Option<String>,
        player_context: &str,
        session_id: uuid::Uuid,
        position_seconds: f64,
    ) -> Self {
        Self {
            track_id: track.id.clone(),
            track_title: track.title.clone(),
            artist_id: track.artist_id.clone(),
            artist_name: track.artist_name.clone(),
            content_type: track.kind,
            duration_seconds: track.duration_seconds,
            playlist_id,
            player_context: player_context.to_string(),
            session_id,
            position_seconds,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Seek events additionally carry where the jump started.
#[derive(Debug, Clone, Serialize)]
pub struct SeekPayload {
    #[serde(flatten)]
    pub base: TrackingPayload,
    pub from_seconds: f64,
}

/// Destination for playback milestones. Implementations must return
/// quickly; slow transports spawn their own delivery tasks.
pub trait AnalyticsSink: Send + Sync {
    fn track_play(&self, payload: TrackingPayload);
    fn track_pause(&self, payload: TrackingPayload);
    fn track_ended(&self, payload: TrackingPayload);
    fn track_seek(&self, payload: SeekPayload);
}

/// Sink that POSTs each milestone to the portal's tracking endpoint.
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    pub fn new(endpoint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        })
    }

    fn post<T: Serialize + Send + 'static>(&self, event: &'static str, payload: T) {
        let client = self.client.clone();
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), event);
        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(event, "analytics delivered");
                }
                Ok(response) => {
                    warn!(event, status = %response.status(), "analytics rejected");
                }
                Err(e) => {
                    warn!(event, error = %e, "analytics delivery failed");
                }
            }
        });
    }
}

impl AnalyticsSink for HttpAnalyticsSink {
    fn track_play(&self, payload: TrackingPayload) {
        self.post("play", payload);
    }

    fn track_pause(&self, payload: TrackingPayload) {
        self.post("pause", payload);
    }

    fn track_ended(&self, payload: TrackingPayload) {
        self.post("ended", payload);
    }

    fn track_seek(&self, payload: SeekPayload) {
        self.post("seek", payload);
    }
}

/// Sink that discards everything. Default when no tracking endpoint is
/// configured.
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track_play(&self, _payload: TrackingPayload) {}
    fn track_pause(&self, _payload: TrackingPayload) {}
    fn track_ended(&self, _payload: TrackingPayload) {}
    fn track_seek(&self, _payload: SeekPayload) {}
}
