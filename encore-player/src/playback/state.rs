//! Shared transport state for the playback session.
//!
//! Cheaply cloneable; all fields live behind `RwLock`s so the HTTP
//! layer, the handle event pump, and the controller can read a
//! consistent snapshot without holding the controller's locks.

use encore_common::{EventBus, SessionEvent, TransportState};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Position pairs progress with the duration it was clamped against,
/// so the two can never be observed mid-update.
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    progress_seconds: f64,
    duration_seconds: f64,
}

#[derive(Clone)]
pub struct SharedState {
    transport: Arc<RwLock<TransportState>>,
    position: Arc<RwLock<Position>>,
    loading: Arc<RwLock<bool>>,
    bus: EventBus,
}

impl SharedState {
    pub fn new(bus: EventBus) -> Self {
        Self {
            transport: Arc::new(RwLock::new(TransportState::Idle)),
            position: Arc::new(RwLock::new(Position::default())),
            loading: Arc::new(RwLock::new(false)),
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn transport(&self) -> TransportState {
        *self.transport.read().await
    }

    pub async fn is_playing(&self) -> bool {
        *self.transport.read().await == TransportState::Playing
    }

    /// Store the new transport state and return the one it replaced.
    pub async fn set_transport(&self, new_state: TransportState) -> TransportState {
        let mut transport = self.transport.write().await;
        std::mem::replace(&mut *transport, new_state)
    }

    pub async fn progress_seconds(&self) -> f64 {
        self.position.read().await.progress_seconds
    }

    pub async fn duration_seconds(&self) -> f64 {
        self.position.read().await.duration_seconds
    }

    /// Update progress, clamped into `[0, duration]`. Returns the
    /// clamped value actually stored.
    pub async fn set_progress(&self, seconds: f64) -> f64 {
        let mut position = self.position.write().await;
        let clamped = clamp_progress(seconds, position.duration_seconds);
        position.progress_seconds = clamped;
        clamped
    }

    /// Update the known media duration, re-clamping progress against it.
    pub async fn set_duration(&self, seconds: f64) {
        let mut position = self.position.write().await;
        position.duration_seconds = seconds.max(0.0);
        position.progress_seconds = clamp_progress(position.progress_seconds, position.duration_seconds);
    }

    /// Zero both progress and duration, as at the start of a new track.
    pub async fn reset_position(&self) {
        let mut position = self.position.write().await;
        *position = Position::default();
    }

    pub async fn loading(&self) -> bool {
        *self.loading.read().await
    }

    pub async fn set_loading(&self, loading: bool) {
        let mut flag = self.loading.write().await;
        if *flag != loading {
            *flag = loading;
            self.bus.emit_lossy(SessionEvent::LoadingChanged {
                loading,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

fn clamp_progress(seconds: f64, duration: f64) -> f64 {
    // Until the duration is known it is zero, and progress pins to
    // zero with it; the first DurationChanged opens the range.
    seconds.clamp(0.0, duration.max(0.0))
}
