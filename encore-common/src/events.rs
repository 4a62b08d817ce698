//! Event types for the Encore session player
//!
//! Provides the shared event definitions and EventBus used by the
//! player daemon and its observers (SSE clients, analytics forwarder).
//!
//! # Architecture
//!
//! The player uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting
//! - **Channels** (tokio::mpsc): media handle -> controller delivery
//! - **Shared state** (Arc<RwLock<T>>): read-heavy session state

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{RepeatMode, TransportState, ViewMode};

/// Session player event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission. All observers match on this central enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Transport state changed (idle / playing / paused)
    PlaybackStateChanged {
        old_state: TransportState,
        new_state: TransportState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A different track became current (queue replaced, next/previous,
    /// or explicit skip)
    TrackChanged {
        /// Content id of the new current track, None when the queue
        /// emptied
        track_id: Option<String>,
        /// New queue position (None when the queue is empty)
        index: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Current track played to its end
    ///
    /// `advanced` is false when playback stopped on the last track with
    /// repeat off.
    TrackEnded {
        track_id: String,
        advanced: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position jumped via seek
    PlaybackSeeked {
        track_id: String,
        from_seconds: f64,
        to_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic position update during playback
    ///
    /// NOTE: transmitted to observers only, never persisted.
    PlaybackProgress {
        track_id: String,
        position_seconds: f64,
        duration_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue replaced wholesale
    QueueReplaced {
        track_count: usize,
        start_index: usize,
        /// Playlist id when the queue came from a playlist resolve
        #[serde(skip_serializing_if = "Option::is_none")]
        playlist_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shuffle / repeat / view-mode settings changed
    ModesChanged {
        shuffle: bool,
        repeat: RepeatMode,
        view_mode: ViewMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue fetch started or finished
    LoadingChanged {
        loading: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Owning user session ended; playback torn down
    SessionEnded {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Get event type as string for filtering and SSE event names
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            SessionEvent::TrackChanged { .. } => "TrackChanged",
            SessionEvent::TrackEnded { .. } => "TrackEnded",
            SessionEvent::PlaybackSeeked { .. } => "PlaybackSeeked",
            SessionEvent::PlaybackProgress { .. } => "PlaybackProgress",
            SessionEvent::QueueReplaced { .. } => "QueueReplaced",
            SessionEvent::ModesChanged { .. } => "ModesChanged",
            SessionEvent::LoadingChanged { .. } => "LoadingChanged",
            SessionEvent::SessionEnded { .. } => "SessionEnded",
        }
    }
}

/// Central event distribution bus for session events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// Older events are dropped for a subscriber that falls more than
    /// `capacity` events behind.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber
    /// exists, `Err` otherwise.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for non-critical traffic such as progress updates.
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
