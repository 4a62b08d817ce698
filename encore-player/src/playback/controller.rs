//! Session controller: the transport layer.
//!
//! Owns the queue, mode settings, shared transport state, and the
//! media bridge, and sequences them: every track change runs the same
//! reaction (reset position, rebind the surface, load, then autoplay
//! if the transport is playing), ended-handling consults the repeat
//! mode, and every milestone is forwarded to analytics best-effort.

use encore_common::{
    EventBus, MediaKind, RepeatMode, SessionEvent, Track, TransportState, ViewMode,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsSink, SeekPayload, TrackingPayload};
use crate::db::PreferenceStore;
use crate::modes::PlayerModes;
use crate::playback::bridge::MediaBridge;
use crate::playback::handle::{BoundHandleEvent, HandleEvent, MediaHandle, PlayAttempt};
use crate::playback::state::SharedState;
use crate::queue::PlayQueue;
use crate::resolver::PlaylistResolver;

/// Everything a session controller talks to outside its own state.
pub struct ControllerPorts {
    pub audio: Arc<dyn MediaHandle>,
    pub video: Arc<dyn MediaHandle>,
    pub resolver: Arc<dyn PlaylistResolver>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub preferences: Arc<dyn PreferenceStore>,
    /// Where in the portal this player is embedded; attached to every
    /// analytics payload.
    pub player_context: String,
}

/// Read-only view of the whole player, served over the HTTP API.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub transport: TransportState,
    pub is_playing: bool,
    pub progress_seconds: f64,
    pub duration_seconds: f64,
    pub loading: bool,
    pub current_index: Option<usize>,
    pub current_track: Option<Track>,
    pub queue_length: usize,
    pub modes: PlayerModes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    pub active_surface: MediaKind,
}

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    queue: RwLock<PlayQueue>,
    modes: RwLock<PlayerModes>,
    state: SharedState,
    bridge: Mutex<MediaBridge>,
    playlist_id: RwLock<Option<String>>,
    resolver: Arc<dyn PlaylistResolver>,
    analytics: Arc<dyn AnalyticsSink>,
    preferences: Arc<dyn PreferenceStore>,
    player_context: String,
    /// Correlation id stamped on every analytics payload.
    session_id: uuid::Uuid,
    /// Self-reference handed to spawned watcher tasks so they never
    /// keep the controller alive.
    weak: Weak<Inner>,
    /// Bumped on every play attempt, pause, and track change. A play
    /// rejection only reverts the transport when its generation is
    /// still current; rejections from superseded attempts are stale
    /// and must not clobber newer state.
    play_generation: AtomicU64,
}

impl SessionController {
    pub fn new(ports: ControllerPorts) -> Self {
        let state = SharedState::new(EventBus::new(256));
        let (bridge, events_rx) = MediaBridge::new(ports.audio, ports.video);

        let inner = Arc::new_cyclic(|weak| Inner {
            queue: RwLock::new(PlayQueue::new()),
            modes: RwLock::new(PlayerModes::default()),
            state,
            bridge: Mutex::new(bridge),
            playlist_id: RwLock::new(None),
            resolver: ports.resolver,
            analytics: ports.analytics,
            preferences: ports.preferences,
            player_context: ports.player_context,
            session_id: uuid::Uuid::new_v4(),
            weak: weak.clone(),
            play_generation: AtomicU64::new(0),
        });

        tokio::spawn(run_event_pump(Arc::downgrade(&inner), events_rx));

        Self { inner }
    }

    /// Apply the persisted view-mode preference. Called once at
    /// startup, before any queue is loaded.
    pub async fn init(&self) {
        match self.inner.preferences.load_view_mode().await {
            Ok(mode) => {
                self.inner.modes.write().await.view_mode = mode;
                info!(view_mode = %mode, "restored view-mode preference");
            }
            Err(e) => {
                warn!(error = %e, "failed to load view-mode preference; using auto");
            }
        }
    }

    pub fn events(&self) -> EventBus {
        self.inner.state.bus().clone()
    }

    pub fn shared_state(&self) -> SharedState {
        self.inner.state.clone()
    }

    pub async fn load_playlist(&self, playlist_id: &str) {
        self.inner.load_playlist(playlist_id).await
    }

    pub async fn set_queue(&self, tracks: Vec<Track>, start_index: usize) {
        self.inner.replace_queue(tracks, start_index, None).await
    }

    pub async fn play(&self) {
        self.inner.play().await
    }

    pub async fn pause(&self) {
        self.inner.pause().await
    }

    pub async fn seek(&self, seconds: f64) {
        self.inner.seek(seconds).await
    }

    pub async fn next(&self) {
        self.inner.next().await
    }

    pub async fn previous(&self) {
        self.inner.previous().await
    }

    pub async fn skip_to(&self, index: usize) {
        self.inner.skip_to(index).await
    }

    pub async fn toggle_shuffle(&self) -> bool {
        self.inner.toggle_shuffle().await
    }

    pub async fn cycle_repeat(&self) -> RepeatMode {
        self.inner.cycle_repeat().await
    }

    pub async fn set_view_mode(&self, mode: ViewMode) {
        self.inner.set_view_mode(mode).await
    }

    pub async fn modes(&self) -> PlayerModes {
        *self.inner.modes.read().await
    }

    pub async fn queue_tracks(&self) -> Vec<Track> {
        self.inner.queue.read().await.tracks().to_vec()
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.inner.snapshot().await
    }

    /// Tear the session down: stop and detach the active surface,
    /// drop the queue, and announce the end to observers.
    pub async fn shutdown(&self) {
        self.inner.shutdown().await
    }
}

async fn run_event_pump(
    weak: Weak<Inner>,
    mut events_rx: mpsc::UnboundedReceiver<BoundHandleEvent>,
) {
    while let Some(bound) = events_rx.recv().await {
        let Some(inner) = weak.upgrade() else { break };
        inner.handle_event(bound).await;
    }
    debug!("handle event pump stopped");
}

impl Inner {
    /// Apply a surface event. The stale-binding check and the state
    /// write happen under one bridge lock, so a rebind cannot slip in
    /// between them and have an orphaned event land on reset state.
    async fn handle_event(&self, bound: BoundHandleEvent) {
        let bridge = self.bridge.lock().await;
        if bound.binding != bridge.binding() {
            debug!(
                binding = bound.binding,
                current = bridge.binding(),
                "dropping handle event from stale binding"
            );
            return;
        }

        match bound.event {
            HandleEvent::TimeUpdate { position_seconds } => {
                let clamped = self.state.set_progress(position_seconds).await;
                drop(bridge);
                if let Some(track) = self.queue.read().await.current_track() {
                    self.state.bus().emit_lossy(SessionEvent::PlaybackProgress {
                        track_id: track.id.clone(),
                        position_seconds: clamped,
                        duration_seconds: self.state.duration_seconds().await,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            HandleEvent::DurationChanged { duration_seconds } => {
                self.state.set_duration(duration_seconds).await;
            }
            HandleEvent::Ended => self.handle_ended(bridge).await,
        }
    }

    /// Decide what a track end means under the bridge lock the pump
    /// validated the binding with, so a concurrent rebind cannot turn
    /// a stale end into an advance. Only the advance path releases the
    /// guard, and its own rebind supersedes this one.
    async fn handle_ended(&self, bridge: tokio::sync::MutexGuard<'_, MediaBridge>) {
        let (track, at_last) = {
            let queue = self.queue.read().await;
            match queue.current_track() {
                Some(track) => (track.clone(), queue.at_last_index()),
                None => return,
            }
        };
        let repeat = self.modes.read().await.repeat;

        let position = self.state.duration_seconds().await;
        self.analytics
            .track_ended(self.payload(&track, position).await);

        match repeat {
            RepeatMode::One => {
                debug!(track_id = %track.id, "repeat one: restarting track");
                self.state.set_progress(0.0).await;
                let generation = self.next_generation();
                let handle = bridge.active_handle();
                handle.set_position(0.0);
                let attempt = handle.play();
                drop(bridge);
                self.spawn_attempt_watch(attempt, generation);
                self.emit_ended(&track, false);
            }
            RepeatMode::Off if at_last => {
                debug!(track_id = %track.id, "queue finished; stopping");
                self.next_generation();
                drop(bridge);
                self.transition(TransportState::Paused).await;
                self.emit_ended(&track, false);
            }
            _ => {
                drop(bridge);
                self.emit_ended(&track, true);
                self.next().await;
            }
        }
    }

    fn emit_ended(&self, track: &Track, advanced: bool) {
        self.state.bus().emit_lossy(SessionEvent::TrackEnded {
            track_id: track.id.clone(),
            advanced,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn load_playlist(&self, playlist_id: &str) {
        self.state.set_loading(true).await;
        match self.resolver.resolve(playlist_id).await {
            Ok(tracks) => {
                info!(playlist_id, track_count = tracks.len(), "playlist resolved");
                self.replace_queue(tracks, 0, Some(playlist_id.to_string()))
                    .await;
            }
            Err(e) => {
                warn!(playlist_id, error = %e, "playlist resolve failed; clearing queue");
                self.replace_queue(Vec::new(), 0, None).await;
            }
        }
        self.state.set_loading(false).await;
    }

    async fn replace_queue(
        &self,
        tracks: Vec<Track>,
        start_index: usize,
        playlist_id: Option<String>,
    ) {
        *self.playlist_id.write().await = playlist_id.clone();
        let was_playing = self.state.is_playing().await;

        let (track, index, count) = {
            let mut queue = self.queue.write().await;
            queue.set_queue(tracks, start_index);
            (
                queue.current_track().cloned(),
                queue.current_index(),
                queue.len(),
            )
        };

        // A new queue never starts playing by itself. When the replace
        // interrupts playback the surface itself must stop too; the
        // same-surface rebind below bumps the binding without pausing.
        self.next_generation();
        if was_playing {
            self.bridge.lock().await.active_handle().pause();
        }
        self.transition(TransportState::Idle).await;

        self.state.bus().emit_lossy(SessionEvent::QueueReplaced {
            track_count: count,
            start_index: index.unwrap_or(0),
            playlist_id,
            timestamp: chrono::Utc::now(),
        });

        match (track, index) {
            (Some(track), Some(index)) => self.apply_track_change(&track, index).await,
            _ => {
                self.state.reset_position().await;
                let mut bridge = self.bridge.lock().await;
                bridge.active_handle().pause();
                let kind = bridge.active_kind();
                bridge.rebind(kind);
                self.state.bus().emit_lossy(SessionEvent::TrackChanged {
                    track_id: None,
                    index: None,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    async fn play(&self) {
        let track = self.queue.read().await.current_track().cloned();
        let Some(track) = track else {
            debug!("play ignored: queue is empty");
            return;
        };

        // Playing is set at issue time, not at resolution; a later
        // rejection reverts it through the generation-guarded watcher.
        let generation = self.next_generation();
        let attempt = {
            let bridge = self.bridge.lock().await;
            bridge.active_handle().play()
        };
        self.transition(TransportState::Playing).await;
        self.spawn_attempt_watch(attempt, generation);

        let position = self.state.progress_seconds().await;
        self.analytics
            .track_play(self.payload(&track, position).await);
    }

    async fn pause(&self) {
        let track = self.queue.read().await.current_track().cloned();
        let Some(track) = track else {
            debug!("pause ignored: queue is empty");
            return;
        };

        // Invalidate any in-flight play attempt before touching state.
        self.next_generation();
        let position = {
            let bridge = self.bridge.lock().await;
            let handle = bridge.active_handle();
            handle.pause();
            handle.position()
        };
        let stored = self.state.set_progress(position).await;
        self.transition(TransportState::Paused).await;

        self.analytics
            .track_pause(self.payload(&track, stored).await);
    }

    async fn seek(&self, seconds: f64) {
        let track = self.queue.read().await.current_track().cloned();
        let Some(track) = track else {
            debug!("seek ignored: queue is empty");
            return;
        };

        let from = self.state.progress_seconds().await;
        let to = self.state.set_progress(seconds).await;
        {
            let bridge = self.bridge.lock().await;
            bridge.active_handle().set_position(to);
        }

        self.state.bus().emit_lossy(SessionEvent::PlaybackSeeked {
            track_id: track.id.clone(),
            from_seconds: from,
            to_seconds: to,
            timestamp: chrono::Utc::now(),
        });
        self.analytics.track_seek(SeekPayload {
            base: self.payload(&track, to).await,
            from_seconds: from,
        });
    }

    async fn next(&self) {
        let shuffle = self.modes.read().await.shuffle;
        let target = self.queue.read().await.next_index(shuffle);
        let Some(index) = target else {
            debug!("next ignored: queue is empty");
            return;
        };
        self.jump_to(index).await;
    }

    async fn previous(&self) {
        let target = self.queue.read().await.previous_index();
        let Some(index) = target else {
            debug!("previous ignored: queue is empty");
            return;
        };
        self.jump_to(index).await;
    }

    async fn skip_to(&self, index: usize) {
        self.jump_to(index).await;
    }

    /// Move the cursor and start playing the track it lands on.
    async fn jump_to(&self, index: usize) {
        let track = {
            let mut queue = self.queue.write().await;
            if !queue.skip_to(index) {
                return;
            }
            queue.current_track().cloned()
        };
        let Some(track) = track else { return };

        self.transition(TransportState::Playing).await;
        self.apply_track_change(&track, index).await;
    }

    /// The track-change reaction. Order matters and is observable:
    /// progress resets before the rebind, so no observer ever sees the
    /// old position against the new track; the rebind bumps the
    /// binding generation, orphaning queued events from the previous
    /// track; only then does the new source load and (when the
    /// transport is playing) autoplay start.
    async fn apply_track_change(&self, track: &Track, index: usize) {
        self.state.reset_position().await;

        let surface = self.modes.read().await.effective_view_mode(track.kind);
        let generation = self.next_generation();
        let attempt = {
            let mut bridge = self.bridge.lock().await;
            bridge.rebind(surface);
            let handle = bridge.active_handle();
            handle.load(&track.media_url);
            if self.state.is_playing().await {
                Some(handle.play())
            } else {
                None
            }
        };

        let autoplay = attempt.is_some();
        if let Some(attempt) = attempt {
            self.spawn_attempt_watch(attempt, generation);
        }

        self.state.bus().emit_lossy(SessionEvent::TrackChanged {
            track_id: Some(track.id.clone()),
            index: Some(index),
            timestamp: chrono::Utc::now(),
        });

        if autoplay {
            self.analytics.track_play(self.payload(track, 0.0).await);
        }
    }

    async fn toggle_shuffle(&self) -> bool {
        let modes = {
            let mut modes = self.modes.write().await;
            modes.toggle_shuffle();
            *modes
        };
        self.emit_modes(modes);
        modes.shuffle
    }

    async fn cycle_repeat(&self) -> RepeatMode {
        let modes = {
            let mut modes = self.modes.write().await;
            modes.cycle_repeat();
            *modes
        };
        self.emit_modes(modes);
        modes.repeat
    }

    async fn set_view_mode(&self, mode: ViewMode) {
        let modes = {
            let mut modes = self.modes.write().await;
            if modes.view_mode == mode {
                return;
            }
            modes.view_mode = mode;
            *modes
        };

        if let Err(e) = self.preferences.store_view_mode(mode).await {
            warn!(error = %e, "failed to persist view-mode preference");
        }
        self.emit_modes(modes);

        // Rerun the track-change reaction only when the preference
        // actually moves the current track to the other surface.
        let current = {
            let queue = self.queue.read().await;
            queue
                .current_track()
                .cloned()
                .zip(queue.current_index())
        };
        if let Some((track, index)) = current {
            let surface = modes.effective_view_mode(track.kind);
            let active = self.bridge.lock().await.active_kind();
            if surface != active {
                self.apply_track_change(&track, index).await;
            }
        }
    }

    fn emit_modes(&self, modes: PlayerModes) {
        self.state.bus().emit_lossy(SessionEvent::ModesChanged {
            shuffle: modes.shuffle,
            repeat: modes.repeat,
            view_mode: modes.view_mode,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn snapshot(&self) -> PlayerSnapshot {
        let (current_index, current_track, queue_length) = {
            let queue = self.queue.read().await;
            (
                queue.current_index(),
                queue.current_track().cloned(),
                queue.len(),
            )
        };
        let transport = self.state.transport().await;

        PlayerSnapshot {
            transport,
            is_playing: transport == TransportState::Playing,
            progress_seconds: self.state.progress_seconds().await,
            duration_seconds: self.state.duration_seconds().await,
            loading: self.state.loading().await,
            current_index,
            current_track,
            queue_length,
            modes: *self.modes.read().await,
            playlist_id: self.playlist_id.read().await.clone(),
            active_surface: self.bridge.lock().await.active_kind(),
        }
    }

    async fn shutdown(&self) {
        self.next_generation();
        {
            let mut bridge = self.bridge.lock().await;
            bridge.shutdown();
        }
        self.queue.write().await.clear();
        self.state.reset_position().await;
        self.transition(TransportState::Idle).await;
        self.state.bus().emit_lossy(SessionEvent::SessionEnded {
            timestamp: chrono::Utc::now(),
        });
        info!("session torn down");
    }

    async fn transition(&self, new_state: TransportState) {
        let old_state = self.state.set_transport(new_state).await;
        if old_state != new_state {
            self.state
                .bus()
                .emit_lossy(SessionEvent::PlaybackStateChanged {
                    old_state,
                    new_state,
                    timestamp: chrono::Utc::now(),
                });
        }
    }

    fn next_generation(&self) -> u64 {
        self.play_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Await the attempt's verdict off the hot path. A rejection only
    /// reverts the transport while its generation is still current.
    fn spawn_attempt_watch(&self, attempt: PlayAttempt, generation: u64) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            let Err(reason) = attempt.outcome().await else {
                return;
            };
            let Some(inner) = weak.upgrade() else { return };

            if inner.play_generation.load(Ordering::SeqCst) != generation {
                debug!(reason = %reason, "ignoring rejection from superseded play attempt");
                return;
            }

            warn!(reason = %reason, "play attempt rejected; reverting to paused");
            inner.transition(TransportState::Paused).await;
        });
    }

    async fn payload(&self, track: &Track, position_seconds: f64) -> TrackingPayload {
        TrackingPayload::new(
            track,
            self.playlist_id.read().await.clone(),
            &self.player_context,
            self.session_id,
            position_seconds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::RecordingSink;
    use crate::db::MemoryPreferenceStore;
    use crate::playback::testing::FakeHandle;
    use crate::resolver::StaticResolver;
    use std::sync::atomic::Ordering as AtomicOrdering;
    use std::time::Duration;

    struct Rig {
        controller: SessionController,
        audio: Arc<FakeHandle>,
        video: Arc<FakeHandle>,
        analytics: Arc<RecordingSink>,
    }

    fn audio_track(n: usize) -> Track {
        Track {
            id: format!("trk-{}", n),
            title: format!("Track {}", n),
            kind: MediaKind::Audio,
            artist_name: "Vera Lux".into(),
            artist_id: "art-9".into(),
            artist_slug: "vera-lux".into(),
            thumbnail_url: None,
            media_url: format!("https://cdn.example.com/trk-{}.mp3", n),
            duration_seconds: 180.0,
        }
    }

    fn video_track(n: usize) -> Track {
        Track {
            kind: MediaKind::Video,
            media_url: format!("https://cdn.example.com/trk-{}.mp4", n),
            ..audio_track(n)
        }
    }

    fn rig_with(
        resolver: StaticResolver,
        preferences: MemoryPreferenceStore,
    ) -> Rig {
        let audio = Arc::new(FakeHandle::default());
        let video = Arc::new(FakeHandle::default());
        let analytics = Arc::new(RecordingSink::default());
        let controller = SessionController::new(ControllerPorts {
            audio: audio.clone(),
            video: video.clone(),
            resolver: Arc::new(resolver),
            analytics: analytics.clone(),
            preferences: Arc::new(preferences),
            player_context: "artist_page".into(),
        });
        Rig {
            controller,
            audio,
            video,
            analytics,
        }
    }

    fn rig() -> Rig {
        rig_with(StaticResolver::new(), MemoryPreferenceStore::default())
    }

    /// Let spawned tasks (event pump, attempt watchers) run.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn set_queue_loads_but_does_not_play() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Idle);
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(
            rig.audio.loaded_url(),
            Some("https://cdn.example.com/trk-0.mp3".to_string())
        );
        assert_eq!(rig.audio.play_count.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_queue_clamps_start_index() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 99)
            .await;
        assert_eq!(rig.controller.snapshot().await.current_index, Some(1));
    }

    #[tokio::test]
    async fn replace_queue_while_playing_stops_surface() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        rig.controller.play().await;
        settle().await;
        assert_eq!(rig.audio.pause_count.load(AtomicOrdering::SeqCst), 0);

        rig.controller
            .set_queue(vec![audio_track(2), audio_track(3)], 0)
            .await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Idle);
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(rig.audio.pause_count.load(AtomicOrdering::SeqCst), 1);
        // The initial play only; a replaced queue never auto-starts.
        assert_eq!(rig.audio.play_count.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replaced_queue_does_not_self_start() {
        use crate::playback::ClockHandle;

        let tick = Duration::from_millis(25);
        let controller = SessionController::new(ControllerPorts {
            audio: ClockHandle::spawn(0.2, tick),
            video: ClockHandle::spawn(0.2, tick),
            resolver: Arc::new(StaticResolver::new()),
            analytics: Arc::new(RecordingSink::default()),
            preferences: Arc::new(MemoryPreferenceStore::default()),
            player_context: "artist_page".into(),
        });

        controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        controller.play().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Replace mid-track, then wait well past where the old clock
        // would have ended and advanced the queue.
        controller
            .set_queue(vec![audio_track(2), audio_track(3)], 0)
            .await;
        assert_eq!(
            controller.snapshot().await.transport,
            TransportState::Idle
        );
        tokio::time::sleep(Duration::from_millis(400)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Idle);
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.progress_seconds, 0.0);
    }

    #[tokio::test]
    async fn play_starts_transport_and_records_analytics() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.play().await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert!(snapshot.is_playing);
        assert_eq!(rig.audio.play_count.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(rig.analytics.events(), vec!["play".to_string()]);
    }

    #[tokio::test]
    async fn transport_ops_noop_on_empty_queue() {
        let rig = rig();
        rig.controller.play().await;
        rig.controller.pause().await;
        rig.controller.seek(30.0).await;
        rig.controller.next().await;
        rig.controller.previous().await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Idle);
        assert!(rig.analytics.events().is_empty());
        assert_eq!(rig.audio.play_count.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn next_wraps_around_two_track_queue() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;

        rig.controller.next().await;
        assert_eq!(rig.controller.snapshot().await.current_index, Some(1));
        rig.controller.next().await;
        assert_eq!(rig.controller.snapshot().await.current_index, Some(0));
        rig.controller.next().await;
        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(1));
        assert!(snapshot.is_playing);
    }

    #[tokio::test]
    async fn previous_wraps_to_last_from_first() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1), audio_track(2)], 0)
            .await;
        rig.controller.previous().await;
        assert_eq!(rig.controller.snapshot().await.current_index, Some(2));
    }

    #[tokio::test]
    async fn skip_to_out_of_range_is_ignored() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.skip_to(5).await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.transport, TransportState::Idle);
    }

    #[tokio::test]
    async fn seek_clamps_and_records_analytics() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::DurationChanged {
            duration_seconds: 100.0,
        });
        settle().await;

        rig.controller.seek(500.0).await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.progress_seconds, 100.0);
        assert!(rig.audio.current_sink().is_some());
        assert!(rig.analytics.events().contains(&"seek".to_string()));
    }

    #[tokio::test]
    async fn pause_captures_handle_position() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::DurationChanged {
            duration_seconds: 180.0,
        });
        settle().await;

        rig.audio.set_position(42.5);
        rig.controller.pause().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Paused);
        assert_eq!(snapshot.progress_seconds, 42.5);
        assert_eq!(rig.audio.pause_count.load(AtomicOrdering::SeqCst), 1);
        assert!(rig.analytics.events().contains(&"pause".to_string()));
    }

    #[tokio::test]
    async fn time_update_from_current_binding_moves_progress() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::DurationChanged {
            duration_seconds: 180.0,
        });
        rig.audio.fire(HandleEvent::TimeUpdate {
            position_seconds: 12.0,
        });
        settle().await;

        assert_eq!(rig.controller.snapshot().await.progress_seconds, 12.0);
    }

    #[tokio::test]
    async fn stale_binding_events_are_dropped() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        rig.controller.play().await;
        settle().await;

        // Capture the sink bound for track 0, then advance to track 1.
        let stale_sink = rig.audio.current_sink().unwrap();
        rig.controller.next().await;
        settle().await;

        stale_sink.emit(HandleEvent::TimeUpdate {
            position_seconds: 170.0,
        });
        stale_sink.emit(HandleEvent::Ended);
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.progress_seconds, 0.0);
    }

    #[tokio::test]
    async fn ended_racing_queue_replace_is_orphaned() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        rig.controller.play().await;
        settle().await;

        // The end of the old track is still queued when the replace
        // lands; the rebind's generation bump must orphan it.
        rig.audio.fire(HandleEvent::Ended);
        rig.controller
            .set_queue(vec![audio_track(2), audio_track(3)], 0)
            .await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Idle);
        assert_eq!(snapshot.current_index, Some(0));
        assert!(!rig.analytics.events().contains(&"ended".to_string()));
    }

    #[tokio::test]
    async fn track_change_resets_progress_before_autoplay() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::DurationChanged {
            duration_seconds: 180.0,
        });
        rig.audio.fire(HandleEvent::TimeUpdate {
            position_seconds: 120.0,
        });
        settle().await;

        rig.controller.next().await;
        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.progress_seconds, 0.0);
        assert_eq!(snapshot.duration_seconds, 0.0);
        assert_eq!(
            rig.audio.loaded_url(),
            Some("https://cdn.example.com/trk-1.mp3".to_string())
        );
        // Initial play plus the autoplay after the track change.
        assert_eq!(rig.audio.play_count.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ended_with_repeat_off_advances_mid_queue() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::Ended);
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(1));
        assert!(snapshot.is_playing);
        assert!(rig.analytics.events().contains(&"ended".to_string()));
    }

    #[tokio::test]
    async fn ended_with_repeat_off_stops_on_last_track() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 1)
            .await;
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::Ended);
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.transport, TransportState::Paused);
    }

    #[tokio::test]
    async fn ended_with_repeat_all_wraps_from_last_track() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 1)
            .await;
        rig.controller.cycle_repeat().await; // off -> all
        rig.controller.play().await;
        rig.audio.fire(HandleEvent::Ended);
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(0));
        assert!(snapshot.is_playing);
    }

    #[tokio::test]
    async fn ended_with_repeat_one_restarts_same_track() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1)], 0)
            .await;
        rig.controller.cycle_repeat().await; // off -> all
        rig.controller.cycle_repeat().await; // all -> one
        rig.controller.play().await;
        settle().await;
        let plays_before = rig.audio.play_count.load(AtomicOrdering::SeqCst);

        rig.audio.fire(HandleEvent::Ended);
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.current_index, Some(0));
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.progress_seconds, 0.0);
        assert_eq!(rig.audio.position(), 0.0);
        assert_eq!(
            rig.audio.play_count.load(AtomicOrdering::SeqCst),
            plays_before + 1
        );
    }

    #[tokio::test]
    async fn rejected_play_reverts_to_paused() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        *rig.audio.reject_next_play.lock().unwrap() = Some("autoplay blocked".into());
        rig.controller.play().await;
        settle().await;

        assert_eq!(
            rig.controller.snapshot().await.transport,
            TransportState::Paused
        );
    }

    #[tokio::test]
    async fn stale_rejection_does_not_revert_newer_play() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        *rig.audio.reject_next_play.lock().unwrap() = Some("autoplay blocked".into());
        rig.controller.play().await;
        // Second attempt supersedes the first before its rejection is
        // observed.
        rig.controller.play().await;
        settle().await;

        assert!(rig.controller.snapshot().await.is_playing);
    }

    #[tokio::test]
    async fn stale_rejection_does_not_undo_pause() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        *rig.audio.reject_next_play.lock().unwrap() = Some("network stall".into());
        rig.controller.play().await;
        rig.controller.pause().await;
        settle().await;

        assert_eq!(
            rig.controller.snapshot().await.transport,
            TransportState::Paused
        );
    }

    #[tokio::test]
    async fn video_track_plays_on_video_surface() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), video_track(1)], 0)
            .await;
        rig.controller.play().await;
        rig.controller.next().await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.active_surface, MediaKind::Video);
        assert_eq!(
            rig.video.loaded_url(),
            Some("https://cdn.example.com/trk-1.mp4".to_string())
        );
        // The audio surface pauses when the binding moves off it.
        assert!(rig.audio.pause_count.load(AtomicOrdering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn forced_audio_mode_keeps_video_tracks_on_audio_surface() {
        let rig = rig();
        rig.controller.set_view_mode(ViewMode::Audio).await;
        rig.controller.set_queue(vec![video_track(0)], 0).await;
        rig.controller.play().await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.active_surface, MediaKind::Audio);
        assert_eq!(rig.video.load_count.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn view_mode_change_rebinds_current_track() {
        let rig = rig();
        rig.controller.set_queue(vec![video_track(0)], 0).await;
        rig.controller.play().await;
        settle().await;
        assert_eq!(
            rig.controller.snapshot().await.active_surface,
            MediaKind::Video
        );

        rig.controller.set_view_mode(ViewMode::Audio).await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.active_surface, MediaKind::Audio);
        // The reaction restarted from zero on the new surface.
        assert_eq!(snapshot.progress_seconds, 0.0);
        assert!(snapshot.is_playing);
        assert!(rig.audio.loaded_url().is_some());
    }

    #[tokio::test]
    async fn view_mode_persists_through_preference_store() {
        let preferences = MemoryPreferenceStore::default();
        let rig = rig_with(StaticResolver::new(), preferences);
        rig.controller.set_view_mode(ViewMode::Video).await;
        assert_eq!(rig.controller.modes().await.view_mode, ViewMode::Video);

        let restored = rig_with(
            StaticResolver::new(),
            MemoryPreferenceStore::with_mode(ViewMode::Video),
        );
        restored.controller.init().await;
        assert_eq!(restored.controller.modes().await.view_mode, ViewMode::Video);
    }

    #[tokio::test]
    async fn load_playlist_populates_queue() {
        let resolver = StaticResolver::new()
            .with_playlist("pl-1", vec![audio_track(0), audio_track(1)]);
        let rig = rig_with(resolver, MemoryPreferenceStore::default());

        rig.controller.load_playlist("pl-1").await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.queue_length, 2);
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.playlist_id, Some("pl-1".to_string()));
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn failed_playlist_resolve_clears_queue() {
        let rig = rig();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.load_playlist("missing").await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.queue_length, 0);
        assert_eq!(snapshot.current_index, None);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn shuffle_next_stays_in_bounds() {
        let rig = rig();
        rig.controller
            .set_queue(vec![audio_track(0), audio_track(1), audio_track(2)], 0)
            .await;
        rig.controller.toggle_shuffle().await;

        for _ in 0..20 {
            rig.controller.next().await;
            let index = rig.controller.snapshot().await.current_index.unwrap();
            assert!(index < 3);
        }
    }

    #[tokio::test]
    async fn shutdown_clears_session() {
        let rig = rig();
        let mut events = rig.controller.events().subscribe();
        rig.controller.set_queue(vec![audio_track(0)], 0).await;
        rig.controller.play().await;
        rig.controller.shutdown().await;
        settle().await;

        let snapshot = rig.controller.snapshot().await;
        assert_eq!(snapshot.transport, TransportState::Idle);
        assert_eq!(snapshot.queue_length, 0);
        assert_eq!(snapshot.current_index, None);

        let mut saw_session_ended = false;
        while let Ok(event) = events.try_recv() {
            if event.event_type() == "SessionEnded" {
                saw_session_ended = true;
            }
        }
        assert!(saw_session_ended);
    }
}
