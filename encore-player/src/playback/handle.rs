//! Media handle abstraction.
//!
//! A `MediaHandle` is one playback surface (one audio and one video
//! handle exist per session). The controller never talks to a surface
//! directly; it goes through the [`MediaBridge`](super::MediaBridge),
//! which keeps exactly one handle bound at a time.
//!
//! Handle events carry the binding generation they were emitted under.
//! The controller's event pump drops anything tagged with a superseded
//! generation, so events queued before a rebind can never be applied
//! to the track that came after it.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Event emitted by a playback surface.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleEvent {
    /// Playback position advanced (or jumped after a seek settled).
    TimeUpdate { position_seconds: f64 },
    /// Media duration became known or changed.
    DurationChanged { duration_seconds: f64 },
    /// The loaded media played to its end.
    Ended,
}

/// A handle event tagged with the binding generation it was emitted
/// under.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundHandleEvent {
    pub binding: u64,
    pub event: HandleEvent,
}

/// Sender half handed to a handle on bind. Cloneable so simulated
/// handles can stash it in their tick task.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<BoundHandleEvent>,
    binding: u64,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<BoundHandleEvent>, binding: u64) -> Self {
        Self { tx, binding }
    }

    pub fn binding(&self) -> u64 {
        self.binding
    }

    /// Deliver an event to the controller. Silently drops once the
    /// controller side has shut down.
    pub fn emit(&self, event: HandleEvent) {
        let _ = self.tx.send(BoundHandleEvent {
            binding: self.binding,
            event,
        });
    }
}

/// Outcome of a play request.
///
/// Starting playback is asynchronous on every real surface (browser
/// autoplay policy, codec errors, network stalls), so `play()` returns
/// a receipt the controller awaits off the hot path.
pub struct PlayAttempt {
    rx: oneshot::Receiver<Result<(), String>>,
}

impl PlayAttempt {
    /// Create a pending attempt plus the sender a handle resolves it
    /// with.
    pub fn pending() -> (Self, oneshot::Sender<Result<(), String>>) {
        let (tx, rx) = oneshot::channel();
        (Self { rx }, tx)
    }

    /// An attempt that already succeeded.
    pub fn started() -> Self {
        let (attempt, tx) = Self::pending();
        let _ = tx.send(Ok(()));
        attempt
    }

    /// An attempt that already failed with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        let (attempt, tx) = Self::pending();
        let _ = tx.send(Err(reason.into()));
        attempt
    }

    /// Await the surface's verdict. An abandoned attempt (handle torn
    /// down before resolving) counts as a rejection.
    pub async fn outcome(self) -> Result<(), String> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err("play attempt abandoned by handle".to_string()),
        }
    }
}

/// One playback surface (audio or video).
///
/// Methods are synchronous: implementations either act immediately or
/// queue work on their own runtime. All asynchrony flows back through
/// the bound [`EventSink`] and the [`PlayAttempt`] receipt.
pub trait MediaHandle: Send + Sync {
    /// Replace the loaded source. Resets the surface position to zero
    /// and stops playback until the next [`play`](Self::play).
    fn load(&self, media_url: &str);

    /// Ask the surface to start playing the loaded source.
    fn play(&self) -> PlayAttempt;

    fn pause(&self);

    /// Jump to an absolute position in seconds.
    fn set_position(&self, seconds: f64);

    fn position(&self) -> f64;

    fn duration(&self) -> f64;

    /// Attach the controller's event sink. Replaces any previous sink.
    fn bind(&self, sink: EventSink);

    /// Detach the current sink. Events emitted after unbind are lost.
    fn unbind(&self);
}

/// Simulated playback surface driven by a wall-clock ticker.
///
/// Stands in for a real media element in the daemon and in integration
/// tests: position advances in real time while playing, duration is
/// announced on load, and `Ended` fires when the clock reaches it.
pub struct ClockHandle {
    inner: Mutex<ClockInner>,
    media_duration: f64,
}

struct ClockInner {
    loaded_url: Option<String>,
    playing: bool,
    position: f64,
    duration: f64,
    sink: Option<EventSink>,
}

impl ClockHandle {
    /// Spawn a handle whose loaded media always reports
    /// `media_duration` seconds, ticking every `tick`.
    pub fn spawn(media_duration: f64, tick: Duration) -> Arc<Self> {
        let handle = Arc::new(Self {
            inner: Mutex::new(ClockInner {
                loaded_url: None,
                playing: false,
                position: 0.0,
                duration: 0.0,
                sink: None,
            }),
            media_duration,
        });

        let weak: Weak<Self> = Arc::downgrade(&handle);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(handle) = weak.upgrade() else { break };
                handle.advance(tick.as_secs_f64());
            }
        });

        handle
    }

    fn advance(&self, elapsed: f64) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !inner.playing || inner.loaded_url.is_none() {
            return;
        }

        inner.position += elapsed;
        if inner.duration > 0.0 && inner.position >= inner.duration {
            inner.position = inner.duration;
            inner.playing = false;
            if let Some(sink) = &inner.sink {
                sink.emit(HandleEvent::TimeUpdate {
                    position_seconds: inner.position,
                });
                sink.emit(HandleEvent::Ended);
            }
        } else if let Some(sink) = &inner.sink {
            sink.emit(HandleEvent::TimeUpdate {
                position_seconds: inner.position,
            });
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MediaHandle for ClockHandle {
    fn load(&self, media_url: &str) {
        let mut inner = self.lock();
        debug!(url = media_url, "clock handle loading source");
        // A source change stops playback until the next play(), the
        // same way a media element reacts to a src swap.
        inner.playing = false;
        inner.loaded_url = Some(media_url.to_string());
        inner.position = 0.0;
        inner.duration = self.media_duration;
        if let Some(sink) = &inner.sink {
            sink.emit(HandleEvent::DurationChanged {
                duration_seconds: inner.duration,
            });
        }
    }

    fn play(&self) -> PlayAttempt {
        let mut inner = self.lock();
        if inner.loaded_url.is_none() {
            return PlayAttempt::rejected("no source loaded");
        }
        inner.playing = true;
        PlayAttempt::started()
    }

    fn pause(&self) {
        self.lock().playing = false;
    }

    fn set_position(&self, seconds: f64) {
        let mut inner = self.lock();
        inner.position = if inner.duration > 0.0 {
            seconds.clamp(0.0, inner.duration)
        } else {
            seconds.max(0.0)
        };
    }

    fn position(&self) -> f64 {
        self.lock().position
    }

    fn duration(&self) -> f64 {
        self.lock().duration
    }

    fn bind(&self, sink: EventSink) {
        self.lock().sink = Some(sink);
    }

    fn unbind(&self) {
        self.lock().sink = None;
    }
}
