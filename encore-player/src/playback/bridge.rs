//! Bridge between the controller and the two playback surfaces.
//!
//! A session owns exactly one audio handle and one video handle. At
//! most one of them is bound at any time; `rebind` pauses and detaches
//! the previously bound surface, bumps the binding generation, and
//! attaches the controller's sink to the surface for the new track.

use encore_common::MediaKind;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::handle::{BoundHandleEvent, EventSink, MediaHandle};

pub struct MediaBridge {
    audio: Arc<dyn MediaHandle>,
    video: Arc<dyn MediaHandle>,
    active: MediaKind,
    binding: u64,
    events_tx: mpsc::UnboundedSender<BoundHandleEvent>,
}

impl MediaBridge {
    /// Build a bridge over the two surfaces. Returns the receiver the
    /// controller's event pump drains. The audio surface starts bound.
    pub fn new(
        audio: Arc<dyn MediaHandle>,
        video: Arc<dyn MediaHandle>,
    ) -> (Self, mpsc::UnboundedReceiver<BoundHandleEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            audio,
            video,
            active: MediaKind::Audio,
            binding: 1,
            events_tx,
        };
        bridge
            .handle_for(MediaKind::Audio)
            .bind(EventSink::new(bridge.events_tx.clone(), bridge.binding));
        (bridge, events_rx)
    }

    pub fn active_kind(&self) -> MediaKind {
        self.active
    }

    /// Generation of the current binding. The event pump compares
    /// incoming events against this before applying them.
    pub fn binding(&self) -> u64 {
        self.binding
    }

    pub fn active_handle(&self) -> &Arc<dyn MediaHandle> {
        self.handle_for(self.active)
    }

    fn handle_for(&self, kind: MediaKind) -> &Arc<dyn MediaHandle> {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    /// Move the binding to the surface for `kind`.
    ///
    /// Always bumps the generation, even when the surface itself is
    /// unchanged: a rebind marks a track boundary, and events emitted
    /// under the old generation must not leak across it. Returns true
    /// when the active surface switched.
    pub fn rebind(&mut self, kind: MediaKind) -> bool {
        let switched = kind != self.active;

        let previous = self.handle_for(self.active);
        previous.unbind();
        if switched {
            previous.pause();
        }

        self.active = kind;
        self.binding += 1;
        self.handle_for(kind)
            .bind(EventSink::new(self.events_tx.clone(), self.binding));

        debug!(
            surface = %kind,
            binding = self.binding,
            switched,
            "rebound media surface"
        );
        switched
    }

    /// Detach whichever surface is bound and stop it. Used at session
    /// teardown; the generation bump orphans any in-flight events.
    pub fn shutdown(&mut self) {
        let active = self.handle_for(self.active);
        active.pause();
        active.unbind();
        self.binding += 1;
    }
}
