//! Play queue
//!
//! Owns the ordered track list for one listening/viewing session and
//! the current-position index. Position arithmetic (next/previous
//! under shuffle) lives here; the transport controller decides when to
//! apply it.

use encore_common::Track;
use rand::Rng;
use tracing::debug;

/// Ordered track sequence with a current-position cursor
///
/// Invariant: `current` is a valid index whenever the queue is
/// non-empty, and `None` whenever it is empty.
#[derive(Debug, Default)]
pub struct PlayQueue {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue wholesale
    ///
    /// `start_index` is clamped into `[0, tracks.len())`; an empty
    /// track list leaves the cursor unset.
    pub fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) {
        self.current = if tracks.is_empty() {
            None
        } else {
            Some(start_index.min(tracks.len() - 1))
        };
        self.tracks = tracks;
        debug!(
            track_count = self.tracks.len(),
            current = ?self.current,
            "Queue replaced"
        );
    }

    /// Clear the queue (session teardown)
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    /// Move the cursor to `index`
    ///
    /// Out-of-range indices are silently ignored (stale UI indices are
    /// expected); returns whether the cursor moved.
    pub fn skip_to(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.current = Some(index);
            true
        } else {
            debug!(index, len = self.tracks.len(), "Ignoring out-of-range skip");
            false
        }
    }

    /// Currently selected track, or None when the queue is empty
    pub fn current_track(&self) -> Option<&Track> {
        self.current.map(|i| &self.tracks[i])
    }

    /// Current cursor position
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Compute the index `next()` would move to
    ///
    /// Shuffle draws uniformly from the whole queue and may re-select
    /// the current index (intentional, matches product behavior).
    /// Without shuffle the cursor wraps to 0 past the end regardless of
    /// repeat mode; repeat only decides whether `ended` auto-advances.
    pub fn next_index(&self, shuffle: bool) -> Option<usize> {
        let len = self.tracks.len();
        let current = self.current?;
        if shuffle {
            Some(rand::thread_rng().gen_range(0..len))
        } else {
            Some((current + 1) % len)
        }
    }

    /// Compute the index `previous()` would move to (always wraps)
    pub fn previous_index(&self) -> Option<usize> {
        let len = self.tracks.len();
        let current = self.current?;
        Some(if current == 0 { len - 1 } else { current - 1 })
    }

    /// Whether the cursor sits on the last queue entry
    pub fn at_last_index(&self) -> bool {
        match self.current {
            Some(i) => i + 1 == self.tracks.len(),
            None => false,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
