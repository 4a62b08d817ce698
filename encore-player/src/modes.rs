//! Playback mode settings
//!
//! Shuffle, repeat, and view-mode preference for the session. Only the
//! view mode persists across sessions (stored through the preference
//! port); shuffle and repeat reset to defaults at process start.

use encore_common::{MediaKind, RepeatMode, ViewMode};
use serde::Serialize;

/// Current mode settings
#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct PlayerModes {
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub view_mode: ViewMode,
}

impl PlayerModes {
    /// Flip shuffle; no side effect on the current track
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    /// Advance repeat through off -> all -> one -> off
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycled();
        self.repeat
    }

    /// Resolve the surface the bridge should activate for a track
    pub fn effective_view_mode(&self, track_kind: MediaKind) -> MediaKind {
        self.view_mode.effective(track_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let modes = PlayerModes::default();
        assert!(!modes.shuffle);
        assert_eq!(modes.repeat, RepeatMode::Off);
        assert_eq!(modes.view_mode, ViewMode::Auto);
    }

    #[test]
    fn test_toggle_shuffle() {
        let mut modes = PlayerModes::default();
        assert!(modes.toggle_shuffle());
        assert!(!modes.toggle_shuffle());
    }

    #[test]
    fn test_cycle_repeat_full_loop() {
        let mut modes = PlayerModes::default();
        assert_eq!(modes.cycle_repeat(), RepeatMode::All);
        assert_eq!(modes.cycle_repeat(), RepeatMode::One);
        assert_eq!(modes.cycle_repeat(), RepeatMode::Off);
    }

    #[test]
    fn test_effective_view_mode_override() {
        let mut modes = PlayerModes::default();
        assert_eq!(modes.effective_view_mode(MediaKind::Video), MediaKind::Video);

        modes.view_mode = ViewMode::Audio;
        assert_eq!(modes.effective_view_mode(MediaKind::Video), MediaKind::Audio);
    }
}
