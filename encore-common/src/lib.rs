//! # Encore Common Library
//!
//! Shared code for the Encore session player:
//! - Track model and media-kind classifier
//! - Playback mode enums (repeat, view mode, transport state)
//! - Session event types (SessionEvent enum)
//! - EventBus for one-to-many event distribution

pub mod events;
pub mod model;

pub use events::{EventBus, SessionEvent};
pub use model::{classify, MediaKind, RepeatMode, Track, TransportState, ViewMode};
