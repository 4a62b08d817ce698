//! Playback engine: shared transport state, media handle abstraction,
//! the audio/video bridge, and the session controller that ties them
//! to the queue and mode state.

pub mod bridge;
pub mod controller;
pub mod handle;
pub mod state;

pub use bridge::MediaBridge;
pub use controller::{ControllerPorts, PlayerSnapshot, SessionController};
pub use handle::{BoundHandleEvent, ClockHandle, EventSink, HandleEvent, MediaHandle, PlayAttempt};
pub use state::SharedState;
