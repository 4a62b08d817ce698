//! Encore Session Player library
//!
//! Exposes the session playback controller and its collaborator ports
//! for use by the daemon binary and integration tests.

pub mod analytics;
pub mod api;
pub mod db;
pub mod error;
pub mod modes;
pub mod playback;
pub mod queue;
pub mod resolver;

pub use error::{Error, Result};
pub use playback::controller::SessionController;
