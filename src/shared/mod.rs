//! Shared state and messaging between the analysis worker and its host
//!
//! This module provides the runtime statistics the worker publishes and the
//! message types it sends to the display side.

pub mod messages;
pub mod state;

pub use messages::{DisplayUpdate, SetupStatus};
pub use state::{RuntimeState, SharedRuntimeState};
