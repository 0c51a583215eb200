//! Analysis Layer
//!
//! Background threads around the vision pipeline: the one-shot recognizer
//! setup and the single worker that owns the recognizer and processes the
//! latest frame.

pub mod setup;
pub mod worker;

pub use setup::{run_setup, spawn_setup, RecognizerFactory};
pub use worker::AnalysisWorker;
