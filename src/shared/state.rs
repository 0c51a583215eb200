//! Runtime statistics published by the analysis worker

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

use crate::error::FrameError;
use crate::shared::messages::SetupStatus;

/// Handle shared between the worker, the setup thread and the host
pub type SharedRuntimeState = Arc<RwLock<RuntimeState>>;

/// Runtime state (not persisted)
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Recognizer setup progress
    pub setup: SetupStatus,
    /// Frames offered by the frame source
    pub frames_received: u64,
    /// Frames replaced in the slot before the worker got to them
    pub frames_superseded: u64,
    /// Frames that made it through the whole pipeline
    pub frames_processed: u64,
    /// Frames dropped because of a per-frame error or panic
    pub frames_skipped: u64,
    /// Results that cleared the gate
    pub results_forwarded: u64,
    /// Kind and message of the most recent per-frame error
    pub last_error: Option<(String, String)>,
    /// Confidence of the most recent recognized frame
    pub last_confidence: Option<i32>,
    /// Processing time of the most recent frame
    pub last_frame_ms: Option<u64>,
    /// When the worker last finished a frame
    pub last_frame_at: Option<Instant>,
}

impl RuntimeState {
    pub fn shared() -> SharedRuntimeState {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn is_ready(&self) -> bool {
        self.setup.is_ready()
    }

    pub fn record_processed(&mut self, confidence: i32, forwarded: bool, elapsed_ms: u64) {
        self.frames_processed += 1;
        if forwarded {
            self.results_forwarded += 1;
        }
        self.last_confidence = Some(confidence);
        self.last_frame_ms = Some(elapsed_ms);
        self.last_frame_at = Some(Instant::now());
    }

    pub fn record_skipped(&mut self, error: &FrameError) {
        self.record_failure(error.kind(), error.to_string());
    }

    pub fn record_failure(&mut self, kind: &str, message: String) {
        self.frames_skipped += 1;
        self.last_error = Some((kind.to_string(), message));
        self.last_frame_at = Some(Instant::now());
    }
}
