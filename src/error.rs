//! Per-frame error taxonomy
//!
//! Every variant here is recoverable at the worker boundary: the frame that
//! produced it is dropped and the worker keeps running.

use thiserror::Error;

use crate::capture::frame::PixelFormat;

/// Errors raised while taking a single frame through the pipeline
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Recognizer is not initialized")]
    RecognizerUninitialized,

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl FrameError {
    /// Short machine-friendly label used in logs and runtime stats
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::UnsupportedFormat(_) => "unsupported_format",
            FrameError::MalformedFrame(_) => "malformed_frame",
            FrameError::DegenerateGeometry(_) => "degenerate_geometry",
            FrameError::RecognizerUninitialized => "recognizer_uninitialized",
            FrameError::Recognition(_) => "recognition",
            FrameError::Io(_) => "io",
        }
    }
}
