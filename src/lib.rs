//! live-ocr - Live camera OCR core
//!
//! Normalizes raw camera frames, binarizes them, optionally corrects skew,
//! and runs the result through a text recognizer behind a confidence gate.
//! The camera and the display live outside this crate.

pub mod analysis;
pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod shared;
pub mod storage;
pub mod vision;

pub use app::OcrApp;
pub use capture::frame::{Frame, PixelFormat, Plane};
pub use capture::{LatestFrameSlot, OfferOutcome};
pub use config::{AppConfig, PipelineSettings, RecognizerSettings};
pub use error::{FrameError, Result};
pub use shared::{DisplayUpdate, SetupStatus};
pub use vision::{
    ConfidenceGate, DenseImage, GateDecision, PipelineMode, RecognitionResult, Recognizer,
    RecognizerSession, SkewEstimate, VisionPipeline,
};
