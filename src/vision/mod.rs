//! Vision Layer
//!
//! Takes a raw camera frame to a recognition-ready image and through the
//! confidence gate:
//!
//! normalize -> enhance -> (estimate skew -> correct) -> recognize -> gate
//!
//! The fast path skips the skew stages; it is the default because the
//! deskew pair is too expensive for every live preview frame. The accurate
//! path runs everything.

pub mod dense;
pub mod deskew;
pub mod enhance;
pub mod gate;
pub mod normalize;
pub mod recognizer;
pub mod skew;
#[cfg(feature = "tesseract")]
pub mod tesseract;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Instant;

use tracing::debug;

use crate::capture::frame::Frame;
use crate::config::PipelineSettings;
use crate::error::Result;

pub use self::dense::{Channels, DenseImage};
pub use self::gate::{ConfidenceGate, GateDecision};
pub use self::recognizer::{RecognitionResult, Recognizer, RecognizerSession};
pub use self::skew::SkewEstimate;
#[cfg(feature = "tesseract")]
pub use self::tesseract::TesseractRecognizer;

/// Which stages run for each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// normalize -> enhance -> dispatch
    #[default]
    Fast,
    /// normalize -> enhance -> skew -> correct -> dispatch
    Accurate,
}

impl PipelineMode {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        if settings.deskew {
            PipelineMode::Accurate
        } else {
            PipelineMode::Fast
        }
    }
}

/// Recognition-ready image plus what the pipeline learned on the way
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: DenseImage,
    /// Present on the accurate path only
    pub skew: Option<SkewEstimate>,
    /// Time spent preparing the image
    pub preprocess_time_ms: u64,
}

/// Outcome of one frame through the whole pipeline
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub decision: GateDecision,
    pub skew: Option<SkewEstimate>,
    /// Dimensions of the image handed to the recognizer
    pub dimensions: (u32, u32),
    /// Total processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Frame preprocessing and dispatch pipeline
#[derive(Debug, Clone)]
pub struct VisionPipeline {
    settings: PipelineSettings,
    gate: ConfidenceGate,
}

impl VisionPipeline {
    pub fn new(settings: PipelineSettings, gate: ConfidenceGate) -> Self {
        Self { settings, gate }
    }

    pub fn mode(&self) -> PipelineMode {
        PipelineMode::from_settings(&self.settings)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn gate(&self) -> &ConfidenceGate {
        &self.gate
    }

    /// Switch between the fast and accurate paths
    pub fn set_mode(&mut self, mode: PipelineMode) {
        self.settings.deskew = mode == PipelineMode::Accurate;
    }

    /// Run the preprocessing stages on a frame
    pub fn prepare(&self, frame: &Frame) -> Result<PreparedImage> {
        let start = Instant::now();

        let normalized = normalize::normalize_frame(frame, self.settings.border_fill)?;
        let enhanced = enhance::enhance(normalized, &self.settings);

        let (image, skew) = match self.mode() {
            PipelineMode::Fast => (enhanced, None),
            PipelineMode::Accurate => {
                let estimate = skew::estimate_skew(&enhanced, &self.settings);
                let corrected = deskew::correct(&enhanced, &estimate, self.settings.border_fill);
                (corrected, Some(estimate))
            }
        };

        let elapsed = start.elapsed();
        debug!(
            "Prepared {}x{} image ({:?} path) in {:?}",
            image.width(),
            image.height(),
            self.mode(),
            elapsed
        );

        Ok(PreparedImage {
            image,
            skew,
            preprocess_time_ms: elapsed.as_millis() as u64,
        })
    }

    /// Prepare a frame, recognize it and gate the result.
    ///
    /// The frame is consumed; its buffers go back to the source when this
    /// returns, whether it succeeded or not.
    pub fn process(&self, frame: Frame, session: &mut RecognizerSession) -> Result<FrameOutcome> {
        let start = Instant::now();
        let prepared = self.prepare(&frame)?;
        let decision = self.gate.dispatch(session, &prepared.image)?;

        Ok(FrameOutcome {
            decision,
            skew: prepared.skew,
            dimensions: prepared.image.dimensions(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::{PixelFormat, Plane};
    use crate::error::FrameError;
    use crate::vision::test_support::{text_like_luma, ScriptedRecognizer};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ready_session(text: &str, confidence: i32) -> RecognizerSession {
        let (mock, _) = ScriptedRecognizer::new(text, confidence);
        let mut session = RecognizerSession::new(Box::new(mock));
        session.initialize(&PathBuf::from("/data"), "eng").unwrap();
        session
    }

    #[test]
    fn test_default_mode_is_fast() {
        let pipeline = VisionPipeline::new(PipelineSettings::default(), ConfidenceGate::default());
        assert_eq!(pipeline.mode(), PipelineMode::Fast);
    }

    #[test]
    fn test_fast_path_text_frame() {
        let pipeline = VisionPipeline::new(PipelineSettings::default(), ConfidenceGate::default());
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let frame = Frame::luma(640, 480, text_like_luma(640, 480), 0).with_release(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let prepared = pipeline.prepare(&frame).unwrap();
        assert_eq!(prepared.image.dimensions(), (640, 480));
        assert!(prepared.image.is_binary());
        assert!(prepared.skew.is_none());

        let (mock, calls) = ScriptedRecognizer::new("lorem", 55);
        let mut session = RecognizerSession::new(Box::new(mock));
        session.initialize(&PathBuf::from("/data"), "eng").unwrap();

        let outcome = pipeline.process(frame, &mut session).unwrap();
        assert_eq!(outcome.dimensions, (640, 480));
        assert!(outcome.decision.passed());
        assert_eq!(calls.lock().last_size, Some((640, 480)));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_accurate_path_blank_frame() {
        let mut settings = PipelineSettings::default();
        settings.deskew = true;
        let pipeline = VisionPipeline::new(settings, ConfidenceGate::default());
        assert_eq!(pipeline.mode(), PipelineMode::Accurate);

        let frame = Frame::luma(320, 240, vec![0; 320 * 240], 0);
        let mut session = ready_session("", 0);
        let outcome = pipeline.process(frame, &mut session).unwrap();

        let skew = outcome.skew.unwrap();
        assert_eq!(skew.angle, 0.0);
        assert!(!outcome.decision.passed());
    }

    #[test]
    fn test_frame_released_on_error() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let frame = Frame::new(4, 4, PixelFormat::Other(32), vec![Plane::packed(vec![0; 16], 4, 1)], 0)
            .with_release(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let pipeline = VisionPipeline::new(PipelineSettings::default(), ConfidenceGate::default());
        let mut session = ready_session("x", 90);
        let err = pipeline.process(frame, &mut session).unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedFormat(_)));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_uninitialized_recognizer_skips() {
        let pipeline = VisionPipeline::new(PipelineSettings::default(), ConfidenceGate::default());
        let (mock, _) = ScriptedRecognizer::new("x", 90);
        let mut session = RecognizerSession::new(Box::new(mock));
        let frame = Frame::luma(8, 8, vec![255; 64], 0);
        let err = pipeline.process(frame, &mut session).unwrap_err();
        assert!(matches!(err, FrameError::RecognizerUninitialized));
    }

    #[test]
    fn test_set_mode_toggles_deskew() {
        let mut pipeline = VisionPipeline::new(PipelineSettings::default(), ConfidenceGate::default());
        pipeline.set_mode(PipelineMode::Accurate);
        assert!(pipeline.settings().deskew);
        pipeline.set_mode(PipelineMode::Fast);
        assert!(!pipeline.settings().deskew);
    }
}
