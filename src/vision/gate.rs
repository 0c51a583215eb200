//! Confidence gate in front of the display
//!
//! Low-confidence results are swallowed so the display keeps showing the
//! last good text instead of flickering through garbage on every frame.

use crate::error::Result;
use crate::vision::dense::DenseImage;
use crate::vision::recognizer::{RecognitionResult, RecognizerSession};

/// Default minimum confidence (exclusive) for text to reach the display
pub const DEFAULT_CONFIDENCE_THRESHOLD: i32 = 30;

/// What the gate decided for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Confidence cleared the threshold; the text goes to the display
    Forward(RecognitionResult),
    /// Confidence at or below the threshold; the display is left untouched
    Suppress { confidence: i32 },
}

impl GateDecision {
    pub fn passed(&self) -> bool {
        matches!(self, GateDecision::Forward(_))
    }

    pub fn confidence(&self) -> i32 {
        match self {
            GateDecision::Forward(result) => result.confidence,
            GateDecision::Suppress { confidence } => *confidence,
        }
    }
}

/// Threshold check on the recognizer's mean confidence
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: i32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ConfidenceGate {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Forward only when confidence is strictly above the threshold
    pub fn evaluate(&self, result: RecognitionResult) -> GateDecision {
        if result.confidence > self.threshold {
            GateDecision::Forward(result)
        } else {
            GateDecision::Suppress {
                confidence: result.confidence,
            }
        }
    }

    /// Recognize `image` with the session and gate the result
    pub fn dispatch(&self, session: &mut RecognizerSession, image: &DenseImage) -> Result<GateDecision> {
        let result = session.recognize(image)?;
        Ok(self.evaluate(result))
    }
}
