//! Recognizer capability
//!
//! The text recognition engine is external. The pipeline only talks to it
//! through [`Recognizer`], and only through a [`RecognizerSession`], which
//! owns the engine, tracks whether it was initialized, and guarantees that
//! `shutdown` runs exactly once.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{FrameError, Result};
use crate::vision::dense::DenseImage;

/// Text and confidence read back from the recognizer for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Recognized UTF-8 text, possibly empty
    pub text: String,
    /// Mean confidence in [0, 100]
    pub confidence: i32,
}

/// Narrow interface onto a stateful, long-lived text recognition engine.
///
/// Implementations are not expected to be thread-safe; a session is only
/// ever driven from one worker.
pub trait Recognizer: Send {
    /// Load language data from `data_path`, the directory holding `<language>.traineddata`
    fn init(&mut self, data_path: &Path, language: &str) -> Result<()>;

    /// Drop any state left over from the previous image
    fn clear(&mut self);

    /// Supply the next image to recognize
    fn set_image(&mut self, image: &DenseImage) -> Result<()>;

    /// Recognized text for the current image
    fn text(&mut self) -> Result<String>;

    /// Mean confidence for the current image, 0-100
    fn mean_confidence(&mut self) -> i32;

    /// Release native resources
    fn shutdown(&mut self);
}

/// Owning handle around a recognizer
pub struct RecognizerSession {
    recognizer: Box<dyn Recognizer>,
    initialized: bool,
    shut_down: bool,
}

impl RecognizerSession {
    pub fn new(recognizer: Box<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            initialized: false,
            shut_down: false,
        }
    }

    /// Initialize the engine. On failure the engine is shut down and the
    /// session stays unusable.
    pub fn initialize(&mut self, data_path: &Path, language: &str) -> Result<()> {
        if self.shut_down {
            return Err(FrameError::RecognizerUninitialized);
        }
        if self.initialized {
            return Ok(());
        }

        match self.recognizer.init(data_path, language) {
            Ok(()) => {
                info!("Recognizer initialized ({}) from {:?}", language, data_path);
                self.initialized = true;
                Ok(())
            }
            Err(e) => {
                warn!("Recognizer init failed: {}", e);
                self.release();
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.initialized && !self.shut_down
    }

    /// Run one image through the engine, clearing prior state first
    pub fn recognize(&mut self, image: &DenseImage) -> Result<RecognitionResult> {
        if !self.is_ready() {
            return Err(FrameError::RecognizerUninitialized);
        }

        self.recognizer.clear();
        self.recognizer.set_image(image)?;
        let confidence = self.recognizer.mean_confidence().clamp(0, 100);
        let text = self.recognizer.text()?;

        debug!("Recognized {} chars at confidence {}", text.len(), confidence);
        Ok(RecognitionResult { text, confidence })
    }

    /// Shut the engine down now instead of on drop
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.shut_down {
            self.recognizer.shutdown();
            self.shut_down = true;
            self.initialized = false;
        }
    }
}

impl Drop for RecognizerSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::dense::Channels;
    use crate::vision::test_support::{RecognizerCalls, ScriptedRecognizer};
    use std::path::PathBuf;

    fn image() -> DenseImage {
        DenseImage::filled(8, 8, Channels::Gray, 255)
    }

    #[test]
    fn test_recognize_requires_init() {
        let (mock, _calls) = ScriptedRecognizer::new("hello", 80);
        let mut session = RecognizerSession::new(Box::new(mock));
        let err = session.recognize(&image()).unwrap_err();
        assert!(matches!(err, FrameError::RecognizerUninitialized));
    }

    #[test]
    fn test_clear_before_each_image() {
        let (mock, calls) = ScriptedRecognizer::new("hello", 80);
        let mut session = RecognizerSession::new(Box::new(mock));
        session.initialize(&PathBuf::from("/data"), "eng").unwrap();

        let result = session.recognize(&image()).unwrap();
        assert_eq!(result.text, "hello");
        assert_eq!(result.confidence, 80);
        session.recognize(&image()).unwrap();

        let calls = calls.lock();
        assert_eq!(calls.clears, 2);
        assert_eq!(calls.images, 2);
        assert_eq!(calls.log, vec!["init", "clear", "set_image", "clear", "set_image"]);
    }

    #[test]
    fn test_shutdown_exactly_once() {
        let (mock, calls) = ScriptedRecognizer::new("x", 50);
        let mut session = RecognizerSession::new(Box::new(mock));
        session.initialize(&PathBuf::from("/data"), "eng").unwrap();
        session.shutdown();
        assert_eq!(calls.lock().shutdowns, 1);

        let (mock, calls) = ScriptedRecognizer::new("x", 50);
        drop(RecognizerSession::new(Box::new(mock)));
        assert_eq!(calls.lock().shutdowns, 1);
    }

    #[test]
    fn test_failed_init_releases_engine() {
        let (mock, calls) = ScriptedRecognizer::failing_init();
        let mut session = RecognizerSession::new(Box::new(mock));
        assert!(session.initialize(&PathBuf::from("/data"), "eng").is_err());
        assert!(!session.is_ready());
        drop(session);

        let calls: RecognizerCalls = calls.lock().clone();
        assert_eq!(calls.shutdowns, 1);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let (mock, _calls) = ScriptedRecognizer::new("x", 140);
        let mut session = RecognizerSession::new(Box::new(mock));
        session.initialize(&PathBuf::from("/data"), "eng").unwrap();
        assert_eq!(session.recognize(&image()).unwrap().confidence, 100);
    }
}
