//! Tesseract recognizer backend (feature `tesseract`)
//!
//! Wraps `leptess`. Images are handed over PNG-encoded, which is what
//! `set_image_from_mem` expects.

use std::path::Path;

use image::ImageFormat;
use leptess::{LepTess, Variable};
use tracing::{debug, info};

use crate::error::{FrameError, Result};
use crate::vision::dense::DenseImage;
use crate::vision::recognizer::Recognizer;

/// Page segmentation mode for a single uniform block of text
const PSM_SINGLE_BLOCK: u32 = 6;

/// Owned Tesseract handle that may move to the worker thread
struct Engine(LepTess);

// SAFETY: the handle is owned by exactly one session and only ever used by
// the thread currently holding it; Tesseract has no thread affinity.
unsafe impl Send for Engine {}

/// [`Recognizer`] backed by a Tesseract instance
pub struct TesseractRecognizer {
    engine: Option<Engine>,
    page_seg_mode: u32,
    has_image: bool,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            engine: None,
            page_seg_mode: PSM_SINGLE_BLOCK,
            has_image: false,
        }
    }

    /// Use another page segmentation mode; applied at `init`
    pub fn with_page_seg_mode(mut self, mode: u32) -> Self {
        self.page_seg_mode = mode;
        self
    }

    pub fn page_seg_mode(&self) -> u32 {
        self.page_seg_mode
    }

    fn engine(&mut self) -> Result<&mut LepTess> {
        self.engine
            .as_mut()
            .map(|engine| &mut engine.0)
            .ok_or(FrameError::RecognizerUninitialized)
    }
}

impl Recognizer for TesseractRecognizer {
    fn init(&mut self, data_path: &Path, language: &str) -> Result<()> {
        let path = data_path.to_str().ok_or_else(|| {
            FrameError::Recognition(format!("data path {:?} is not valid UTF-8", data_path))
        })?;

        let mut engine = LepTess::new(Some(path), language).map_err(|e| {
            FrameError::Recognition(format!(
                "Failed to initialize Tesseract with language '{}': {}",
                language, e
            ))
        })?;
        engine
            .set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode.to_string())
            .map_err(|e| FrameError::Recognition(format!("Failed to set PSM: {}", e)))?;

        info!("Tesseract ready ({}, psm {})", language, self.page_seg_mode);
        self.engine = Some(Engine(engine));
        Ok(())
    }

    fn clear(&mut self) {
        self.has_image = false;
    }

    fn set_image(&mut self, image: &DenseImage) -> Result<()> {
        let mut png = std::io::Cursor::new(Vec::new());
        image
            .clone()
            .into_dynamic()
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| FrameError::Recognition(format!("Failed to encode image to PNG: {}", e)))?;

        self.engine()?
            .set_image_from_mem(png.get_ref())
            .map_err(|e| FrameError::Recognition(format!("Failed to set image: {}", e)))?;
        self.has_image = true;
        debug!("Tesseract image set ({} bytes PNG)", png.get_ref().len());
        Ok(())
    }

    fn text(&mut self) -> Result<String> {
        if !self.has_image {
            return Ok(String::new());
        }
        self.engine()?
            .get_utf8_text()
            .map_err(|e| FrameError::Recognition(format!("Invalid UTF-8 from recognizer: {}", e)))
    }

    fn mean_confidence(&mut self) -> i32 {
        if !self.has_image {
            return 0;
        }
        match self.engine.as_mut() {
            Some(engine) => engine.0.mean_text_conf(),
            None => 0,
        }
    }

    fn shutdown(&mut self) {
        if self.engine.take().is_some() {
            info!("Tesseract released");
        }
        self.has_image = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_seg_mode_defaults_to_single_block() {
        assert_eq!(TesseractRecognizer::new().page_seg_mode(), PSM_SINGLE_BLOCK);
        assert_eq!(TesseractRecognizer::new().with_page_seg_mode(7).page_seg_mode(), 7);
    }

    #[test]
    fn test_uninitialized_engine_reports_error() {
        let mut recognizer = TesseractRecognizer::new();
        let image = DenseImage::filled(4, 4, crate::vision::dense::Channels::Gray, 255);
        assert!(matches!(
            recognizer.set_image(&image),
            Err(FrameError::RecognizerUninitialized)
        ));
        assert_eq!(recognizer.mean_confidence(), 0);
    }
}
