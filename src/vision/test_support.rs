//! Shared fixtures for the vision tests

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FrameError, Result};
use crate::vision::dense::{Channels, DenseImage};
use crate::vision::recognizer::Recognizer;
use crate::vision::skew::image_center;

/// White page with a dark `w` x `h` block centered in the frame, tilted
/// clockwise on screen by `tilt` degrees
pub fn tilted_block(width: u32, height: u32, w: f64, h: f64, tilt: f64) -> DenseImage {
    let mut img = DenseImage::filled(width, height, Channels::Gray, 255);
    let (cx, cy) = image_center(width, height);
    let (s, c) = tilt.to_radians().sin_cos();
    for y in 0..height {
        for x in 0..width {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            // Undo the tilt and test against the upright block
            let u = c * dx + s * dy;
            let v = -s * dx + c * dy;
            if u.abs() <= w / 2.0 && v.abs() <= h / 2.0 {
                img.set_sample(x, y, 0, 0);
            }
        }
    }
    img
}

/// Fraction of pixels on the same side of mid-gray in both images
pub fn similarity(a: &DenseImage, b: &DenseImage) -> f64 {
    assert_eq!(a.dimensions(), b.dimensions());
    let same = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .filter(|(&pa, &pb)| (pa >= 128) == (pb >= 128))
        .count();
    same as f64 / a.as_bytes().len() as f64
}

/// Luma buffer: white page with a block of pseudo-random dark strokes
pub fn text_like_luma(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![255u8; (width * height) as usize];
    let mut seed: u32 = 0x1234_5678;
    let (x0, x1) = (width / 5, width * 4 / 5);
    let (y0, y1) = (height / 3, height * 2 / 3);
    for y in y0..y1 {
        for x in x0..x1 {
            // xorshift
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 == 0 {
                data[(y * width + x) as usize] = 0;
            }
        }
    }
    data
}

/// Everything the scripted recognizer was asked to do
#[derive(Debug, Clone, Default)]
pub struct RecognizerCalls {
    pub log: Vec<&'static str>,
    pub clears: usize,
    pub images: usize,
    pub shutdowns: usize,
    pub last_size: Option<(u32, u32)>,
    pub data_path: Option<PathBuf>,
}

/// Recognizer double returning fixed text and confidence
pub struct ScriptedRecognizer {
    text: String,
    confidence: i32,
    fail_init: bool,
    has_image: bool,
    calls: Arc<Mutex<RecognizerCalls>>,
}

impl ScriptedRecognizer {
    pub fn new(text: &str, confidence: i32) -> (Self, Arc<Mutex<RecognizerCalls>>) {
        let calls = Arc::new(Mutex::new(RecognizerCalls::default()));
        (
            Self {
                text: text.to_string(),
                confidence,
                fail_init: false,
                has_image: false,
                calls: calls.clone(),
            },
            calls,
        )
    }

    /// Same as [`new`](Self::new) but records into an existing call log
    pub fn with_calls(text: &str, confidence: i32, calls: Arc<Mutex<RecognizerCalls>>) -> Self {
        let (mut recognizer, _) = Self::new(text, confidence);
        recognizer.calls = calls;
        recognizer
    }

    pub fn failing_init() -> (Self, Arc<Mutex<RecognizerCalls>>) {
        let (mut recognizer, calls) = Self::new("", 0);
        recognizer.fail_init = true;
        (recognizer, calls)
    }
}

impl Recognizer for ScriptedRecognizer {
    fn init(&mut self, data_path: &Path, _language: &str) -> Result<()> {
        let mut calls = self.calls.lock();
        calls.log.push("init");
        calls.data_path = Some(data_path.to_path_buf());
        if self.fail_init {
            return Err(FrameError::Recognition("no language data".to_string()));
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.has_image = false;
        let mut calls = self.calls.lock();
        calls.log.push("clear");
        calls.clears += 1;
    }

    fn set_image(&mut self, image: &DenseImage) -> Result<()> {
        self.has_image = true;
        let mut calls = self.calls.lock();
        calls.log.push("set_image");
        calls.images += 1;
        calls.last_size = Some(image.dimensions());
        Ok(())
    }

    fn text(&mut self) -> Result<String> {
        if !self.has_image {
            return Err(FrameError::Recognition("no image set".to_string()));
        }
        Ok(self.text.clone())
    }

    fn mean_confidence(&mut self) -> i32 {
        if self.has_image {
            self.confidence
        } else {
            0
        }
    }

    fn shutdown(&mut self) {
        let mut calls = self.calls.lock();
        calls.log.push("shutdown");
        calls.shutdowns += 1;
    }
}
