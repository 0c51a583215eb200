//! Frame data structures for camera captures
//!
//! A [`Frame`] owns the plane buffers handed over by the frame source. The
//! buffers go back to the source through the release callback when the frame
//! is dropped, so every exit path out of the pipeline returns them.

use std::fmt;
use std::time::Instant;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar luma-chroma (YUV 4:2:0 family); plane 0 is luma
    Yuv420,
    /// Packed 8-bit RGBA, pixel stride 4
    Rgba8888,
    /// Packed 8-bit RGB, pixel stride 3
    Rgb888,
    /// Compressed JPEG payload in plane 0
    Jpeg,
    /// Any other platform format tag
    Other(i32),
}

impl PixelFormat {
    /// Map an Android `ImageFormat` / `PixelFormat` code onto a format tag
    pub fn from_android_code(code: i32) -> Self {
        match code {
            // YUV_420_888, NV21, YV12
            0x23 | 0x11 | 0x3231_5659 => PixelFormat::Yuv420,
            // RGBA_8888, FLEX_RGBA_8888
            0x1 | 0x2A => PixelFormat::Rgba8888,
            // RGB_888, FLEX_RGB_888
            0x3 | 0x29 => PixelFormat::Rgb888,
            0x100 => PixelFormat::Jpeg,
            other => PixelFormat::Other(other),
        }
    }
}

/// One plane of pixel data as delivered by the frame source
#[derive(Debug, Clone)]
pub struct Plane {
    /// Raw bytes, possibly padded at the end of each row
    pub data: Vec<u8>,
    /// Distance in bytes between the starts of two consecutive rows
    pub row_stride: usize,
    /// Distance in bytes between two horizontally adjacent pixels
    pub pixel_stride: usize,
}

impl Plane {
    /// Create a plane with explicit strides
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Create a tightly packed plane (`row_stride = width * pixel_stride`)
    pub fn packed(data: Vec<u8>, width: u32, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride: width as usize * pixel_stride,
            pixel_stride,
        }
    }
}

/// Callback that hands plane buffers back to the frame source
pub type ReleaseFn = Box<dyn FnOnce(Vec<Plane>) + Send>;

/// A captured camera frame
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    planes: Vec<Plane>,
    /// Clockwise rotation needed to bring the frame upright
    rotation_degrees: i32,
    /// Timestamp when frame was captured
    timestamp: Instant,
    release: Option<ReleaseFn>,
}

impl Frame {
    /// Create a new frame without a release hook
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        planes: Vec<Plane>,
        rotation_degrees: i32,
    ) -> Self {
        Self {
            width,
            height,
            format,
            planes,
            rotation_degrees,
            timestamp: Instant::now(),
            release: None,
        }
    }

    /// Convenience constructor for a tightly packed single-plane luma frame
    pub fn luma(width: u32, height: u32, data: Vec<u8>, rotation_degrees: i32) -> Self {
        Self::new(
            width,
            height,
            PixelFormat::Yuv420,
            vec![Plane::packed(data, width, 1)],
            rotation_degrees,
        )
    }

    /// Attach the callback that returns the buffers to the source's pool
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce(Vec<Plane>) + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// Get frame dimensions as (width, height), before rotation
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.rotation_degrees
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Dimensions after the rotation hint is applied
    pub fn upright_dimensions(&self) -> (u32, u32) {
        match self.rotation_degrees.rem_euclid(360) {
            90 | 270 => (self.height, self.width),
            _ => (self.width, self.height),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .field("rotation_degrees", &self.rotation_degrees)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(std::mem::take(&mut self.planes));
        }
    }
}
