//! Dense pixel buffers used between pipeline stages

use image::{DynamicImage, GrayImage, RgbImage};

/// Channel layout of a [`DenseImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Single channel (grayscale or binary)
    Gray,
    /// Three interleaved channels, R G B
    Rgb,
}

impl Channels {
    /// Bytes per pixel
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }
}

/// Row-major, tightly packed 8-bit image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseImage {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl DenseImage {
    /// Create an image with every sample set to `value`
    pub fn filled(width: u32, height: u32, channels: Channels, value: u8) -> Self {
        let len = width as usize * height as usize * channels.count();
        Self {
            width,
            height,
            channels,
            data: vec![value; len],
        }
    }

    /// Wrap an existing buffer. Returns `None` when the length does not match
    /// `width * height * channels`.
    pub fn from_raw(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_gray(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: Channels::Gray,
            data: image.into_raw(),
        }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: Channels::Rgb,
            data: image.into_raw(),
        }
    }

    /// Convert from a decoded image; single-channel inputs stay gray,
    /// everything else becomes RGB (alpha is dropped)
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray),
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
                Self::from_gray(image.to_luma8())
            }
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        let (width, height) = (self.width, self.height);
        match self.channels {
            Channels::Gray => GrayImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageLuma8)
                .unwrap_or_else(|| DynamicImage::new_luma8(width, height)),
            Channels::Rgb => RgbImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgb8)
                .unwrap_or_else(|| DynamicImage::new_rgb8(width, height)),
        }
    }

    /// Copy out as an `image` gray buffer; `None` for RGB images
    pub fn to_gray_image(&self) -> Option<GrayImage> {
        match self.channels {
            Channels::Gray => GrayImage::from_raw(self.width, self.height, self.data.clone()),
            Channels::Rgb => None,
        }
    }

    /// Copy out as an `image` RGB buffer; `None` for gray images
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        match self.channels {
            Channels::Rgb => RgbImage::from_raw(self.width, self.height, self.data.clone()),
            Channels::Gray => None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at (x, y) for channel `c`
    #[inline]
    pub fn sample(&self, x: u32, y: u32, c: usize) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels.count() + c;
        self.data[idx]
    }

    /// Set the sample at (x, y) for channel `c`
    #[inline]
    pub fn set_sample(&mut self, x: u32, y: u32, c: usize, value: u8) {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels.count() + c;
        self.data[idx] = value;
    }

    /// Whether every sample is either 0 or 255
    pub fn is_binary(&self) -> bool {
        self.data.iter().all(|&v| v == 0 || v == 255)
    }
}
