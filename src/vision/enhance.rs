//! Photometric enhancement ahead of recognition
//!
//! Converts to grayscale and binarizes with a Gaussian-weighted adaptive
//! threshold. A single global threshold does not survive uneven lighting on a
//! hand-held camera, a local one does.

use tracing::debug;

use crate::config::PipelineSettings;
use crate::vision::dense::{Channels, DenseImage};

/// Grayscale + adaptive threshold using the configured window and offset
pub fn enhance(image: DenseImage, settings: &PipelineSettings) -> DenseImage {
    let gray = to_grayscale(image);
    let binary = adaptive_threshold(&gray, settings.adaptive_block_size, settings.adaptive_offset);
    debug!(
        "Adaptive threshold {}x{} (block {}, offset {})",
        binary.width(),
        binary.height(),
        settings.adaptive_block_size,
        settings.adaptive_offset
    );
    binary
}

/// Convert RGB to single-channel luma; gray input is returned as-is
pub fn to_grayscale(image: DenseImage) -> DenseImage {
    if image.channels() == Channels::Gray {
        return image;
    }

    let (width, height) = image.dimensions();
    let gray: Vec<u8> = image
        .as_bytes()
        .chunks_exact(3)
        .map(|px| {
            // Standard luminance weights
            let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            luma.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    DenseImage::from_raw(width, height, Channels::Gray, gray)
        .unwrap_or_else(|| DenseImage::filled(width, height, Channels::Gray, 0))
}

/// Normalized 1-D Gaussian kernel for an odd window size.
///
/// Sigma follows the usual size-derived rule `0.3 * ((size - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) | 1;
    let radius = (size / 2) as i32;
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur with replicated borders, rounded back to `u8`
fn gaussian_mean(gray: &DenseImage, block_size: u32) -> Vec<u8> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let kernel = gaussian_kernel(block_size);
    let radius = (kernel.len() / 2) as isize;
    let src = gray.as_bytes();

    // Horizontal pass
    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * w + x] = acc;
        }
    }

    // Vertical pass
    let mut mean = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                acc += horizontal[sy * w + x] * weight;
            }
            mean[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    mean
}

/// Binarize against the Gaussian-weighted local mean minus `offset`.
///
/// A pixel becomes 255 when `pixel > mean - offset`, otherwise 0.
pub fn adaptive_threshold(gray: &DenseImage, block_size: u32, offset: i32) -> DenseImage {
    let gray = if gray.channels() == Channels::Gray {
        std::borrow::Cow::Borrowed(gray)
    } else {
        std::borrow::Cow::Owned(to_grayscale(gray.clone()))
    };

    let (width, height) = gray.dimensions();
    if gray.is_empty() {
        return DenseImage::filled(width, height, Channels::Gray, 0);
    }

    let mean = gaussian_mean(&gray, block_size);
    let binary: Vec<u8> = gray
        .as_bytes()
        .iter()
        .zip(mean.iter())
        .map(|(&px, &m)| {
            if px as i32 - m as i32 > -offset {
                255
            } else {
                0
            }
        })
        .collect();

    DenseImage::from_raw(width, height, Channels::Gray, binary)
        .unwrap_or_else(|| DenseImage::filled(width, height, Channels::Gray, 0))
}
