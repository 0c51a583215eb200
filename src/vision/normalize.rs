//! Pixel format normalization
//!
//! Turns a raw [`Frame`] into a tightly packed [`DenseImage`]:
//! - planar luma-chroma frames keep only the luma plane (gray is all OCR needs)
//! - packed RGBA/RGB frames become 3-channel RGB
//! - JPEG payloads are decoded
//!
//! The frame's rotation hint is applied last so later stages always see an
//! upright image.

use image::ImageFormat;
use tracing::debug;

use crate::capture::frame::{Frame, PixelFormat, Plane};
use crate::error::{FrameError, Result};
use crate::vision::deskew;
use crate::vision::dense::{Channels, DenseImage};

/// Normalize a frame into an upright dense image
pub fn normalize_frame(frame: &Frame, border_fill: u8) -> Result<DenseImage> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(FrameError::MalformedFrame(format!(
            "frame has zero extent ({}x{})",
            width, height
        )));
    }

    let image = match frame.format() {
        PixelFormat::Yuv420 => luma_from_planar(frame)?,
        PixelFormat::Rgba8888 | PixelFormat::Rgb888 => rgb_from_packed(frame)?,
        PixelFormat::Jpeg => decode_jpeg(frame)?,
        other => return Err(FrameError::UnsupportedFormat(other)),
    };

    debug!(
        "Normalized {:?} frame {}x{} (rotation {})",
        frame.format(),
        width,
        height,
        frame.rotation_degrees()
    );

    Ok(apply_rotation(image, frame.rotation_degrees(), border_fill))
}

/// Rotate clockwise by the frame's rotation hint.
///
/// Multiples of 90 are exact and swap the axes for 90/270. Any other angle
/// goes through the affine corrector and keeps the dimensions.
pub fn apply_rotation(image: DenseImage, degrees: i32, border_fill: u8) -> DenseImage {
    match degrees.rem_euclid(360) {
        0 => image,
        90 => DenseImage::from_dynamic(image.into_dynamic().rotate90()),
        180 => DenseImage::from_dynamic(image.into_dynamic().rotate180()),
        270 => DenseImage::from_dynamic(image.into_dynamic().rotate270()),
        // The corrector's positive angles are counter-clockwise
        other => deskew::rotate(&image, -(other as f64), border_fill),
    }
}

fn first_plane(frame: &Frame) -> Result<&Plane> {
    frame
        .planes()
        .first()
        .ok_or_else(|| FrameError::MalformedFrame("frame has no planes".to_string()))
}

/// Make sure every sample addressed by the stride geometry lies inside the plane
fn check_plane(plane: &Plane, width: u32, height: u32, bytes_per_pixel: usize) -> Result<()> {
    if plane.pixel_stride < bytes_per_pixel {
        return Err(FrameError::MalformedFrame(format!(
            "pixel stride {} is smaller than {} bytes per pixel",
            plane.pixel_stride, bytes_per_pixel
        )));
    }

    let (w, h) = (width as usize, height as usize);
    let row_span = (w - 1) * plane.pixel_stride + bytes_per_pixel;
    if plane.row_stride < row_span && h > 1 {
        return Err(FrameError::MalformedFrame(format!(
            "row stride {} is shorter than a row ({} bytes)",
            plane.row_stride, row_span
        )));
    }

    let required = (h - 1) * plane.row_stride + row_span;
    if plane.data.len() < required {
        return Err(FrameError::MalformedFrame(format!(
            "plane holds {} bytes, geometry needs {}",
            plane.data.len(),
            required
        )));
    }
    Ok(())
}

fn luma_from_planar(frame: &Frame) -> Result<DenseImage> {
    let (width, height) = frame.dimensions();
    let plane = first_plane(frame)?;
    check_plane(plane, width, height, 1)?;

    let w = width as usize;
    let mut data = Vec::with_capacity(w * height as usize);

    for y in 0..height as usize {
        let row = &plane.data[y * plane.row_stride..];
        if plane.pixel_stride == 1 {
            data.extend_from_slice(&row[..w]);
        } else {
            data.extend(row.iter().step_by(plane.pixel_stride).take(w));
        }
    }

    DenseImage::from_raw(width, height, Channels::Gray, data)
        .ok_or_else(|| FrameError::MalformedFrame("luma buffer size mismatch".to_string()))
}

fn rgb_from_packed(frame: &Frame) -> Result<DenseImage> {
    let (width, height) = frame.dimensions();
    let plane = first_plane(frame)?;
    let bytes_per_pixel = match frame.format() {
        PixelFormat::Rgba8888 => 4,
        _ => 3,
    };
    check_plane(plane, width, height, bytes_per_pixel)?;

    let w = width as usize;
    let mut data = Vec::with_capacity(w * height as usize * 3);

    for y in 0..height as usize {
        let row_start = y * plane.row_stride;
        for x in 0..w {
            let idx = row_start + x * plane.pixel_stride;
            // Alpha (if any) is dropped
            data.extend_from_slice(&plane.data[idx..idx + 3]);
        }
    }

    DenseImage::from_raw(width, height, Channels::Rgb, data)
        .ok_or_else(|| FrameError::MalformedFrame("rgb buffer size mismatch".to_string()))
}

fn decode_jpeg(frame: &Frame) -> Result<DenseImage> {
    let plane = first_plane(frame)?;
    let decoded = image::load_from_memory_with_format(&plane.data, ImageFormat::Jpeg)
        .map_err(|e| FrameError::MalformedFrame(format!("JPEG decode failed: {}", e)))?;

    let (width, height) = frame.dimensions();
    if decoded.width() != width || decoded.height() != height {
        return Err(FrameError::MalformedFrame(format!(
            "JPEG payload is {}x{}, frame metadata says {}x{}",
            decoded.width(),
            decoded.height(),
            width,
            height
        )));
    }

    Ok(DenseImage::from_dynamic(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_with_row_padding() {
        // 3x2 luma with 2 bytes of padding per row
        let data = vec![1, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        let frame = Frame::new(3, 2, PixelFormat::Yuv420, vec![Plane::new(data, 5, 1)], 0);

        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.channels(), Channels::Gray);
        assert_eq!(img.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_luma_with_pixel_stride() {
        // Semi-planar style luma: pixel stride 2, row stride 6 (last row unpadded)
        let data = vec![1, 9, 2, 9, 3, 9, 4, 9, 5, 9, 6];
        let frame = Frame::new(3, 2, PixelFormat::Yuv420, vec![Plane::new(data, 6, 2)], 0);

        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_rgba_drops_alpha() {
        let data = vec![10, 20, 30, 255, 40, 50, 60, 255];
        let frame = Frame::new(2, 1, PixelFormat::Rgba8888, vec![Plane::packed(data, 2, 4)], 0);

        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.channels(), Channels::Rgb);
        assert_eq!(img.as_bytes(), &[10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        // 3 wide, 2 tall:
        // 1 2 3
        // 4 5 6
        let frame = Frame::luma(3, 2, vec![1, 2, 3, 4, 5, 6], 90);
        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.dimensions(), frame.upright_dimensions());
        assert_eq!(img.dimensions(), (2, 3));
        // Clockwise: first row becomes the last column
        // 4 1
        // 5 2
        // 6 3
        assert_eq!(img.as_bytes(), &[4, 1, 5, 2, 6, 3]);

        let frame = Frame::luma(3, 2, vec![1, 2, 3, 4, 5, 6], 180);
        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.as_bytes(), &[6, 5, 4, 3, 2, 1]);

        let frame = Frame::luma(3, 2, vec![1, 2, 3, 4, 5, 6], -90);
        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.as_bytes(), &[3, 6, 2, 5, 1, 4]);
    }

    #[test]
    fn test_arbitrary_rotation_keeps_dimensions() {
        let frame = Frame::luma(40, 20, vec![0; 800], 10);
        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.dimensions(), (40, 20));
        assert_eq!(img.dimensions(), frame.upright_dimensions());
    }

    #[test]
    fn test_unsupported_format() {
        let frame = Frame::new(2, 2, PixelFormat::Other(32), vec![Plane::packed(vec![0; 4], 2, 1)], 0);
        let err = normalize_frame(&frame, 255).unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedFormat(PixelFormat::Other(32))));
    }

    #[test]
    fn test_short_plane_is_malformed() {
        let frame = Frame::luma(4, 4, vec![0; 10], 0);
        let err = normalize_frame(&frame, 255).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame(_)));

        let frame = Frame::new(4, 4, PixelFormat::Yuv420, vec![], 0);
        assert!(matches!(
            normalize_frame(&frame, 255).unwrap_err(),
            FrameError::MalformedFrame(_)
        ));
    }

    #[test]
    fn test_jpeg_decode() {
        let source = image::RgbImage::from_pixel(8, 6, image::Rgb([200, 200, 200]));
        let mut buf = std::io::Cursor::new(Vec::new());
        source.write_to(&mut buf, ImageFormat::Jpeg).unwrap();

        let frame = Frame::new(8, 6, PixelFormat::Jpeg, vec![Plane::new(buf.into_inner(), 0, 1)], 0);
        let img = normalize_frame(&frame, 255).unwrap();
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(img.channels(), Channels::Rgb);
    }

    #[test]
    fn test_jpeg_size_mismatch_is_malformed() {
        let source = image::RgbImage::from_pixel(8, 6, image::Rgb([200, 200, 200]));
        let mut buf = std::io::Cursor::new(Vec::new());
        source.write_to(&mut buf, ImageFormat::Jpeg).unwrap();

        let frame = Frame::new(640, 480, PixelFormat::Jpeg, vec![Plane::new(buf.into_inner(), 0, 1)], 0);
        assert!(matches!(
            normalize_frame(&frame, 255).unwrap_err(),
            FrameError::MalformedFrame(_)
        ));
    }

    #[test]
    fn test_rgba_pixel_stride_must_cover_alpha() {
        // Stride 3 would read the next pixel's red as this pixel's alpha
        let data = vec![10, 20, 30, 40, 50, 60];
        let frame = Frame::new(2, 1, PixelFormat::Rgba8888, vec![Plane::new(data, 6, 3)], 0);
        assert!(matches!(
            normalize_frame(&frame, 255).unwrap_err(),
            FrameError::MalformedFrame(_)
        ));

        // Packed RGB at stride 3 is fine
        let data = vec![10, 20, 30, 40, 50, 60];
        let frame = Frame::new(2, 1, PixelFormat::Rgb888, vec![Plane::new(data, 6, 3)], 0);
        assert_eq!(normalize_frame(&frame, 255).unwrap().as_bytes(), &[10, 20, 30, 40, 50, 60]);
    }
}
