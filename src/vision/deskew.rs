//! Geometric correction (deskew)
//!
//! Rotates an image about its center with `imageproc`'s backward-mapping
//! warp and bilinear interpolation. Output keeps the input dimensions;
//! samples that fall outside the source read as the border color, so the
//! corners exposed by the rotation stay background instead of turning into
//! fake ink.

use image::{Luma, Rgb};
use imageproc::geometric_transformations::{self as geometric, Interpolation};
use tracing::debug;

use crate::vision::dense::DenseImage;
use crate::vision::skew::{image_center, SkewEstimate};

/// Apply a skew estimate. A zero estimate returns the image unchanged.
pub fn correct(image: &DenseImage, estimate: &SkewEstimate, border_fill: u8) -> DenseImage {
    if estimate.is_zero() {
        return image.clone();
    }
    debug!("Deskewing by {:.2} degrees", estimate.angle);
    rotate_about(image, estimate.angle, estimate.center, border_fill)
}

/// Rotate counter-clockwise (on screen) by `angle_degrees` about the image center
pub fn rotate(image: &DenseImage, angle_degrees: f64, border_fill: u8) -> DenseImage {
    let center = image_center(image.width(), image.height());
    rotate_about(image, angle_degrees, center, border_fill)
}

/// Rotate counter-clockwise (on screen) by `angle_degrees` about `center`, at unit scale
pub fn rotate_about(
    image: &DenseImage,
    angle_degrees: f64,
    center: (f64, f64),
    border_fill: u8,
) -> DenseImage {
    if image.is_empty() || angle_degrees == 0.0 {
        return image.clone();
    }

    let center = (center.0 as f32, center.1 as f32);
    // imageproc turns clockwise on screen for positive theta
    let theta = -angle_degrees.to_radians() as f32;

    if let Some(gray) = image.to_gray_image() {
        DenseImage::from_gray(geometric::rotate(
            &gray,
            center,
            theta,
            Interpolation::Bilinear,
            Luma([border_fill]),
        ))
    } else if let Some(rgb) = image.to_rgb_image() {
        DenseImage::from_rgb(geometric::rotate(
            &rgb,
            center,
            theta,
            Interpolation::Bilinear,
            Rgb([border_fill; 3]),
        ))
    } else {
        image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineSettings;
    use crate::vision::dense::Channels;
    use crate::vision::skew::estimate_skew;
    use crate::vision::test_support::{similarity, tilted_block};

    #[test]
    fn test_zero_angle_is_identity() {
        let img = tilted_block(60, 40, 30.0, 10.0, 0.0);
        assert_eq!(rotate(&img, 0.0, 255), img);
        assert_eq!(correct(&img, &SkewEstimate::zero(60, 40), 255), img);
    }

    #[test]
    fn test_border_fill_on_exposed_corners() {
        let black = DenseImage::filled(100, 100, Channels::Gray, 0);
        let rotated = rotate(&black, 30.0, 255);
        assert_eq!(rotated.dimensions(), (100, 100));
        // Corners come from outside the source
        assert_eq!(rotated.sample(0, 0, 0), 255);
        assert_eq!(rotated.sample(99, 99, 0), 255);
        // The middle is still source content
        assert_eq!(rotated.sample(50, 50, 0), 0);
    }

    #[test]
    fn test_rotation_direction() {
        // A single dark dot to the right of center
        let mut img = DenseImage::filled(101, 101, Channels::Gray, 255);
        for y in 48..53 {
            for x in 78..83 {
                img.set_sample(x, y, 0, 0);
            }
        }
        // Counter-clockwise by 90 on screen moves it above the center
        let rotated = rotate(&img, 90.0, 255);
        assert_eq!(rotated.sample(50, 20, 0), 0);
        assert_eq!(rotated.sample(80, 50, 0), 255);
    }

    #[test]
    fn test_rgb_rotation_fills_border_per_channel() {
        let img = DenseImage::filled(40, 40, Channels::Rgb, 0);
        let rotated = rotate(&img, 45.0, 200);
        assert_eq!(rotated.sample(0, 0, 0), 200);
        assert_eq!(rotated.sample(0, 0, 2), 200);
        assert_eq!(rotated.sample(20, 20, 1), 0);
    }

    #[test]
    fn test_rgb_rotation_keeps_channels() {
        let img = DenseImage::filled(20, 10, Channels::Rgb, 90);
        let rotated = rotate(&img, 12.0, 255);
        assert_eq!(rotated.channels(), Channels::Rgb);
        assert_eq!(rotated.as_bytes().len(), 20 * 10 * 3);
        assert_eq!(rotated.sample(10, 5, 2), 90);
    }

    #[test]
    fn test_deskew_reconstructs_upright() {
        let settings = PipelineSettings::default();
        let upright = tilted_block(320, 240, 180.0, 60.0, 0.0);

        for &tilt in &[-25.0, -8.0, 6.0, 33.0] {
            let tilted = tilted_block(320, 240, 180.0, 60.0, tilt);
            let estimate = estimate_skew(&tilted, &settings);
            let corrected = correct(&tilted, &estimate, 255);

            assert_eq!(corrected.dimensions(), upright.dimensions());
            let score = similarity(&corrected, &upright);
            assert!(score > 0.97, "tilt {}: similarity {}", tilt, score);
            // Without correction the tilted block is clearly off
            assert!(similarity(&tilted, &upright) < score);
        }
    }
}
