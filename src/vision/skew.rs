//! Skew estimation
//!
//! Finds how far the dominant text mass is rotated away from upright:
//!
//! 1. global threshold and invert, so dark text becomes foreground
//! 2. erode with a small square element to knock out specks
//! 3. collect the foreground pixel coordinates
//! 4. fit the minimum-area rotated rectangle (convex hull + rotating calipers)
//! 5. fold the rectangle's angle into a signed deskew angle in (-45, 45]
//!
//! Angles follow the corrector's convention: positive means the text is
//! tilted clockwise on screen and is undone by a counter-clockwise rotation.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::geometry::convex_hull;
use imageproc::morphology::erode;
use imageproc::point::Point;
use tracing::debug;

use crate::config::PipelineSettings;
use crate::error::{FrameError, Result};
use crate::vision::dense::DenseImage;
use crate::vision::enhance::to_grayscale;

/// Estimated rotation of the text mass in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct SkewEstimate {
    /// Deskew angle in degrees, in (-45, 45]
    pub angle: f64,
    /// Rotation center (image midpoint)
    pub center: (f64, f64),
    /// Corners of the fitted rectangle, empty for a degenerate foreground
    pub corners: Vec<(f64, f64)>,
    /// Number of foreground pixels that survived erosion
    pub foreground_pixels: usize,
}

impl SkewEstimate {
    /// Zero-angle estimate for a frame of the given size
    pub fn zero(width: u32, height: u32) -> Self {
        Self {
            angle: 0.0,
            center: image_center(width, height),
            corners: Vec::new(),
            foreground_pixels: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.angle == 0.0
    }
}

/// Minimum-area rectangle enclosing a point set
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedRect {
    pub center: (f64, f64),
    /// Extent along the edge the rectangle was fitted to
    pub width: f64,
    /// Extent perpendicular to that edge
    pub height: f64,
    /// Native angle in [-90, 0), measured counter-clockwise from the x axis
    /// with y pointing up
    pub angle: f64,
    pub corners: [(f64, f64); 4],
}

impl RotatedRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Integer midpoint of the image, used as the rotation center
pub fn image_center(width: u32, height: u32) -> (f64, f64) {
    ((width / 2) as f64, (height / 2) as f64)
}

/// Estimate the skew of a binarized image.
///
/// An empty or single-pixel foreground has no defined rectangle; it yields a
/// zero-angle estimate instead of an error.
pub fn estimate_skew(binary: &DenseImage, settings: &PipelineSettings) -> SkewEstimate {
    let (width, height) = binary.dimensions();
    let gray = to_grayscale(binary.clone());
    let Some(gray) = gray.to_gray_image() else {
        return SkewEstimate::zero(width, height);
    };

    let mask = foreground_mask(&gray, settings.skew_threshold);
    let mask = erode_mask(mask, settings.erode_kernel);
    let points = foreground_points(&mask);

    match min_area_rect(&points) {
        Ok(rect) => {
            let angle = deskew_angle(rect.angle);
            debug!(
                "Skew fit over {} px: native {:.2}, deskew {:.2} ({:.0}x{:.0})",
                points.len(),
                rect.angle,
                angle,
                rect.width,
                rect.height
            );
            SkewEstimate {
                angle,
                center: image_center(width, height),
                corners: rect.corners.to_vec(),
                foreground_pixels: points.len(),
            }
        }
        Err(e) => {
            debug!("Skipping skew fit: {}", e);
            SkewEstimate {
                foreground_pixels: points.len(),
                ..SkewEstimate::zero(width, height)
            }
        }
    }
}

/// Fold the rectangle's native angle into the deskew range (-45, 45]
pub fn deskew_angle(native: f64) -> f64 {
    let angle = if native < -45.0 { -(native + 90.0) } else { -native };
    // Avoid handing out -0.0 or float dust for axis-aligned boxes
    if angle.abs() < 1e-9 {
        0.0
    } else {
        angle
    }
}

/// Threshold at `threshold` and invert: pixels at or below it become 255
pub fn foreground_mask(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Luma([if v > threshold { 0 } else { 255 }])
    })
}

/// Erode with a square structuring element of side `kernel`
pub fn erode_mask(mask: GrayImage, kernel: u32) -> GrayImage {
    let radius = (kernel / 2).min(u8::MAX as u32) as u8;
    if radius == 0 {
        return mask;
    }
    erode(&mask, Norm::LInf, radius)
}

/// Coordinates of all non-zero pixels
pub fn foreground_points(mask: &GrayImage) -> Vec<Point<i32>> {
    mask.enumerate_pixels()
        .filter(|(_, _, p)| p[0] != 0)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect()
}

/// Fit the minimum-area rotated rectangle around `points`
pub fn min_area_rect(points: &[Point<i32>]) -> Result<RotatedRect> {
    let Some(first) = points.first() else {
        return Err(FrameError::DegenerateGeometry("no foreground pixels".to_string()));
    };
    if points.iter().all(|p| p == first) {
        return Err(FrameError::DegenerateGeometry("single foreground point".to_string()));
    }

    let hull: Vec<(f64, f64)> = convex_hull(points)
        .into_iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect();
    if hull.len() < 2 {
        return Err(FrameError::DegenerateGeometry(format!(
            "convex hull has {} vertices",
            hull.len()
        )));
    }

    // Rotating calipers: the optimal box has one side flush with a hull edge
    let mut best: Option<(f64, [f64; 6])> = None;
    for i in 0..hull.len() {
        let (px, py) = hull[i];
        let (qx, qy) = hull[(i + 1) % hull.len()];
        let len = (qx - px).hypot(qy - py);
        if len == 0.0 {
            continue;
        }
        let (ux, uy) = ((qx - px) / len, (qy - py) / len);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(hx, hy) in &hull {
            let u = hx * ux + hy * uy;
            let v = -hx * uy + hy * ux;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.as_ref().map_or(true, |(a, _)| area < *a) {
            best = Some((area, [ux, uy, min_u, max_u, min_v, max_v]));
        }
    }

    let Some((_, [ux, uy, min_u, max_u, min_v, max_v])) = best else {
        return Err(FrameError::DegenerateGeometry("hull has no usable edge".to_string()));
    };

    let to_xy = |u: f64, v: f64| (u * ux - v * uy, u * uy + v * ux);
    let corners = [
        to_xy(min_u, min_v),
        to_xy(max_u, min_v),
        to_xy(max_u, max_v),
        to_xy(min_u, max_v),
    ];
    let center = to_xy((min_u + max_u) * 0.5, (min_v + max_v) * 0.5);

    // Edge direction with y flipped to point up, folded into [-90, 0)
    let edge_deg = (-uy).atan2(ux).to_degrees();
    let angle = edge_deg.rem_euclid(90.0) - 90.0;

    Ok(RotatedRect {
        center,
        width: max_u - min_u,
        height: max_v - min_v,
        angle,
        corners,
    })
}
