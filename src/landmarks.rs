//! Landmark frames supplied by the external face mesh detector.
//!
//! Points arrive normalized to `[0, 1]` and are scaled to pixel space on
//! access, so every downstream measurement is in pixels of the source frame.

use crate::{constants::NUM_FACE_MESH_LANDMARKS, Error, Result};
use nalgebra::Point2;

/// One frame of facial landmarks
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Point2<f64>>,
    width: u32,
    height: u32,
}

impl LandmarkFrame {
    /// Create a frame from normalized points and the frame size in pixels
    ///
    /// # Errors
    ///
    /// Returns an error if the frame has a zero dimension or fewer points
    /// than a face mesh provides.
    pub fn new(points: Vec<Point2<f64>>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "Frame size must be non-zero, got {width}x{height}"
            )));
        }
        if points.len() < NUM_FACE_MESH_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected at least {} landmarks, got {}",
                NUM_FACE_MESH_LANDMARKS,
                points.len()
            )));
        }
        Ok(Self { points, width, height })
    }

    /// Create a frame from normalized `(x, y)` pairs
    pub fn from_normalized(points: &[(f64, f64)], width: u32, height: u32) -> Result<Self> {
        Self::new(points.iter().map(|&(x, y)| Point2::new(x, y)).collect(), width, height)
    }

    /// Landmark `index` in pixel coordinates
    #[must_use]
    pub fn pixel(&self, index: usize) -> Option<Point2<f64>> {
        self.points
            .get(index)
            .map(|p| Point2::new(p.x * f64::from(self.width), p.y * f64::from(self.height)))
    }

    /// Landmark `index` in normalized coordinates
    #[must_use]
    pub fn normalized(&self, index: usize) -> Option<Point2<f64>> {
        self.points.get(index).copied()
    }

    /// Pixel distance between two landmarks
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> Option<f64> {
        Some(nalgebra::distance(&self.pixel(a)?, &self.pixel(b)?))
    }

    /// Vertical separation over horizontal separation of a feature
    ///
    /// `epsilon` is added to the horizontal span so a collapsed feature
    /// yields a large ratio rather than a division by zero.
    #[must_use]
    pub fn aspect_ratio(&self, upper: usize, lower: usize, left: usize, right: usize, epsilon: f64) -> Option<f64> {
        let vertical = self.distance(upper, lower)?;
        let horizontal = self.distance(left, right)? + epsilon;
        Some(vertical / horizontal)
    }

    /// Number of landmarks
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the frame has no landmarks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Frame width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> LandmarkFrame {
        LandmarkFrame::new(vec![Point2::new(0.5, 0.5); NUM_FACE_MESH_LANDMARKS], width, height).unwrap()
    }

    #[test]
    fn test_rejects_short_frames() {
        let result = LandmarkFrame::new(vec![Point2::new(0.0, 0.0); 10], 640, 480);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_zero_size() {
        let result = LandmarkFrame::new(vec![Point2::new(0.0, 0.0); NUM_FACE_MESH_LANDMARKS], 0, 480);
        assert!(result.is_err());
    }

    #[test]
    fn test_pixel_scaling() {
        let frame = blank(640, 480);
        let p = frame.pixel(0).unwrap();
        assert_eq!(p, Point2::new(320.0, 240.0));
        assert!(frame.pixel(NUM_FACE_MESH_LANDMARKS).is_none());
    }

    #[test]
    fn test_distance_uses_pixels() {
        let mut points = vec![Point2::new(0.0, 0.0); NUM_FACE_MESH_LANDMARKS];
        points[1] = Point2::new(0.5, 0.0);
        let frame = LandmarkFrame::new(points, 200, 100).unwrap();
        assert!((frame.distance(0, 1).unwrap() - 100.0).abs() < 1e-9);
    }
}
