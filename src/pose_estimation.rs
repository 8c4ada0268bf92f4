//! Geometric head pose estimation from face mesh landmarks.
//!
//! Yaw is a proportional surrogate: the horizontal offset of the nose tip
//! from the midpoint of the outer eye corners, relative to the eye span.
//! Roll is the angle of the line through the outer eye corners. Both are
//! pure functions of a single frame.

use crate::{
    config::PoseConfig,
    constants::{L_EYE_OUT, NOSE_TIP, R_EYE_OUT, ROLL_DX_EPSILON},
    landmarks::LandmarkFrame,
};

/// Yaw and roll in degree-equivalent units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Left/right head turn
    pub yaw: f64,
    /// Ear-to-shoulder tilt, positive when the left ear drops
    pub roll: f64,
}

/// Per-axis estimation result; each axis can fail independently
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseReading {
    /// Yaw, if the eye span was wide enough to be reliable
    pub yaw: Option<f64>,
    /// Roll, if the eye corners were available
    pub roll: Option<f64>,
}

impl PoseReading {
    /// Both axes, if both were measured
    #[must_use]
    pub fn sample(&self) -> Option<PoseSample> {
        Some(PoseSample {
            yaw: self.yaw?,
            roll: self.roll?,
        })
    }
}

/// Head pose estimator working on landmark geometry
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    min_eye_width_px: f64,
    yaw_scale: f64,
    yaw_limit: f64,
}

impl Default for PoseEstimator {
    fn default() -> Self {
        Self::new(&PoseConfig::default())
    }
}

impl PoseEstimator {
    /// Create a new pose estimator
    #[must_use]
    pub fn new(config: &PoseConfig) -> Self {
        Self {
            min_eye_width_px: config.min_eye_width_px,
            yaw_scale: config.yaw_scale,
            yaw_limit: config.yaw_limit,
        }
    }

    /// Estimate both axes
    #[must_use]
    pub fn estimate(&self, frame: &LandmarkFrame) -> PoseReading {
        PoseReading {
            yaw: self.estimate_yaw(frame),
            roll: Self::estimate_roll(frame),
        }
    }

    /// Yaw from the nose offset relative to the eye span
    ///
    /// Returns `None` when the eye span is narrower than the configured
    /// minimum, since the ratio is unreliable for tiny or profile faces.
    #[must_use]
    pub fn estimate_yaw(&self, frame: &LandmarkFrame) -> Option<f64> {
        let left = frame.pixel(L_EYE_OUT)?;
        let right = frame.pixel(R_EYE_OUT)?;
        let nose = frame.pixel(NOSE_TIP)?;

        let eye_width = (right.x - left.x).abs();
        if !eye_width.is_finite() || eye_width < self.min_eye_width_px {
            log::debug!("Eye span {eye_width:.1}px too narrow for yaw");
            return None;
        }

        let eye_center_x = (left.x + right.x) / 2.0;
        let offset = nose.x - eye_center_x;
        let yaw = offset / eye_width * self.yaw_scale;
        if !yaw.is_finite() {
            log::debug!("Non-finite yaw from landmarks, skipping");
            return None;
        }
        Some(yaw.clamp(-self.yaw_limit, self.yaw_limit))
    }

    /// Roll from the slope of the outer eye corner line
    #[must_use]
    pub fn estimate_roll(frame: &LandmarkFrame) -> Option<f64> {
        let left = frame.pixel(L_EYE_OUT)?;
        let right = frame.pixel(R_EYE_OUT)?;

        let dx = right.x - left.x;
        let dy = right.y - left.y;
        if !(dx.is_finite() && dy.is_finite()) {
            return None;
        }
        if dx.abs() < ROLL_DX_EPSILON {
            return Some(0.0);
        }

        Some(-dy.atan2(dx).to_degrees())
    }
}
