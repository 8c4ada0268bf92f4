use crate::{
    config::SmoothingConfig,
    pose_estimation::{PoseReading, PoseSample},
};

/// Exponential smoothing of a single measurement
///
/// `smoothed = retention * smoothed + (1 - retention) * new`. The first
/// accepted value seeds the state directly.
#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    retention: f64,
    max_jump: Option<f64>,
    value: Option<f64>,
}

impl ExponentialSmoother {
    pub fn new(retention: f64) -> Self {
        assert!((0.0..1.0).contains(&retention), "Retention must be in [0, 1)");
        Self {
            retention,
            max_jump: None,
            value: None,
        }
    }

    /// Reject single-step changes larger than `max_jump`
    #[must_use]
    pub fn with_max_jump(mut self, max_jump: f64) -> Self {
        self.max_jump = Some(max_jump);
        self
    }

    /// Feed a measurement; returns `false` if it was rejected as a jump or non-finite
    pub fn update(&mut self, sample: f64) -> bool {
        if !sample.is_finite() {
            log::debug!("Rejected non-finite sample {sample}");
            return false;
        }
        let Some(current) = self.value else {
            self.value = Some(sample);
            return true;
        };

        if let Some(max_jump) = self.max_jump {
            if (sample - current).abs() > max_jump {
                log::debug!("Rejected jump from {current:.1} to {sample:.1}");
                return false;
            }
        }

        self.value = Some(self.retention * current + (1.0 - self.retention) * sample);
        true
    }

    /// Overwrite the state
    pub fn seed(&mut self, value: f64) {
        self.value = Some(value);
    }

    /// Current smoothed value, unset until the first sample
    pub const fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Yaw and roll smoothing with yaw jump rejection
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    yaw: ExponentialSmoother,
    roll: ExponentialSmoother,
}

impl PoseSmoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            yaw: ExponentialSmoother::new(config.yaw_smoothing).with_max_jump(config.max_yaw_jump),
            roll: ExponentialSmoother::new(config.roll_smoothing),
        }
    }

    /// Feed whichever axes were measured this frame
    pub fn update(&mut self, reading: PoseReading) -> Option<PoseSample> {
        if let Some(yaw) = reading.yaw {
            self.yaw.update(yaw);
        }
        if let Some(roll) = reading.roll {
            self.roll.update(roll);
        }
        self.current()
    }

    /// Smoothed pose, once both axes have been seeded
    pub fn current(&self) -> Option<PoseSample> {
        Some(PoseSample {
            yaw: self.yaw.value()?,
            roll: self.roll.value()?,
        })
    }

    pub fn seed(&mut self, sample: PoseSample) {
        self.yaw.seed(sample.yaw);
        self.roll.seed(sample.roll);
    }
}
