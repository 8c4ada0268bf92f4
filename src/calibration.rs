//! Interactive five-pose calibration.
//!
//! The user holds each of `neutral`, `left`, `right`, `tilt_left` and
//! `tilt_right` in turn. Every stage first waits for an external ready
//! trigger, then captures pose samples for a fixed window and reduces them
//! to per-axis medians. The calibrator is fed one frame at a time by the
//! sampling loop and never waits on its own, so an absent face only yields
//! a low-confidence stage instead of stalling.

use crate::{
    config::CalibrationConfig,
    filters::median,
    pose_estimation::{PoseReading, PoseSample},
    Error, Result,
};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Poses captured during calibration, in capture order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CalibrationPose {
    Neutral,
    Left,
    Right,
    TiltLeft,
    TiltRight,
}

impl CalibrationPose {
    /// All poses in capture order
    pub const ALL: [Self; 5] = [Self::Neutral, Self::Left, Self::Right, Self::TiltLeft, Self::TiltRight];

    /// Key used in the persisted map
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Left => "left",
            Self::Right => "right",
            Self::TiltLeft => "tilt_left",
            Self::TiltRight => "tilt_right",
        }
    }

    /// Prompt shown to the user while arming
    #[must_use]
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::Neutral => "LOOK STRAIGHT",
            Self::Left => "TURN LEFT",
            Self::Right => "TURN RIGHT",
            Self::TiltLeft => "TILT LEFT EAR DOWN",
            Self::TiltRight => "TILT RIGHT EAR DOWN",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Neutral => 0,
            Self::Left => 1,
            Self::Right => 2,
            Self::TiltLeft => 3,
            Self::TiltRight => 4,
        }
    }
}

impl fmt::Display for CalibrationPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Result of one capture window
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    /// Pose that was captured
    pub pose: CalibrationPose,
    /// Median yaw, or 0.0 when too few samples were collected
    pub yaw: f64,
    /// Median roll, or 0.0 when too few samples were collected
    pub roll: f64,
    /// Yaw samples collected
    pub yaw_samples: usize,
    /// Roll samples collected
    pub roll_samples: usize,
    /// Set when either axis had fewer than the minimum sample count
    pub low_confidence: bool,
}

/// Calibrated neutral pose, per-pose medians and derived control limits
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationProfile {
    poses: [PoseSample; 5],
    /// Largest yaw excursion from neutral
    pub rom_yaw: f64,
    /// Largest roll excursion from neutral
    pub rom_roll: f64,
    /// Yaw deadzone derived from the range of motion
    pub deadzone_yaw: f64,
    /// Roll deadzone derived from the range of motion
    pub deadzone_roll: f64,
}

impl CalibrationProfile {
    /// Build a profile from per-pose medians, deriving range of motion and deadzones
    #[must_use]
    pub fn from_poses(poses: [PoseSample; 5], config: &CalibrationConfig) -> Self {
        let neutral = poses[CalibrationPose::Neutral.index()];
        let left = poses[CalibrationPose::Left.index()];
        let right = poses[CalibrationPose::Right.index()];
        let tilt_left = poses[CalibrationPose::TiltLeft.index()];
        let tilt_right = poses[CalibrationPose::TiltRight.index()];

        let rom_yaw = (right.yaw - neutral.yaw).abs().max((neutral.yaw - left.yaw).abs());
        let rom_roll = (tilt_left.roll - neutral.roll)
            .abs()
            .max((tilt_right.roll - neutral.roll).abs());

        Self {
            poses,
            rom_yaw,
            rom_roll,
            deadzone_yaw: config.deadzone_floor_yaw.max(config.deadzone_fraction * rom_yaw),
            deadzone_roll: config.deadzone_floor_roll.max(config.deadzone_fraction * rom_roll),
        }
    }

    /// Median pose captured for `pose`
    #[must_use]
    pub const fn pose(&self, pose: CalibrationPose) -> PoseSample {
        self.poses[pose.index()]
    }

    /// Neutral head pose
    #[must_use]
    pub const fn neutral(&self) -> PoseSample {
        self.pose(CalibrationPose::Neutral)
    }

    /// Move the neutral pose to `sample`, keeping range of motion and deadzones
    pub fn recenter(&mut self, sample: PoseSample) {
        self.poses[CalibrationPose::Neutral.index()] = sample;
        info!("Recentered: yaw={:.1}°, roll={:.1}°", sample.yaw, sample.roll);
    }

    /// Flat `{pose}_yaw`, `{pose}_roll`, `rom_*`, `deadzone_*` map
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        for pose in CalibrationPose::ALL {
            let sample = self.pose(pose);
            map.insert(format!("{}_yaw", pose.key()), sample.yaw);
            map.insert(format!("{}_roll", pose.key()), sample.roll);
        }
        map.insert("rom_yaw".to_string(), self.rom_yaw);
        map.insert("rom_roll".to_string(), self.rom_roll);
        map.insert("deadzone_yaw".to_string(), self.deadzone_yaw);
        map.insert("deadzone_roll".to_string(), self.deadzone_roll);
        map
    }

    /// Restore a profile from the flat map
    ///
    /// Missing pose values default to 0.0; missing derived values are
    /// recomputed from the poses. Stored deadzones are raised to the
    /// configured floors.
    pub fn from_map(map: &BTreeMap<String, f64>, config: &CalibrationConfig) -> Self {
        let value = |key: String| map.get(&key).copied().unwrap_or(0.0);
        let poses = CalibrationPose::ALL.map(|pose| PoseSample {
            yaw: value(format!("{}_yaw", pose.key())),
            roll: value(format!("{}_roll", pose.key())),
        });

        let mut profile = Self::from_poses(poses, config);
        if let Some(&rom_yaw) = map.get("rom_yaw") {
            profile.rom_yaw = rom_yaw;
        }
        if let Some(&rom_roll) = map.get("rom_roll") {
            profile.rom_roll = rom_roll;
        }
        if let Some(&deadzone_yaw) = map.get("deadzone_yaw") {
            profile.deadzone_yaw = deadzone_yaw.max(config.deadzone_floor_yaw);
        }
        if let Some(&deadzone_roll) = map.get("deadzone_roll") {
            profile.deadzone_roll = deadzone_roll.max(config.deadzone_floor_roll);
        }
        profile
    }

    /// Write the profile as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.to_map())?;
        std::fs::write(path.as_ref(), content)?;
        info!("Calibration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Read a profile written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P, config: &CalibrationConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Calibration(format!("No calibration file at {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        let map: BTreeMap<String, f64> = serde_json::from_str(&content)?;
        info!("Calibration loaded from {}", path.display());
        Ok(Self::from_map(&map, config))
    }
}

/// Whether the controller has a profile to work from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CalibrationState {
    /// No profile; the cursor does not move
    #[default]
    Uncalibrated,
    /// Cursor control is active relative to this profile
    Calibrated(CalibrationProfile),
}

impl CalibrationState {
    #[must_use]
    pub const fn profile(&self) -> Option<&CalibrationProfile> {
        match self {
            Self::Uncalibrated => None,
            Self::Calibrated(profile) => Some(profile),
        }
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }
}

/// What the calibrator did with the latest frame
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationProgress {
    /// Waiting for the ready trigger for this pose
    Arming(CalibrationPose),
    /// Inside a capture window
    Capturing {
        pose: CalibrationPose,
        samples: usize,
        remaining_secs: f64,
    },
    /// A capture window closed; the next stage is arming
    StageComplete(StageResult),
    /// The last stage closed and a profile is ready
    Complete(CalibrationProfile),
}

#[derive(Debug, Clone)]
enum Phase {
    Arming,
    Capturing {
        started_at: f64,
        yaw: Vec<f64>,
        roll: Vec<f64>,
    },
    Done,
}

/// Five-stage calibration session
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    stage: usize,
    phase: Phase,
    results: Vec<StageResult>,
}

impl Calibrator {
    /// Start a session at the neutral stage
    #[must_use]
    pub fn new(config: &CalibrationConfig) -> Self {
        info!("[CALIBRATION] {} - waiting for ready", CalibrationPose::Neutral.instruction());
        Self {
            config: config.clone(),
            stage: 0,
            phase: Phase::Arming,
            results: Vec::with_capacity(CalibrationPose::ALL.len()),
        }
    }

    /// Pose of the current stage, `None` once complete
    #[must_use]
    pub fn current_pose(&self) -> Option<CalibrationPose> {
        match self.phase {
            Phase::Done => None,
            _ => CalibrationPose::ALL.get(self.stage).copied(),
        }
    }

    /// Whether the current stage is inside its capture window
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        matches!(self.phase, Phase::Capturing { .. })
    }

    /// Stages finished so far
    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// External ready trigger: open the capture window for the armed stage
    ///
    /// Ignored unless the current stage is arming.
    pub fn ready(&mut self, now: f64) {
        if let (Phase::Arming, Some(pose)) = (&self.phase, self.current_pose()) {
            info!("[CALIBRATION] Capturing {} for {:.1}s", pose, self.config.capture_secs);
            self.phase = Phase::Capturing {
                started_at: now,
                yaw: Vec::new(),
                roll: Vec::new(),
            };
        }
    }

    /// Feed one frame's reading (default reading when no face was found)
    pub fn feed(&mut self, reading: PoseReading, now: f64) -> CalibrationProgress {
        let Some(pose) = self.current_pose() else {
            return CalibrationProgress::Complete(self.build_profile());
        };

        let Phase::Capturing { started_at, yaw, roll } = &mut self.phase else {
            return CalibrationProgress::Arming(pose);
        };

        let elapsed = now - *started_at;
        if elapsed < self.config.capture_secs {
            if let Some(value) = reading.yaw {
                yaw.push(value);
            }
            if let Some(value) = reading.roll {
                roll.push(value);
            }
            return CalibrationProgress::Capturing {
                pose,
                samples: yaw.len(),
                remaining_secs: self.config.capture_secs - elapsed,
            };
        }

        let result = self.reduce_stage(pose);
        self.results.push(result.clone());
        self.stage += 1;

        match CalibrationPose::ALL.get(self.stage) {
            Some(next) => {
                info!("[CALIBRATION] {} - waiting for ready", next.instruction());
                self.phase = Phase::Arming;
                CalibrationProgress::StageComplete(result)
            }
            None => {
                self.phase = Phase::Done;
                let profile = self.build_profile();
                info!(
                    "[CALIBRATION COMPLETE] neutral yaw={:.1}° roll={:.1}°, ROM yaw={:.1}° roll={:.1}°, deadzone yaw={:.2}° roll={:.2}°",
                    profile.neutral().yaw,
                    profile.neutral().roll,
                    profile.rom_yaw,
                    profile.rom_roll,
                    profile.deadzone_yaw,
                    profile.deadzone_roll
                );
                CalibrationProgress::Complete(profile)
            }
        }
    }

    fn reduce_stage(&self, pose: CalibrationPose) -> StageResult {
        let (yaw, roll) = match &self.phase {
            Phase::Capturing { yaw, roll, .. } => (yaw.as_slice(), roll.as_slice()),
            _ => (&[][..], &[][..]),
        };
        let min = self.config.min_samples;
        let reduce = |samples: &[f64]| {
            if samples.len() < min {
                0.0
            } else {
                median(samples).unwrap_or(0.0)
            }
        };

        let result = StageResult {
            pose,
            yaw: reduce(yaw),
            roll: reduce(roll),
            yaw_samples: yaw.len(),
            roll_samples: roll.len(),
            low_confidence: yaw.len() < min || roll.len() < min,
        };

        if result.low_confidence {
            warn!(
                "[CALIBRATION] {} low confidence: {} yaw, {} roll samples (need {})",
                pose, result.yaw_samples, result.roll_samples, min
            );
        } else {
            info!(
                "[CALIBRATION] {}: yaw={:.1}° roll={:.1}° from {} samples",
                pose, result.yaw, result.roll, result.yaw_samples
            );
        }
        result
    }

    fn build_profile(&self) -> CalibrationProfile {
        let mut poses = [PoseSample { yaw: 0.0, roll: 0.0 }; 5];
        for result in &self.results {
            poses[result.pose.index()] = PoseSample {
                yaw: result.yaw,
                roll: result.roll,
            };
        }
        CalibrationProfile::from_poses(poses, &self.config)
    }
}
