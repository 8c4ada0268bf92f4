//! Configuration management for the head gesture controller

use crate::{
    constants::{DEFAULT_CALIBRATION_FILE, DEFAULT_WS_HOST, DEFAULT_WS_PORT},
    cursor_control::{ControlParams, ParamLimits},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebSocket broadcaster configuration
    pub server: ServerConfig,

    /// Velocity controller configuration
    pub control: ControlConfig,

    /// Pose smoothing configuration
    pub smoothing: SmoothingConfig,

    /// Pose estimation configuration
    pub pose: PoseConfig,

    /// Calibration configuration
    pub calibration: CalibrationConfig,

    /// Gesture detection configuration
    pub gestures: GestureConfig,

    /// Landmark input configuration
    pub input: InputConfig,
}

/// WebSocket broadcaster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Interval between periodic cursor updates in milliseconds
    pub update_interval_ms: u64,

    /// Messages queued per consumer before it is considered too slow
    pub consumer_queue: usize,
}

/// Velocity controller settings and runtime adjustment limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Horizontal speed cap (px/s)
    pub vmax_x: f64,

    /// Vertical speed cap (px/s)
    pub vmax_y: f64,

    /// Yaw deadzone (degrees)
    pub deadzone_yaw: f64,

    /// Roll deadzone (degrees)
    pub deadzone_roll: f64,

    /// Hysteresis band above the deadzone (degrees)
    pub hysteresis_deg: f64,

    /// Velocity slew time constant (seconds)
    pub tau_vel: f64,

    /// Turn the head left to move the cursor right
    pub invert_x: bool,

    /// Lower bound for runtime speed adjustment
    pub vmax_min: f64,

    /// Upper bound for runtime speed adjustment
    pub vmax_max: f64,

    /// Speed adjustment step
    pub vmax_step: f64,

    /// Lower bound for runtime deadzone adjustment
    pub deadzone_min: f64,

    /// Upper bound for runtime deadzone adjustment
    pub deadzone_max: f64,

    /// Deadzone adjustment step
    pub deadzone_step: f64,
}

/// Exponential smoothing of raw pose measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of the previous yaw value (0-1, higher = smoother)
    pub yaw_smoothing: f64,

    /// Weight of the previous roll value (0-1, higher = smoother)
    pub roll_smoothing: f64,

    /// Yaw jumps larger than this are rejected as spurious
    pub max_yaw_jump: f64,
}

/// Geometric pose estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Eye spans narrower than this (pixels) give no yaw
    pub min_eye_width_px: f64,

    /// Scale from nose offset / eye width to yaw units
    pub yaw_scale: f64,

    /// Yaw output is clipped to +/- this value
    pub yaw_limit: f64,
}

/// Calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Length of each capture window (seconds)
    pub capture_secs: f64,

    /// Samples per axis below which a stage is low confidence
    pub min_samples: usize,

    /// Smallest allowed yaw deadzone
    pub deadzone_floor_yaw: f64,

    /// Smallest allowed roll deadzone
    pub deadzone_floor_roll: f64,

    /// Deadzone as a fraction of range of motion
    pub deadzone_fraction: f64,

    /// Calibration file used by save/load
    pub file: PathBuf,
}

/// Gesture detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Mouth aspect ratio above which the mouth is open
    pub mouth_open_threshold: f64,

    /// Minimum seconds between fired select/click events
    pub select_click_cooldown: f64,

    /// Vertical cursor percentage at or beyond which a mouth gesture clicks
    pub click_zone_pct: f64,

    /// Frames used to learn the neutral brow distance
    pub brow_baseline_frames: usize,

    /// Relative increase over baseline that counts as raised
    pub brow_up_factor: f64,

    /// Seconds the brow must stay raised before delete fires
    pub brow_hold_secs: f64,

    /// Eye aspect ratio below which an eye is closed
    pub blink_ear_threshold: f64,

    /// Consecutive closed frames before an eye counts as blinking
    pub blink_min_frames: u32,

    /// Window in which three blinks cycle the mode (seconds)
    pub triple_blink_window: f64,

    /// How long the triple-blink flag stays raised (seconds)
    pub triple_blink_hold: f64,
}

/// Landmark input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Pause after a transient read failure (milliseconds)
    pub retry_backoff_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WS_HOST.to_string(),
            port: DEFAULT_WS_PORT,
            update_interval_ms: 30,
            consumer_queue: 64,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            vmax_x: 300.0,
            vmax_y: 300.0,
            deadzone_yaw: 10.0,
            deadzone_roll: 10.0,
            hysteresis_deg: 1.0,
            tau_vel: 0.18,
            invert_x: true,
            vmax_min: 100.0,
            vmax_max: 2000.0,
            vmax_step: 50.0,
            deadzone_min: 1.0,
            deadzone_max: 30.0,
            deadzone_step: 1.0,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            yaw_smoothing: 0.7,
            roll_smoothing: 0.5,
            max_yaw_jump: 60.0,
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            min_eye_width_px: 10.0,
            yaw_scale: 50.0,
            yaw_limit: 60.0,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            capture_secs: 1.5,
            min_samples: 5,
            deadzone_floor_yaw: 5.0,
            deadzone_floor_roll: 5.0,
            deadzone_fraction: 0.15,
            file: PathBuf::from(DEFAULT_CALIBRATION_FILE),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            mouth_open_threshold: 0.38,
            select_click_cooldown: 0.5,
            click_zone_pct: 85.0,
            brow_baseline_frames: 60,
            brow_up_factor: 0.12,
            brow_hold_secs: 0.4,
            blink_ear_threshold: 0.22,
            blink_min_frames: 1,
            triple_blink_window: 1.2,
            triple_blink_hold: 0.2,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { retry_backoff_ms: 100 }
    }
}

impl ControlConfig {
    /// Initial controller parameters
    #[must_use]
    pub const fn params(&self) -> ControlParams {
        ControlParams {
            vmax_x: self.vmax_x,
            vmax_y: self.vmax_y,
            deadzone_yaw: self.deadzone_yaw,
            deadzone_roll: self.deadzone_roll,
            hysteresis_deg: self.hysteresis_deg,
            tau_vel: self.tau_vel,
        }
    }

    /// Bounds applied to runtime adjustments
    #[must_use]
    pub const fn limits(&self) -> ParamLimits {
        ParamLimits {
            vmax_min: self.vmax_min,
            vmax_max: self.vmax_max,
            vmax_step: self.vmax_step,
            deadzone_min: self.deadzone_min,
            deadzone_max: self.deadzone_max,
            deadzone_step: self.deadzone_step,
        }
    }
}

impl ServerConfig {
    /// Socket address string for binding
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Periodic update interval
    #[must_use]
    pub const fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Server
        if self.server.update_interval_ms == 0 {
            return Err(Error::ConfigError("Update interval must be greater than 0".to_string()));
        }
        if self.server.consumer_queue == 0 {
            return Err(Error::ConfigError("Consumer queue must be greater than 0".to_string()));
        }

        // Control
        let c = &self.control;
        if c.vmax_min <= 0.0 || c.vmax_min > c.vmax_max {
            return Err(Error::ConfigError(format!(
                "Speed range [{}, {}] is invalid",
                c.vmax_min, c.vmax_max
            )));
        }
        if c.vmax_x <= 0.0 || c.vmax_y <= 0.0 {
            return Err(Error::ConfigError("Speed caps must be positive".to_string()));
        }
        if c.deadzone_min < 0.0 || c.deadzone_min > c.deadzone_max {
            return Err(Error::ConfigError(format!(
                "Deadzone range [{}, {}] is invalid",
                c.deadzone_min, c.deadzone_max
            )));
        }
        if c.deadzone_yaw < 0.0 || c.deadzone_roll < 0.0 || c.hysteresis_deg < 0.0 {
            return Err(Error::ConfigError(
                "Deadzones and hysteresis must not be negative".to_string(),
            ));
        }

        // Smoothing
        for (name, value) in [
            ("Yaw smoothing", self.smoothing.yaw_smoothing),
            ("Roll smoothing", self.smoothing.roll_smoothing),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(Error::ConfigError(format!("{name} must be in [0, 1)")));
            }
        }
        if self.smoothing.max_yaw_jump <= 0.0 {
            return Err(Error::ConfigError("Maximum yaw jump must be positive".to_string()));
        }

        // Pose
        if self.pose.yaw_limit <= 0.0 || self.pose.yaw_scale <= 0.0 {
            return Err(Error::ConfigError("Yaw scale and limit must be positive".to_string()));
        }

        // Calibration
        let cal = &self.calibration;
        if cal.capture_secs <= 0.0 {
            return Err(Error::ConfigError("Capture window must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&cal.deadzone_fraction) {
            return Err(Error::ConfigError(
                "Deadzone fraction must be between 0.0 and 1.0".to_string(),
            ));
        }
        if cal.deadzone_floor_yaw < 0.0 || cal.deadzone_floor_roll < 0.0 {
            return Err(Error::ConfigError("Deadzone floors must not be negative".to_string()));
        }

        // Gestures
        let g = &self.gestures;
        if g.brow_baseline_frames == 0 {
            return Err(Error::ConfigError(
                "Brow baseline frames must be greater than 0".to_string(),
            ));
        }
        if g.blink_min_frames == 0 {
            return Err(Error::ConfigError("Blink minimum frames must be greater than 0".to_string()));
        }
        if g.triple_blink_window <= 0.0 {
            return Err(Error::ConfigError("Triple blink window must be positive".to_string()));
        }
        if !(0.0..=100.0).contains(&g.click_zone_pct) {
            return Err(Error::ConfigError(
                "Click zone must be between 0 and 100 percent".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Gesture Control Configuration

# WebSocket broadcaster
server:
  host: "127.0.0.1"
  port: 8765
  update_interval_ms: 30
  consumer_queue: 64

# Velocity controller (runtime adjustable within the limits below)
control:
  vmax_x: 300.0
  vmax_y: 300.0
  deadzone_yaw: 10.0
  deadzone_roll: 10.0
  hysteresis_deg: 1.0
  tau_vel: 0.18
  invert_x: true
  vmax_min: 100.0
  vmax_max: 2000.0
  vmax_step: 50.0
  deadzone_min: 1.0
  deadzone_max: 30.0
  deadzone_step: 1.0

# Pose smoothing
smoothing:
  yaw_smoothing: 0.7
  roll_smoothing: 0.5
  max_yaw_jump: 60.0

# Geometric pose estimation
pose:
  min_eye_width_px: 10.0
  yaw_scale: 50.0
  yaw_limit: 60.0

# Calibration
calibration:
  capture_secs: 1.5
  min_samples: 5
  deadzone_floor_yaw: 5.0
  deadzone_floor_roll: 5.0
  deadzone_fraction: 0.15
  file: "simple_head_calib.json"

# Gesture detection
gestures:
  mouth_open_threshold: 0.38
  select_click_cooldown: 0.5
  click_zone_pct: 85.0
  brow_baseline_frames: 60
  brow_up_factor: 0.12
  brow_hold_secs: 0.4
  blink_ear_threshold: 0.22
  blink_min_frames: 1
  triple_blink_window: 1.2
  triple_blink_hold: 0.2

# Landmark input
input:
  retry_backoff_ms: 100
"#;
