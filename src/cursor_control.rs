//! Deadzone / hysteresis velocity control with slew-rate limiting.
//!
//! Each axis is classified independently against its deadzone:
//!
//! - beyond `deadzone + hysteresis` the target is full speed in the
//!   direction of the pose delta,
//! - inside `deadzone` the target is zero,
//! - in between, the previous direction is held at full speed if the
//!   cursor was moving, which keeps the command from chattering at the
//!   deadzone edge.
//!
//! The commanded velocity then slews toward the target with a first-order
//! response (`alpha = dt / (tau + dt)`) and is integrated into a cursor
//! position clamped to the frame.

use crate::constants::VELOCITY_EPSILON;
use serde::{Deserialize, Serialize};

/// Runtime-tunable controller parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParams {
    /// Horizontal speed cap (px/s)
    pub vmax_x: f64,
    /// Vertical speed cap (px/s)
    pub vmax_y: f64,
    /// Yaw deadzone (degrees)
    pub deadzone_yaw: f64,
    /// Roll deadzone (degrees)
    pub deadzone_roll: f64,
    /// Hysteresis band above each deadzone (degrees)
    pub hysteresis_deg: f64,
    /// Velocity slew time constant (seconds)
    pub tau_vel: f64,
}

/// Bounds and step sizes for runtime adjustment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamLimits {
    pub vmax_min: f64,
    pub vmax_max: f64,
    pub vmax_step: f64,
    pub deadzone_min: f64,
    pub deadzone_max: f64,
    pub deadzone_step: f64,
}

/// A single runtime parameter change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamAdjustment {
    SpeedUp,
    SpeedDown,
    DeadzoneYawUp,
    DeadzoneYawDown,
    DeadzoneRollUp,
    DeadzoneRollDown,
}

impl ControlParams {
    /// Apply an adjustment, clamping the result into `limits`
    ///
    /// Speed changes move `vmax_x` and copy it to `vmax_y`.
    pub fn adjust(&mut self, adjustment: ParamAdjustment, limits: &ParamLimits) {
        let clamp_speed = |v: f64| v.clamp(limits.vmax_min, limits.vmax_max);
        let clamp_deadzone = |v: f64| v.clamp(limits.deadzone_min, limits.deadzone_max);

        match adjustment {
            ParamAdjustment::SpeedUp => self.vmax_x = clamp_speed(self.vmax_x + limits.vmax_step),
            ParamAdjustment::SpeedDown => self.vmax_x = clamp_speed(self.vmax_x - limits.vmax_step),
            ParamAdjustment::DeadzoneYawUp => {
                self.deadzone_yaw = clamp_deadzone(self.deadzone_yaw + limits.deadzone_step);
            }
            ParamAdjustment::DeadzoneYawDown => {
                self.deadzone_yaw = clamp_deadzone(self.deadzone_yaw - limits.deadzone_step);
            }
            ParamAdjustment::DeadzoneRollUp => {
                self.deadzone_roll = clamp_deadzone(self.deadzone_roll + limits.deadzone_step);
            }
            ParamAdjustment::DeadzoneRollDown => {
                self.deadzone_roll = clamp_deadzone(self.deadzone_roll - limits.deadzone_step);
            }
        }

        if matches!(adjustment, ParamAdjustment::SpeedUp | ParamAdjustment::SpeedDown) {
            self.vmax_y = self.vmax_x;
            log::info!("Speed: {:.0} px/s", self.vmax_x);
        } else {
            log::info!(
                "Deadzone: yaw={:.1}° roll={:.1}°",
                self.deadzone_yaw,
                self.deadzone_roll
            );
        }
    }
}

/// Target velocity for one axis
///
/// `direction` is `+1.0` or `-1.0` and maps a positive pose delta onto
/// the screen axis.
#[must_use]
pub fn axis_target(delta: f64, deadzone: f64, hysteresis: f64, vmax: f64, previous: f64, direction: f64) -> f64 {
    let magnitude = delta.abs();
    if magnitude > deadzone + hysteresis {
        direction * vmax * delta.signum()
    } else if magnitude < deadzone {
        0.0
    } else if previous.abs() > VELOCITY_EPSILON {
        vmax * previous.signum()
    } else {
        0.0
    }
}

/// First-order slew of `previous` toward `target`
#[must_use]
pub fn slew(previous: f64, target: f64, dt: f64, tau: f64) -> f64 {
    let alpha = if tau > 0.0 { dt / (tau + dt) } else { 1.0 };
    previous + (target - previous) * alpha
}

/// Velocity state and cursor integration
#[derive(Debug, Clone)]
pub struct VelocityController {
    params: ControlParams,
    invert_x: bool,
    velocity: (f64, f64),
    cursor: (f64, f64),
    frame_size: (f64, f64),
}

impl VelocityController {
    /// Create a controller with the cursor centred in a `width` x `height` frame
    #[must_use]
    pub fn new(params: ControlParams, invert_x: bool, width: u32, height: u32) -> Self {
        let frame_size = (f64::from(width.max(1)), f64::from(height.max(1)));
        Self {
            params,
            invert_x,
            velocity: (0.0, 0.0),
            cursor: (frame_size.0 / 2.0, frame_size.1 / 2.0),
            frame_size,
        }
    }

    /// One control tick: classify, slew, integrate and clamp
    ///
    /// `dyaw` and `droll` are smoothed pose deltas from neutral; `dt` is
    /// the elapsed time in seconds. Returns the new velocity.
    pub fn step(&mut self, dyaw: f64, droll: f64, dt: f64) -> (f64, f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let p = self.params;
        let (vx_prev, vy_prev) = self.velocity;

        let x_direction = if self.invert_x { -1.0 } else { 1.0 };
        let target_x = axis_target(dyaw, p.deadzone_yaw, p.hysteresis_deg, p.vmax_x, vx_prev, x_direction);
        // Tilting the left ear down (positive roll) moves the cursor up
        let target_y = axis_target(droll, p.deadzone_roll, p.hysteresis_deg, p.vmax_y, vy_prev, -1.0);

        let vx = slew(vx_prev, target_x, dt, p.tau_vel).clamp(-p.vmax_x, p.vmax_x);
        let vy = slew(vy_prev, target_y, dt, p.tau_vel).clamp(-p.vmax_y, p.vmax_y);
        self.velocity = (vx, vy);

        self.cursor.0 += vx * dt;
        self.cursor.1 += vy * dt;
        self.clamp_cursor();

        self.velocity
    }

    /// Stop commanding motion; the cursor stays where it is
    pub fn halt(&mut self) {
        self.velocity = (0.0, 0.0);
    }

    /// Update the frame size, re-clamping the cursor
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        self.frame_size = (f64::from(width.max(1)), f64::from(height.max(1)));
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor.0 = self.cursor.0.clamp(0.0, self.frame_size.0 - 1.0);
        self.cursor.1 = self.cursor.1.clamp(0.0, self.frame_size.1 - 1.0);
    }

    /// Cursor position in pixels
    #[must_use]
    pub const fn cursor(&self) -> (f64, f64) {
        self.cursor
    }

    /// Cursor position as percentages of the frame size
    #[must_use]
    pub fn cursor_percent(&self) -> (f64, f64) {
        (
            self.cursor.0 / self.frame_size.0 * 100.0,
            self.cursor.1 / self.frame_size.1 * 100.0,
        )
    }

    /// Place the cursor, clamped to the frame
    pub fn set_cursor(&mut self, x: f64, y: f64) {
        self.cursor = (x, y);
        self.clamp_cursor();
    }

    #[must_use]
    pub const fn velocity(&self) -> (f64, f64) {
        self.velocity
    }

    #[must_use]
    pub const fn params(&self) -> &ControlParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ControlParams {
        &mut self.params
    }

    #[must_use]
    pub const fn invert_x(&self) -> bool {
        self.invert_x
    }

    pub fn set_invert_x(&mut self, invert_x: bool) {
        self.invert_x = invert_x;
    }
}
