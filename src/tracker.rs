//! Per-frame pipeline: pose, smoothing, calibration, velocity control and gestures.
//!
//! The tracker owns all mutable control and gesture state and does no I/O.
//! The sampling loop feeds it one tick at a time and forwards whatever it
//! returns to the broadcaster.

use crate::{
    broadcast::{CursorSnapshot, OutboundEvent},
    calibration::{CalibrationProfile, CalibrationProgress, CalibrationState, Calibrator},
    config::{CalibrationConfig, Config},
    cursor_control::{ParamAdjustment, ParamLimits, VelocityController},
    filters::PoseSmoother,
    gestures::{GestureRatios, GestureStateMachine},
    landmarks::LandmarkFrame,
    pose_estimation::{PoseEstimator, PoseReading, PoseSample},
};
use log::{debug, info};

/// Frame size assumed until the first frame arrives
const INITIAL_FRAME_SIZE: (u32, u32) = (640, 480);

/// What one tick produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    /// Discrete events to send immediately
    pub events: Vec<OutboundEvent>,
    /// Calibration progress, while a session is running
    pub calibration: Option<CalibrationProgress>,
}

/// Head tracking state machine
#[derive(Debug, Clone)]
pub struct Tracker {
    calibration_config: CalibrationConfig,
    limits: ParamLimits,
    estimator: PoseEstimator,
    smoother: PoseSmoother,
    state: CalibrationState,
    calibrator: Option<Calibrator>,
    controller: VelocityController,
    gestures: GestureStateMachine,
    frame_size: Option<(u32, u32)>,
    last_tick: Option<f64>,
}

impl Tracker {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let (width, height) = INITIAL_FRAME_SIZE;
        Self {
            calibration_config: config.calibration.clone(),
            limits: config.control.limits(),
            estimator: PoseEstimator::new(&config.pose),
            smoother: PoseSmoother::new(&config.smoothing),
            state: CalibrationState::default(),
            calibrator: None,
            controller: VelocityController::new(config.control.params(), config.control.invert_x, width, height),
            gestures: GestureStateMachine::new(&config.gestures),
            frame_size: None,
            last_tick: None,
        }
    }

    /// Advance by one tick at time `now` (seconds)
    ///
    /// `frame` is `None` when the detector found no face.
    pub fn tick(&mut self, frame: Option<&LandmarkFrame>, now: f64) -> TickOutput {
        let dt = self.last_tick.map_or(0.0, |last| (now - last).max(0.0));
        self.last_tick = Some(now);

        match frame {
            Some(frame) => self.tick_with_face(frame, now, dt),
            None => self.tick_without_face(now),
        }
    }

    fn tick_with_face(&mut self, frame: &LandmarkFrame, now: f64, dt: f64) -> TickOutput {
        self.track_frame_size(frame.width(), frame.height());
        let reading = self.estimator.estimate(frame);
        debug!("Raw pose: yaw={:?} roll={:?}", reading.yaw, reading.roll);

        let mut output = TickOutput::default();

        if self.calibrator.is_some() {
            self.controller.halt();
            // Capture windows consume the frame; arming still runs gestures
            let capturing = self.calibrator.as_ref().is_some_and(Calibrator::is_capturing);
            output.calibration = self.feed_calibrator(reading, now);
            if capturing {
                return output;
            }
        }

        let smoothed = self.smoother.update(reading);
        if reading.sample().is_some() {
            self.drive_cursor(smoothed, dt);
        } else {
            // No fresh measurement: stale smoothed values must not keep the cursor moving
            self.controller.halt();
        }

        let (x_pct, y_pct) = self.controller.cursor_percent();
        match GestureRatios::measure(frame) {
            Some(ratios) => {
                output.events = self
                    .gestures
                    .update(&ratios, y_pct, now)
                    .into_iter()
                    .map(|event| OutboundEvent::gesture(event, x_pct, y_pct))
                    .collect();
            }
            None => self.gestures.clear(),
        }
        output
    }

    fn tick_without_face(&mut self, now: f64) -> TickOutput {
        self.controller.halt();
        self.gestures.clear();

        TickOutput {
            events: Vec::new(),
            calibration: self.feed_calibrator(PoseReading::default(), now),
        }
    }

    /// Step the controller from the smoothed pose, or hold still when uncalibrated
    fn drive_cursor(&mut self, smoothed: Option<PoseSample>, dt: f64) {
        if self.calibrator.is_some() {
            return;
        }
        match (self.state.profile(), smoothed) {
            (Some(profile), Some(pose)) => {
                let neutral = profile.neutral();
                self.controller.step(pose.yaw - neutral.yaw, pose.roll - neutral.roll, dt);
            }
            _ => self.controller.halt(),
        }
    }

    /// Feed the running session, installing its profile when it completes
    fn feed_calibrator(&mut self, reading: PoseReading, now: f64) -> Option<CalibrationProgress> {
        let progress = self.calibrator.as_mut()?.feed(reading, now);
        if let CalibrationProgress::Complete(profile) = &progress {
            self.calibrator = None;
            self.install_profile(profile.clone());
        }
        Some(progress)
    }

    fn track_frame_size(&mut self, width: u32, height: u32) {
        match self.frame_size {
            Some(size) if size == (width, height) => {}
            Some(_) => {
                debug!("Frame size changed to {width}x{height}");
                self.controller.set_frame_size(width, height);
                self.frame_size = Some((width, height));
            }
            None => {
                self.controller.set_frame_size(width, height);
                self.controller
                    .set_cursor(f64::from(width) / 2.0, f64::from(height) / 2.0);
                self.frame_size = Some((width, height));
            }
        }
    }

    /// Start a new calibration session, discarding any in progress
    pub fn start_calibration(&mut self) {
        if self.calibrator.is_some() {
            info!("Restarting calibration");
        }
        self.controller.halt();
        self.calibrator = Some(Calibrator::new(&self.calibration_config));
    }

    /// Ready trigger for the armed calibration stage; `false` when not calibrating
    pub fn ready(&mut self, now: f64) -> bool {
        match self.calibrator.as_mut() {
            Some(calibrator) => {
                calibrator.ready(now);
                true
            }
            None => false,
        }
    }

    /// Use the current smoothed pose as neutral
    ///
    /// Returns `false` when uncalibrated or before any pose was smoothed.
    pub fn recenter(&mut self) -> bool {
        let (CalibrationState::Calibrated(profile), Some(pose)) = (&mut self.state, self.smoother.current()) else {
            return false;
        };
        profile.recenter(pose);
        true
    }

    /// Replace the active profile and take over its deadzones
    pub fn install_profile(&mut self, profile: CalibrationProfile) {
        self.smoother.seed(profile.neutral());
        let params = self.controller.params_mut();
        params.deadzone_yaw = profile.deadzone_yaw;
        params.deadzone_roll = profile.deadzone_roll;
        self.controller.halt();
        self.state = CalibrationState::Calibrated(profile);
    }

    pub fn adjust(&mut self, adjustment: ParamAdjustment) {
        self.controller.params_mut().adjust(adjustment, &self.limits);
    }

    /// Flip the yaw-axis direction; returns the new setting
    pub fn toggle_invert_x(&mut self) -> bool {
        let invert = !self.controller.invert_x();
        self.controller.set_invert_x(invert);
        info!("Invert X: {}", if invert { "on" } else { "off" });
        invert
    }

    /// Cursor position and mode for the periodic sender
    #[must_use]
    pub fn snapshot(&self) -> CursorSnapshot {
        let (x_pct, y_pct) = self.controller.cursor_percent();
        CursorSnapshot {
            x_pct,
            y_pct,
            mode: self.gestures.mode(),
        }
    }

    #[must_use]
    pub const fn calibration_state(&self) -> &CalibrationState {
        &self.state
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&CalibrationProfile> {
        self.state.profile()
    }

    #[must_use]
    pub const fn is_calibrating(&self) -> bool {
        self.calibrator.is_some()
    }

    #[must_use]
    pub const fn calibrator(&self) -> Option<&Calibrator> {
        self.calibrator.as_ref()
    }

    #[must_use]
    pub fn smoothed_pose(&self) -> Option<PoseSample> {
        self.smoother.current()
    }

    #[must_use]
    pub const fn controller(&self) -> &VelocityController {
        &self.controller
    }

    #[must_use]
    pub const fn gestures(&self) -> &GestureStateMachine {
        &self.gestures
    }
}
