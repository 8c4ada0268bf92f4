//! Facial gesture detection.
//!
//! Four detectors run on ratios derived from every frame with a face:
//!
//! - mouth open edge: select, or click when the cursor is near the bottom,
//! - sustained brow raise: delete,
//! - blink tracking, with three blinks in a window cycling the mode.
//!
//! Each detector is an explicit state machine that only reacts to rising
//! edges, so holding a gesture never repeats its event. A frame without a
//! face returns every detector to its not-detected state.

/// Triple-blink mode cycling
pub mod blink;

/// Brow raise with baseline learning and hold timer
pub mod brow;

/// Mouth open edge with select/click cooldown
pub mod mouth;

use crate::{
    config::GestureConfig,
    constants::{
        L_BROW, L_EYE_DN, L_EYE_IN, L_EYE_OUT, L_EYE_UP, MOUTH_DN, MOUTH_L, MOUTH_R, MOUTH_UP, RATIO_EPSILON,
        R_EYE_DN, R_EYE_IN, R_EYE_OUT, R_EYE_UP,
    },
    landmarks::LandmarkFrame,
};
use blink::BlinkDetector;
use brow::BrowDetector;
use log::info;
use mouth::MouthDetector;
use std::fmt;

/// Interaction mode announced to consumers, cycled by triple blinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Cursor,
    Move,
    StageRotate,
}

impl Mode {
    /// All modes in cycle order
    pub const ALL: [Self; 3] = [Self::Cursor, Self::Move, Self::StageRotate];

    /// Next mode in the cycle
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Cursor => Self::Move,
            Self::Move => Self::StageRotate,
            Self::StageRotate => Self::Cursor,
        }
    }

    /// Command name used on the wire
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Move => "move",
            Self::StageRotate => "stagerotate",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Discrete gesture fired on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Select,
    Click,
    Delete,
    ModeChange(Mode),
}

/// Scale-invariant measurements taken from one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureRatios {
    /// Lip separation over mouth width
    pub mouth: f64,
    /// Brow-to-eyelid distance over inner eye corner distance
    pub brow: f64,
    /// Left eye opening over eye width
    pub left_eye: f64,
    /// Right eye opening over eye width
    pub right_eye: f64,
}

impl GestureRatios {
    /// Measure all ratios; `None` if a required landmark is missing
    #[must_use]
    pub fn measure(frame: &LandmarkFrame) -> Option<Self> {
        let inter_eye = frame.distance(L_EYE_IN, R_EYE_IN)? + RATIO_EPSILON;
        Some(Self {
            mouth: frame.aspect_ratio(MOUTH_UP, MOUTH_DN, MOUTH_L, MOUTH_R, RATIO_EPSILON)?,
            brow: frame.distance(L_BROW, L_EYE_UP)? / inter_eye,
            left_eye: frame.aspect_ratio(L_EYE_UP, L_EYE_DN, L_EYE_IN, L_EYE_OUT, RATIO_EPSILON)?,
            right_eye: frame.aspect_ratio(R_EYE_UP, R_EYE_DN, R_EYE_IN, R_EYE_OUT, RATIO_EPSILON)?,
        })
    }
}

/// The four gesture detectors and the current mode
#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    config: GestureConfig,
    mouth: MouthDetector,
    brow: BrowDetector,
    blink: BlinkDetector,
    mode: Mode,
}

impl GestureStateMachine {
    #[must_use]
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            config: config.clone(),
            mouth: MouthDetector::new(config.select_click_cooldown, config.click_zone_pct),
            brow: BrowDetector::new(config.brow_baseline_frames, config.brow_up_factor, config.brow_hold_secs),
            blink: BlinkDetector::new(
                config.blink_min_frames,
                config.triple_blink_window,
                config.triple_blink_hold,
            ),
            mode: Mode::default(),
        }
    }

    /// Run every detector on one frame's ratios
    ///
    /// `cursor_y_pct` decides between click and select. `now` is in seconds.
    pub fn update(&mut self, ratios: &GestureRatios, cursor_y_pct: f64, now: f64) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        let mouth_open = ratios.mouth > self.config.mouth_open_threshold;
        let left_closed = ratios.left_eye < self.config.blink_ear_threshold;
        let right_closed = ratios.right_eye < self.config.blink_ear_threshold;

        if let Some(event) = self.mouth.update(mouth_open, cursor_y_pct, now) {
            info!("Mouth gesture: {event:?} at y={cursor_y_pct:.1}%");
            events.push(event);
        }

        // Brow landmarks shift when the mouth opens or an eye closes
        let suppressed = mouth_open || left_closed || right_closed;
        if self.brow.update(ratios.brow, suppressed, left_closed || right_closed, now) {
            info!("Brow raise held: delete");
            events.push(GestureEvent::Delete);
        }

        if self.blink.update(left_closed, right_closed, now) {
            self.mode = self.mode.next();
            info!("Triple blink: mode -> {}", self.mode);
            events.push(GestureEvent::ModeChange(self.mode));
        }

        events
    }

    /// No face this tick: treat every gesture as not detected
    pub fn clear(&mut self) {
        self.mouth.clear();
        self.brow.clear();
        self.blink.clear();
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the triple-blink flag is still raised at `now`
    #[must_use]
    pub fn triple_blink_active(&self, now: f64) -> bool {
        self.blink.triple_blink_active(now)
    }

    #[must_use]
    pub fn brow_baseline(&self) -> Option<f64> {
        self.brow.baseline()
    }

    #[must_use]
    pub const fn mouth(&self) -> &MouthDetector {
        &self.mouth
    }

    #[must_use]
    pub const fn brow(&self) -> &BrowDetector {
        &self.brow
    }

    #[must_use]
    pub const fn blink(&self) -> &BlinkDetector {
        &self.blink
    }
}
