use crate::filters::median;
use std::collections::VecDeque;

/// Neutral brow distance, learned once per process
#[derive(Debug, Clone, PartialEq)]
pub enum BrowBaseline {
    /// Collecting samples; the window holds at most the configured count
    Learning(VecDeque<f64>),
    /// Median of the learning window, fixed from now on
    Learned(f64),
}

/// Hold timer for a raised brow
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BrowState {
    #[default]
    Idle,
    /// Raised since the given time, not fired yet
    Holding { since: f64 },
    /// Raised long enough and delete has fired
    Fired,
}

/// Emits delete once per sustained brow raise
#[derive(Debug, Clone)]
pub struct BrowDetector {
    baseline_frames: usize,
    up_factor: f64,
    hold_secs: f64,
    baseline: BrowBaseline,
    state: BrowState,
}

impl BrowDetector {
    pub fn new(baseline_frames: usize, up_factor: f64, hold_secs: f64) -> Self {
        let baseline_frames = baseline_frames.max(1);
        Self {
            baseline_frames,
            up_factor,
            hold_secs,
            baseline: BrowBaseline::Learning(VecDeque::with_capacity(baseline_frames)),
            state: BrowState::Idle,
        }
    }

    /// Feed one frame; returns `true` when delete fires
    ///
    /// `ratio` is the normalized brow distance. `suppressed` forces the brow
    /// down for this frame. Baseline samples are only taken while
    /// `eyes_closed` is false.
    pub fn update(&mut self, ratio: f64, suppressed: bool, eyes_closed: bool, now: f64) -> bool {
        let raised = match &mut self.baseline {
            BrowBaseline::Learning(samples) => {
                if !eyes_closed {
                    if samples.len() >= self.baseline_frames {
                        samples.pop_front();
                    }
                    samples.push_back(ratio);
                    if samples.len() == self.baseline_frames {
                        let learned = median(samples.make_contiguous()).unwrap_or(ratio);
                        log::info!("Brow baseline learned: {learned:.3}");
                        self.baseline = BrowBaseline::Learned(learned);
                    }
                }
                false
            }
            BrowBaseline::Learned(baseline) => !suppressed && ratio >= *baseline * (1.0 + self.up_factor),
        };

        if !raised {
            self.state = BrowState::Idle;
            return false;
        }

        match self.state {
            BrowState::Idle => {
                self.state = BrowState::Holding { since: now };
                self.check_hold(now)
            }
            BrowState::Holding { .. } => self.check_hold(now),
            BrowState::Fired => false,
        }
    }

    fn check_hold(&mut self, now: f64) -> bool {
        if let BrowState::Holding { since } = self.state {
            if now - since >= self.hold_secs {
                self.state = BrowState::Fired;
                return true;
            }
        }
        false
    }

    /// No face: the brow counts as down; the baseline is kept
    pub fn clear(&mut self) {
        self.state = BrowState::Idle;
    }

    /// Learned baseline, if any
    pub fn baseline(&self) -> Option<f64> {
        match self.baseline {
            BrowBaseline::Learning(_) => None,
            BrowBaseline::Learned(value) => Some(value),
        }
    }

    pub const fn state(&self) -> BrowState {
        self.state
    }
}
