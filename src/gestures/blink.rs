use crate::constants::{BLINK_HISTORY_CAPACITY, TRIPLE_BLINK_COUNT};
use std::collections::VecDeque;

/// Combined state of both eyes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EyeState {
    #[default]
    Open,
    /// Both eyes counted closed; no new blink until they reopen
    Blinking,
}

/// Counts blinks and detects three of them inside a time window
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    min_frames: u32,
    window: f64,
    hold: f64,
    left_run: u32,
    right_run: u32,
    state: EyeState,
    timestamps: VecDeque<f64>,
    hold_until: Option<f64>,
}

impl BlinkDetector {
    pub fn new(min_frames: u32, window: f64, hold: f64) -> Self {
        Self {
            min_frames: min_frames.max(1),
            window,
            hold,
            left_run: 0,
            right_run: 0,
            state: EyeState::Open,
            timestamps: VecDeque::with_capacity(BLINK_HISTORY_CAPACITY),
            hold_until: None,
        }
    }

    /// Feed per-eye closed flags; returns `true` when a triple blink fires
    pub fn update(&mut self, left_closed: bool, right_closed: bool, now: f64) -> bool {
        self.left_run = if left_closed { self.left_run.saturating_add(1) } else { 0 };
        self.right_run = if right_closed { self.right_run.saturating_add(1) } else { 0 };

        let both_closed = self.left_run >= self.min_frames && self.right_run >= self.min_frames;
        let previous = self.state;
        self.state = match previous {
            // Only an observed open eye ends a blink, even if the runs restarted after a dropout
            EyeState::Blinking if left_closed && right_closed => EyeState::Blinking,
            _ if both_closed => EyeState::Blinking,
            _ => EyeState::Open,
        };

        if previous == EyeState::Open && self.state == EyeState::Blinking {
            log::debug!("Blink at {now:.2}s");
            self.register(now)
        } else {
            false
        }
    }

    /// Record one blink; evict by age, insert, then trim to capacity
    fn register(&mut self, now: f64) -> bool {
        while self.timestamps.front().is_some_and(|&t| now - t > self.window) {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(now);
        while self.timestamps.len() > BLINK_HISTORY_CAPACITY {
            self.timestamps.pop_front();
        }

        let len = self.timestamps.len();
        if len < TRIPLE_BLINK_COUNT {
            return false;
        }

        let first = self.timestamps[len - TRIPLE_BLINK_COUNT];
        if now - first > self.window {
            return false;
        }

        self.hold_until = Some(now + self.hold);
        // The three blinks are consumed so a fourth cannot re-trigger with them
        self.timestamps.clear();
        true
    }

    /// No face: drop partial runs; recorded blinks age out on their own
    ///
    /// A blink in progress stays in progress until the eyes are seen open.
    pub fn clear(&mut self) {
        self.left_run = 0;
        self.right_run = 0;
    }

    /// Whether the triple-blink flag is still raised at `now`
    pub fn triple_blink_active(&self, now: f64) -> bool {
        self.hold_until.is_some_and(|until| now < until)
    }

    pub const fn state(&self) -> EyeState {
        self.state
    }

    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.timestamps.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One closed frame followed by one open frame per blink time
    fn blink_at(detector: &mut BlinkDetector, times: &[f64]) -> usize {
        times
            .iter()
            .filter(|&&t| {
                let fired = detector.update(true, true, t);
                detector.update(false, false, t + 0.05);
                fired
            })
            .count()
    }

    #[test]
    fn test_triple_within_window_fires_once() {
        let mut blink = BlinkDetector::new(1, 1.2, 0.2);
        assert_eq!(blink_at(&mut blink, &[0.0, 0.3, 0.6]), 1);
        assert!(blink.triple_blink_active(0.7));
        assert!(!blink.triple_blink_active(0.9));
    }

    #[test]
    fn test_spread_blinks_do_not_fire() {
        let mut blink = BlinkDetector::new(1, 1.2, 0.2);
        assert_eq!(blink_at(&mut blink, &[0.0, 0.7, 1.5]), 0);
        assert!(!blink.triple_blink_active(1.6));
    }

    #[test]
    fn test_window_evicts_old_blinks() {
        let mut blink = BlinkDetector::new(1, 1.2, 0.2);
        blink_at(&mut blink, &[0.0, 0.5, 2.0]);
        assert!(blink.timestamps().all(|t| 2.0 - t <= 1.2));
    }

    #[test]
    fn test_held_eyes_count_once() {
        let mut blink = BlinkDetector::new(1, 1.2, 0.2);
        for i in 0..30 {
            assert!(!blink.update(true, true, f64::from(i) * 0.01));
        }
        assert_eq!(blink.timestamps().count(), 1);
    }

    #[test]
    fn test_one_eye_is_not_a_blink() {
        let mut blink = BlinkDetector::new(1, 1.2, 0.2);
        blink.update(true, false, 0.0);
        blink.update(false, true, 0.1);
        assert_eq!(blink.timestamps().count(), 0);
    }

    #[test]
    fn test_min_frames() {
        let mut blink = BlinkDetector::new(2, 1.2, 0.2);
        blink.update(true, true, 0.0);
        assert_eq!(blink.state(), EyeState::Open);
        blink.update(true, true, 0.03);
        assert_eq!(blink.state(), EyeState::Blinking);
    }

    #[test]
    fn test_held_blink_across_dropouts_counts_once() {
        for min_frames in [1, 2] {
            let mut blink = BlinkDetector::new(min_frames, 1.2, 0.2);
            let mut fired = false;
            let mut t = 0.0;
            for _ in 0..3 {
                for _ in 0..min_frames {
                    fired |= blink.update(true, true, t);
                    t += 0.03;
                }
                blink.clear();
                fired |= blink.update(true, true, t);
                t += 0.03;
            }
            assert!(!fired, "min_frames={min_frames}");
            assert_eq!(blink.timestamps().count(), 1);
            assert_eq!(blink.state(), EyeState::Blinking);

            blink.update(false, false, t);
            assert_eq!(blink.state(), EyeState::Open);
        }
    }

    #[test]
    fn test_clear_resets_runs() {
        let mut blink = BlinkDetector::new(2, 1.2, 0.2);
        blink.update(true, true, 0.0);
        blink.clear();
        blink.update(true, true, 0.1);
        assert_eq!(blink.state(), EyeState::Open);
    }
}
