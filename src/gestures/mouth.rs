use super::GestureEvent;

/// Mouth state as seen on the previous frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouthState {
    #[default]
    Closed,
    Open,
}

/// Fires select or click on each mouth-open edge, rate limited by a cooldown
#[derive(Debug, Clone)]
pub struct MouthDetector {
    cooldown: f64,
    click_zone_pct: f64,
    state: MouthState,
    last_fired: Option<f64>,
}

impl MouthDetector {
    pub fn new(cooldown: f64, click_zone_pct: f64) -> Self {
        Self {
            cooldown,
            click_zone_pct,
            state: MouthState::Closed,
            last_fired: None,
        }
    }

    /// Feed this frame's open/closed state
    ///
    /// On a closed→open edge outside the cooldown, returns `Click` when the
    /// cursor is at or below `click_zone_pct` of the frame height and
    /// `Select` otherwise. Edges inside the cooldown are observed but fire
    /// nothing and do not extend the cooldown.
    pub fn update(&mut self, open: bool, cursor_y_pct: f64, now: f64) -> Option<GestureEvent> {
        let previous = self.state;
        self.state = if open { MouthState::Open } else { MouthState::Closed };

        if previous != MouthState::Closed || self.state != MouthState::Open {
            return None;
        }

        if let Some(last) = self.last_fired {
            if now - last < self.cooldown {
                log::debug!("Mouth open edge ignored, cooldown {:.2}s left", self.cooldown - (now - last));
                return None;
            }
        }

        self.last_fired = Some(now);
        if cursor_y_pct >= self.click_zone_pct {
            Some(GestureEvent::Click)
        } else {
            Some(GestureEvent::Select)
        }
    }

    /// No face: the mouth counts as closed; the cooldown is kept
    pub fn clear(&mut self) {
        self.state = MouthState::Closed;
    }

    pub const fn state(&self) -> MouthState {
        self.state
    }

    pub const fn last_fired(&self) -> Option<f64> {
        self.last_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_on_rising_edge_only() {
        let mut mouth = MouthDetector::new(0.5, 85.0);
        assert_eq!(mouth.update(false, 50.0, 0.0), None);
        assert_eq!(mouth.update(true, 50.0, 0.1), Some(GestureEvent::Select));
        assert_eq!(mouth.update(true, 50.0, 2.0), None);
    }

    #[test]
    fn test_click_zone() {
        let mut mouth = MouthDetector::new(0.5, 85.0);
        assert_eq!(mouth.update(true, 90.0, 0.0), Some(GestureEvent::Click));
    }

    #[test]
    fn test_cooldown_edge_not_fired() {
        let mut mouth = MouthDetector::new(0.5, 85.0);
        assert!(mouth.update(true, 50.0, 0.0).is_some());
        mouth.update(false, 50.0, 0.1);
        assert!(mouth.update(true, 50.0, 0.2).is_none());
        assert_eq!(mouth.last_fired(), Some(0.0));
        mouth.update(false, 50.0, 0.3);
        assert!(mouth.update(true, 50.0, 0.6).is_some());
    }
}
