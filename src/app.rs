//! Sampling loop for the head gesture controller.

use crate::{
    broadcast::{Broadcaster, CursorSnapshot},
    calibration::{CalibrationProfile, CalibrationProgress},
    config::Config,
    input::{landmark_frame, Command, InputEvent, LandmarkSource},
    landmarks::LandmarkFrame,
    tracker::Tracker,
    Error, Result,
};
use log::{debug, info, warn};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Whether the loop keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Drives the tracker from a landmark source and publishes its output
pub struct HeadGestureApp<S> {
    config: Config,
    source: S,
    tracker: Tracker,
    broadcaster: Broadcaster,
    snapshot: watch::Sender<CursorSnapshot>,
    token: CancellationToken,
    started: Instant,
    /// Detector clock minus local clock, from the latest stamped event
    clock_offset: f64,
    now: f64,
}

impl<S: LandmarkSource> HeadGestureApp<S> {
    /// Create the application around an already opened source
    pub fn new(
        config: Config,
        source: S,
        broadcaster: Broadcaster,
        snapshot: watch::Sender<CursorSnapshot>,
        token: CancellationToken,
    ) -> Self {
        info!("Initializing head gesture controller");
        let tracker = Tracker::new(&config);
        snapshot.send_replace(tracker.snapshot());
        Self {
            config,
            source,
            tracker,
            broadcaster,
            snapshot,
            token,
            started: Instant::now(),
            clock_offset: 0.0,
            now: 0.0,
        }
    }

    /// Install a saved calibration before the loop starts
    pub fn load_calibration<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let profile = CalibrationProfile::load(path, &self.config.calibration)?;
        self.tracker.install_profile(profile);
        self.publish();
        Ok(())
    }

    /// Run until end of input, a quit command or cancellation
    ///
    /// # Errors
    ///
    /// Fails only if the very first read from the source fails.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting sampling loop");

        let mut next = self
            .source
            .next_event()
            .map_err(|e| Error::Source(format!("Landmark source failed before the first frame: {e}")))?;

        loop {
            if self.token.is_cancelled() {
                info!("Shutdown requested");
                break;
            }
            let Some(event) = next else {
                info!("End of landmark input");
                break;
            };
            if self.handle_event(event) == Flow::Quit {
                info!("Quit requested");
                break;
            }
            next = self.read_with_retry();
        }

        self.token.cancel();
        info!("Sampling loop stopped");
        Ok(())
    }

    /// Next event, retrying transient failures until cancelled
    fn read_with_retry(&mut self) -> Option<InputEvent> {
        let backoff = Duration::from_millis(self.config.input.retry_backoff_ms);
        loop {
            match self.source.next_event() {
                Ok(event) => return event,
                Err(e) => {
                    warn!("Failed to read landmarks, retrying: {e}");
                    if self.token.is_cancelled() {
                        return None;
                    }
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    /// Apply one inbound event
    fn handle_event(&mut self, event: InputEvent) -> Flow {
        // Commands carry no time of their own and take the latest tick time.
        // Unstamped frames continue the detector clock so time never jumps back.
        let elapsed = self.started.elapsed().as_secs_f64();
        self.now = match (&event, event.timestamp()) {
            (_, Some(timestamp)) => {
                self.clock_offset = timestamp - elapsed;
                timestamp
            }
            (InputEvent::Command { .. }, None) => self.now,
            (_, None) => (elapsed + self.clock_offset).max(self.now),
        };

        let flow = match event {
            InputEvent::Frame {
                width,
                height,
                landmarks,
                ..
            } => {
                match landmark_frame(width, height, &landmarks) {
                    Ok(frame) => self.process(Some(&frame)),
                    Err(e) => {
                        warn!("Discarding frame: {e}");
                        self.process(None);
                    }
                }
                Flow::Continue
            }
            InputEvent::NoFace { .. } => {
                self.process(None);
                Flow::Continue
            }
            InputEvent::Command { command } => self.handle_command(command),
        };

        self.publish();
        flow
    }

    fn process(&mut self, frame: Option<&LandmarkFrame>) {
        let output = self.tracker.tick(frame, self.now);

        match &output.calibration {
            Some(CalibrationProgress::Capturing {
                pose,
                samples,
                remaining_secs,
            }) => debug!("[CALIBRATION] {pose}: {samples} samples, {remaining_secs:.1}s left"),
            Some(CalibrationProgress::Complete(_)) => info!("Calibration installed"),
            _ => {}
        }

        for event in &output.events {
            self.broadcaster.send_event(event);
        }
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        debug!("Command: {command:?}");
        match command {
            Command::Calibrate => {
                info!("Starting calibration");
                self.tracker.start_calibration();
            }
            Command::Ready => {
                if !self.tracker.ready(self.now) {
                    info!("Ready ignored: no calibration in progress");
                }
            }
            Command::Recenter => {
                if !self.tracker.recenter() {
                    warn!("Cannot recenter before calibration");
                }
            }
            Command::SaveCalibration => self.save_calibration(),
            Command::LoadCalibration => {
                let path = self.config.calibration.file.clone();
                if let Err(e) = self.load_calibration(&path) {
                    warn!("Failed to load calibration: {e}");
                }
            }
            Command::ToggleInvertX => {
                self.tracker.toggle_invert_x();
            }
            Command::Adjust(adjustment) => self.tracker.adjust(adjustment),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn save_calibration(&self) {
        let Some(profile) = self.tracker.profile() else {
            warn!("No calibration to save");
            return;
        };
        if let Err(e) = profile.save(&self.config.calibration.file) {
            warn!("Failed to save calibration: {e}");
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.tracker.snapshot());
    }

    #[must_use]
    pub const fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
