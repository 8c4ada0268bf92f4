//! Inbound data from the external landmark detector.
//!
//! The detector runs out of process and writes one JSON object per line:
//! a landmark frame, an explicit "no face" marker, or a runtime command.

use crate::{cursor_control::ParamAdjustment, landmarks::LandmarkFrame, Error, Result};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Runtime trigger forwarded by the detector front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Start a new calibration session
    Calibrate,
    /// Open the capture window of the armed calibration stage
    Ready,
    /// Take the current smoothed pose as neutral
    Recenter,
    SaveCalibration,
    LoadCalibration,
    /// Flip the yaw-axis direction
    ToggleInvertX,
    Quit,
    /// Change a controller parameter within its limits
    Adjust(ParamAdjustment),
}

/// One line of detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Normalized landmarks `[x, y]` or `[x, y, z]` for one frame
    Frame {
        width: u32,
        height: u32,
        landmarks: Vec<Vec<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    /// The detector found no face in this frame
    NoFace {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    Command { command: Command },
}

impl InputEvent {
    /// Capture time in seconds, if the detector supplied one
    #[must_use]
    pub const fn timestamp(&self) -> Option<f64> {
        match self {
            Self::Frame { timestamp, .. } | Self::NoFace { timestamp } => *timestamp,
            Self::Command { .. } => None,
        }
    }

    /// Parse one JSON line
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::InvalidInput(format!("Malformed input line: {e}")))
    }
}

/// Build a landmark frame from `[x, y(, z)]` rows; `z` is ignored
pub fn landmark_frame(width: u32, height: u32, landmarks: &[Vec<f64>]) -> Result<LandmarkFrame> {
    let points = landmarks
        .iter()
        .enumerate()
        .map(|(i, row)| match row.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Point2::new(*x, *y)),
            _ => Err(Error::InvalidInput(format!("Landmark {i} is not a finite [x, y] pair"))),
        })
        .collect::<Result<Vec<_>>>()?;
    LandmarkFrame::new(points, width, height)
}

/// Supplier of detector events, one per loop iteration
pub trait LandmarkSource {
    /// Next event; `Ok(None)` at end of stream
    ///
    /// # Errors
    ///
    /// A read or parse failure. The caller decides whether it is fatal.
    fn next_event(&mut self) -> Result<Option<InputEvent>>;
}

/// JSON-lines reader over any buffered input
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> Result<Option<InputEvent>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return InputEvent::parse(trimmed)
                .map(Some)
                .map_err(|e| Error::Source(format!("line {}: {e}", self.line_number)));
        }
    }
}

/// In-memory source, mostly for replaying recorded sessions
impl LandmarkSource for std::vec::IntoIter<InputEvent> {
    fn next_event(&mut self) -> Result<Option<InputEvent>> {
        Ok(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        let event = InputEvent::parse(r#"{"type":"command","command":"calibrate"}"#).unwrap();
        assert_eq!(event, InputEvent::Command { command: Command::Calibrate });

        let event = InputEvent::parse(r#"{"type":"command","command":{"adjust":"speed_up"}}"#).unwrap();
        assert_eq!(
            event,
            InputEvent::Command {
                command: Command::Adjust(ParamAdjustment::SpeedUp)
            }
        );
    }

    #[test]
    fn test_parse_no_face() {
        let event = InputEvent::parse(r#"{"type":"no_face","timestamp":1.5}"#).unwrap();
        assert_eq!(event.timestamp(), Some(1.5));
    }

    #[test]
    fn test_short_landmark_row_rejected() {
        let rows = vec![vec![0.5]; 468];
        assert!(landmark_frame(640, 480, &rows).is_err());
    }

    #[test]
    fn test_json_lines_skips_blank_lines() {
        let data = "\n{\"type\":\"no_face\"}\n\nnot json\n";
        let mut source = JsonLinesSource::new(Cursor::new(data));
        assert_eq!(source.next_event().unwrap(), Some(InputEvent::NoFace { timestamp: None }));
        assert!(matches!(source.next_event(), Err(Error::Source(_))));
        assert_eq!(source.next_event().unwrap(), None);
    }
}
