//! Head-pose cursor control and facial gesture detection.
//!
//! This library turns per-frame facial landmarks from an external face mesh
//! detector into a velocity-controlled cursor and discrete gesture events:
//! - Geometric yaw/roll estimation from eye corners and the nose tip
//! - Exponential smoothing with spurious-jump rejection
//! - Five-pose calibration deriving neutral, range of motion and deadzones
//! - Deadzone/hysteresis velocity control with slew-rate limiting
//! - Mouth, brow and blink state machines for select, click, delete and mode cycling
//! - A WebSocket broadcaster for periodic cursor updates and immediate events
//!
//! # Examples
//!
//! ```no_run
//! use head_gesture_control::{config::Config, landmarks::LandmarkFrame, tracker::Tracker};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tracker = Tracker::new(&Config::default());
//!
//! // Normalized landmarks from the detector, 468 per face
//! let points = vec![(0.5, 0.5); 468];
//! let frame = LandmarkFrame::from_normalized(&points, 640, 480)?;
//!
//! let output = tracker.tick(Some(&frame), 0.0);
//! for event in &output.events {
//!     println!("{}", event.to_json()?);
//! }
//! println!("{:?}", tracker.snapshot());
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// Landmark frames from the face mesh detector
pub mod landmarks;

/// Yaw and roll estimation from landmark geometry
pub mod pose_estimation;

/// Signal filtering for smoothing pose estimates
pub mod filters;

/// Five-pose calibration and persistence
pub mod calibration;

/// Velocity cursor control
pub mod cursor_control;

/// Facial gesture state machines
pub mod gestures;

/// WebSocket broadcaster
pub mod broadcast;

/// Inbound landmark events
pub mod input;

/// Per-frame tracking pipeline
pub mod tracker;

/// Main application module
pub mod app;

pub use error::{Error, Result};
