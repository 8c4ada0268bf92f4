//! Constants used throughout the application

/// Number of landmarks in a MediaPipe FaceMesh frame (without iris refinement)
pub const NUM_FACE_MESH_LANDMARKS: usize = 468;

/// Nose tip
pub const NOSE_TIP: usize = 1;

/// Outer eye corners
pub const L_EYE_OUT: usize = 33;
pub const R_EYE_OUT: usize = 263;

/// Inner eye corners
pub const L_EYE_IN: usize = 133;
pub const R_EYE_IN: usize = 362;

/// Eyelid midpoints
pub const L_EYE_UP: usize = 159;
pub const L_EYE_DN: usize = 145;
pub const R_EYE_UP: usize = 386;
pub const R_EYE_DN: usize = 374;

/// Mouth corners and lip midpoints
pub const MOUTH_L: usize = 61;
pub const MOUTH_R: usize = 291;
pub const MOUTH_UP: usize = 13;
pub const MOUTH_DN: usize = 14;

/// Left eyebrow point measured against the upper left eyelid
pub const L_BROW: usize = 105;

/// Added to ratio denominators
pub const RATIO_EPSILON: f64 = 1e-6;

/// Eye line slope below which roll is reported as level
pub const ROLL_DX_EPSILON: f64 = 1e-6;

/// Previous velocity magnitude that counts as "moving" inside the hysteresis gap
pub const VELOCITY_EPSILON: f64 = 1e-3;

/// Capacity of the blink timestamp window
pub const BLINK_HISTORY_CAPACITY: usize = 4;

/// Blinks needed for a mode change
pub const TRIPLE_BLINK_COUNT: usize = 3;

/// Default WebSocket endpoint
pub const DEFAULT_WS_HOST: &str = "127.0.0.1";
pub const DEFAULT_WS_PORT: u16 = 8765;

/// Default calibration file name
pub const DEFAULT_CALIBRATION_FILE: &str = "simple_head_calib.json";
