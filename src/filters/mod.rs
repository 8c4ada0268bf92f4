//! Signal filtering for pose measurements and windowed statistics.
//!
//! Raw yaw and roll are noisy frame to frame; the exponential smoother
//! damps them before they reach the velocity controller, and the median
//! is used wherever a window of samples is reduced to one robust value.

/// Exponential moving average with first-sample seeding and jump rejection
pub mod exponential;

/// Median of a sample window
pub mod median;

pub use exponential::{ExponentialSmoother, PoseSmoother};
pub use median::median;
