//! Constants for the reactor core
//!
//! Every tuning number the control loop depends on lives here, grouped by
//! the subsystem that owns it. Configuration defaults are built from these
//! values, so changing a constant changes the shipped default.
//!
//! ## Organization
//!
//! - **Sensors**: channel count, ADC scale and physical ranges
//! - **Fusion**: Kalman defaults, fault triggers and quality scoring
//! - **Twin**: predictor coefficients and model drift limits
//! - **Control**: PID defaults, mode laws and actuator mapping
//! - **Learning**: Q-learning hyperparameters and table shape
//! - **Timing**: loop cadences

/// Sensor channel layout and conversion ranges.
pub mod sensors;

/// Kalman filter, fault detection and quality parameters.
pub mod fusion;

/// Digital twin forecasting parameters.
pub mod twin;

/// Controller gains, limits and per-mode constants.
pub mod control;

/// Reinforcement learning hyperparameters.
pub mod learning;

/// Loop cadences.
pub mod timing;

pub use sensors::{CHANNEL_COUNT, RAW_FULL_SCALE};
pub use timing::{CONTROL_INTERVAL_MS, LEARNING_INTERVAL_MS, SAMPLING_INTERVAL_MS};
pub use twin::{MAX_ENERGY_USAGE, TARGET_POLLUTION};
