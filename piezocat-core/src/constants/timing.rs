//! Loop Cadences

/// Sensor read, fusion and forecast
pub const SAMPLING_INTERVAL_MS: u32 = 1000;

/// Control computation and actuation
pub const CONTROL_INTERVAL_MS: u32 = 100;

/// One reinforcement learning iteration
pub const LEARNING_INTERVAL_MS: u32 = 60_000;

/// Time step handed to the PID, matching the control cadence
pub const CONTROL_DT_S: f32 = CONTROL_INTERVAL_MS as f32 / 1000.0;
