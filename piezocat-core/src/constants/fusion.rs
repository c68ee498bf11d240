//! Fusion Engine Parameters

// ===== KALMAN DEFAULTS =====

/// Starting estimate for every channel, mid-scale in raw counts
pub const KALMAN_INITIAL_ESTIMATE: f32 = 250.0;

/// Starting estimate-error variance
pub const KALMAN_INITIAL_ERROR: f32 = 1.0;

/// Process noise added at every predict step
pub const KALMAN_PROCESS_NOISE: f32 = 0.1;

/// Measurement noise of the raw samples
pub const KALMAN_MEASUREMENT_NOISE: f32 = 0.5;

// ===== FAULT DETECTION =====

/// Lowest plausible raw reading
///
/// Anything below points at a disconnected sensor or a shorted line.
pub const PLAUSIBLE_RAW_MIN: f32 = 50.0;

/// Highest plausible raw reading
pub const PLAUSIBLE_RAW_MAX: f32 = 1000.0;

/// An out-of-range condition held this long is a persistent fault
pub const PERSISTENT_FAULT_MS: u32 = 5000;

/// Relative change between consecutive raw readings treated as a jump
pub const JUMP_THRESHOLD: f32 = 0.3;

/// A jump condition held this long marks the channel faulty
pub const JUMP_HOLD_MS: u32 = 1000;

// ===== QUALITY =====

/// Readings in each channel's stability window
pub const STABILITY_WINDOW: usize = 5;

/// Upper clamp on the dispersion term of the stability score
pub const STABILITY_CLAMP: f32 = 0.5;

/// Weight of stability in the quality score
pub const QUALITY_STABILITY_WEIGHT: f32 = 0.7;

/// Weight of (1 - dispersion) in the quality score
pub const QUALITY_VARIANCE_WEIGHT: f32 = 0.3;

/// Added to the window mean before dividing
pub const QUALITY_EPSILON: f32 = 0.001;

// ===== SOURCE BLEND =====

/// Pollutant estimate sources blended by learned weights
pub const SOURCE_COUNT: usize = 4;

/// Equal starting weight for each source
pub const SOURCE_DEFAULT_WEIGHT: f32 = 0.25;
