//! Sensor Channel Layout
//!
//! The reactor carries five analog sensors sampled through a 10-bit ADC.
//! Raw counts are mapped linearly onto each channel's physical range.

/// Number of sensor channels in every vector
pub const CHANNEL_COUNT: usize = 5;

/// Full-scale ADC reading (10-bit converter)
pub const RAW_FULL_SCALE: f32 = 1023.0;

// ===== PHYSICAL RANGES =====

/// Flow velocity range in cm/s
pub const FLOW_RANGE: (f32, f32) = (0.0, 100.0);

/// Pollutant concentration range in ppm
pub const POLLUTANT_RANGE: (f32, f32) = (0.0, 500.0);

/// Light intensity range in lux
pub const LIGHT_RANGE: (f32, f32) = (0.0, 1000.0);

/// pH scale
pub const PH_RANGE: (f32, f32) = (0.0, 14.0);

/// Water temperature range in °C
pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 100.0);

/// Influent pollutant level treated as 0% removal efficiency
pub const INFLUENT_REFERENCE_PPM: f32 = 500.0;

// ===== CALIBRATION =====

/// Added to the raw reading when deriving a calibration gain
pub const CALIBRATION_EPSILON: f32 = 0.001;

/// Smallest raw reading accepted as a calibration reference, in counts
pub const MIN_CALIBRATION_COUNTS: f32 = 1.0;
