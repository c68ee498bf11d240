//! Controller Parameters

// ===== PID DEFAULTS =====

/// Proportional gain
pub const PID_KP: f32 = 1.0;
/// Integral gain
pub const PID_KI: f32 = 0.1;
/// Derivative gain
pub const PID_KD: f32 = 0.05;

/// Output floor in percent
pub const OUTPUT_MIN: f32 = 0.0;
/// Output ceiling in percent
pub const OUTPUT_MAX: f32 = 100.0;

/// Integral accumulator floor
pub const INTEGRAL_MIN: f32 = -1000.0;
/// Integral accumulator ceiling
pub const INTEGRAL_MAX: f32 = 1000.0;

/// Fraction of `OUTPUT_MAX` above which the integral bleeds off
pub const WINDUP_THRESHOLD: f32 = 0.8;

/// Integral bleed factor while saturated
pub const WINDUP_BLEED: f32 = 0.95;

/// Smoothing factor of the derivative filter
pub const DERIVATIVE_ALPHA: f32 = 0.3;

/// Proportional scaling per unit of |error| in adaptive mode
pub const ADAPTIVE_GAIN: f32 = 0.1;

/// Substituted for a non-positive time step
pub const MIN_DT: f32 = 0.01;

// ===== MODE LAWS =====

/// Fixed output held during maintenance
pub const MAINTENANCE_OUTPUT: f32 = 30.0;

/// Standard output scale in energy-saving mode
pub const ENERGY_SAVING_SCALE: f32 = 0.7;

/// Standard output scale in shock-load mode
pub const SHOCK_LOAD_SCALE: f32 = 1.5;

/// Pollutant level above which shock-load mode is advised
pub const SHOCK_LOAD_POLLUTANT: f32 = 300.0;

/// Candidate spacing of the cost search
pub const COST_SEARCH_STEP: f32 = 20.0;

/// Pollutant removed per percent of output in the cost model
pub const COST_REMOVAL_PER_OUTPUT: f32 = 0.5;

/// Energy cost per percent of output
pub const COST_ENERGY_WEIGHT: f32 = 0.8;

/// Output above which the wear penalty applies
pub const COST_WEAR_KNEE: f32 = 80.0;

/// Wear penalty per percent above the knee
pub const COST_WEAR_WEIGHT: f32 = 2.0;

/// Cost search result when no candidate was evaluated
pub const COST_SEARCH_DEFAULT: f32 = 50.0;

// ===== ACTUATOR =====

/// Native actuator value at 0% output (servo degrees)
pub const ACTUATOR_NATIVE_MIN: f32 = 0.0;
/// Native actuator value at 100% output (servo degrees)
pub const ACTUATOR_NATIVE_MAX: f32 = 180.0;

/// Energy consumed per percent of output
pub const ENERGY_PER_OUTPUT: f32 = 0.8;

// ===== FUZZY =====

/// Maximum rules in the fuzzy rule base
pub const MAX_FUZZY_RULES: usize = 25;

/// Membership levels per input
pub const FUZZY_LEVELS: usize = 5;

/// Defuzzified value when no rule fires
pub const FUZZY_DEFAULT_OUTPUT: f32 = 0.5;
