//! Digital Twin Parameters

/// Pollutant concentration the controller aims for, in ppm
pub const TARGET_POLLUTION: f32 = 100.0;

/// Energy usage cap in percent
pub const MAX_ENERGY_USAGE: f32 = 80.0;

/// Fraction of the energy cap above which health and mode advisories react
pub const ENERGY_ALERT_FRACTION: f32 = 0.8;

/// Samples kept in each twin history
pub const HISTORY_LEN: usize = 20;

/// Points used for the performance trend
pub const TREND_WINDOW: usize = 3;

// ===== PREDICTORS =====

/// Number of fused pollutant predictors
pub const PREDICTOR_COUNT: usize = 3;

/// Starting weight of each predictor
pub const PREDICTOR_INITIAL_WEIGHT: f32 = 0.333;

/// Weight of the latest sample in the autoregressive predictor
pub const AR_LATEST_COEFF: f32 = 0.8;

/// Weight of the second-latest sample in the autoregressive predictor
pub const AR_PREVIOUS_COEFF: f32 = 0.2;

/// Autoregressive fallback with fewer than two samples
pub const AR_DEFAULT_PREDICTION: f32 = 250.0;

/// Forecast horizon of the kinetic predictor
pub const KINETIC_HORIZON: f32 = 1.0;

/// Flow normaliser in the effective reaction rate
pub const FLOW_REFERENCE: f32 = 50.0;

/// Light normaliser in the effective reaction rate
pub const LIGHT_REFERENCE: f32 = 500.0;

// ===== FORECAST SHAPING =====

/// Trend sensitivity of the efficiency forecast
pub const EFFICIENCY_TREND_GAIN: f32 = 0.1;

/// Catalyst temperature above which life shortens
pub const LIFE_REFERENCE_TEMP: f32 = 25.0;

/// Life lost per °C above the reference
pub const LIFE_TEMP_COEFF: f32 = 0.01;

/// Life lost per ppm of pollutant
pub const LIFE_POLLUTION_COEFF: f32 = 0.0005;

/// Health below which the setpoint is relaxed and maintenance advised
pub const HEALTH_THRESHOLD: f32 = 70.0;

/// Setpoint relaxation factor when health is low
pub const SETPOINT_RELAX: f32 = 1.2;

/// Trend above which the setpoint is tightened
pub const SETPOINT_TREND_THRESHOLD: f32 = 0.1;

/// Setpoint tightening factor on an improving trend
pub const SETPOINT_TIGHTEN: f32 = 0.9;

/// Efficiency below which health is penalised
pub const HEALTH_EFFICIENCY_FLOOR: f32 = 60.0;

/// Health penalty for low efficiency
pub const HEALTH_EFFICIENCY_PENALTY: f32 = 0.8;

/// Health penalty for high energy use
pub const HEALTH_ENERGY_PENALTY: f32 = 0.9;

// ===== MODEL DRIFT =====

/// Absolute prediction error that triggers rate decay
pub const DRIFT_ERROR_THRESHOLD: f32 = 10.0;

/// Reaction-rate decay factor on a bad prediction
pub const RATE_DECAY: f32 = 0.95;

/// Reaction-rate floor
pub const RATE_FLOOR: f32 = 0.01;

/// Catalyst wear per tick
pub const DEGRADATION_DECAY: f32 = 0.999;

/// Catalyst never drops below half effectiveness
pub const DEGRADATION_FLOOR: f32 = 0.5;

/// Reaction-rate constant at startup
pub const INITIAL_REACTION_RATE: f32 = 0.1;

/// Mass-transfer coefficient at startup
pub const INITIAL_MASS_TRANSFER: f32 = 0.05;
