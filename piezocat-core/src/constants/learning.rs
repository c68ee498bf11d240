//! Reinforcement Learning Parameters

/// Pollutant buckets in the Q-table
pub const STATE_COUNT: usize = 5;

/// Output buckets in the Q-table
pub const ACTION_COUNT: usize = 10;

/// Pollutant thresholds separating the state buckets, in ppm
pub const STATE_THRESHOLDS: [f32; STATE_COUNT - 1] = [100.0, 200.0, 300.0, 400.0];

/// Output percent covered by one action bucket
pub const ACTION_BUCKET_WIDTH: f32 = 10.0;

/// Q-learning step size alpha
pub const LEARNING_RATE: f32 = 0.01;
/// Discount factor gamma
pub const DISCOUNT_FACTOR: f32 = 0.9;
/// Starting exploration rate epsilon
pub const INITIAL_EXPLORATION: f32 = 0.1;
/// Epsilon multiplier per iteration
pub const EXPLORATION_DECAY: f32 = 0.995;
/// Epsilon lower bound
pub const EXPLORATION_FLOOR: f32 = 0.01;

// ===== REWARD =====

/// Reward weight of removal efficiency
pub const REWARD_EFFICIENCY_WEIGHT: f32 = 0.5;
/// Reward weight of energy savings
pub const REWARD_ENERGY_WEIGHT: f32 = 0.3;
/// Reward weight of system health
pub const REWARD_HEALTH_WEIGHT: f32 = 0.2;

/// Rewards kept for the improvement estimate
pub const REWARD_HISTORY_LEN: usize = 50;

// ===== ADAPTATION =====

/// |error| above which gains are boosted
pub const GAIN_BOOST_ERROR: f32 = 50.0;

/// Kp multiplier while boosted
pub const KP_BOOST: f32 = 1.2;

/// Ki multiplier while boosted
pub const KI_SHRINK: f32 = 0.8;

/// Prediction error above which fusion weights shift
pub const WEIGHT_SHIFT_ERROR: f32 = 20.0;

/// Regression-source weight multiplier on a shift
pub const REGRESSION_SHRINK: f32 = 0.9;

/// Physical-model weight multiplier on a shift
pub const PHYSICAL_GROW: f32 = 1.1;

/// Learning iterations between parameter saves
pub const PERSIST_EVERY: u32 = 10;

/// Default RNG seed
pub const DEFAULT_SEED: u64 = 0x5EED_CA7A;
