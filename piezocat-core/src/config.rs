//! Reactor configuration
//!
//! One aggregate, [`ReactorConfig`], carries every tunable of the core. The
//! defaults are the values the reactor ships with (see [`crate::constants`]).
//! Sub-configs expose `with_*` builders so a test or host can change one
//! knob without spelling out the rest:
//!
//! ```rust
//! use piezocat_core::config::{PidConfig, ReactorConfig};
//!
//! let config = ReactorConfig::default()
//!     .with_pid(PidConfig::default().with_gains(2.0, 0.0, 0.0).with_adaptive(0.2));
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::{control, fusion, learning, sensors, timing, twin};
use crate::errors::{ReactorError, ReactorResult};

/// Complete configuration of the reactor core
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReactorConfig {
    /// Loop cadences
    pub timing: TimingConfig,
    /// Kalman filtering, fault detection and conversion
    pub fusion: FusionConfig,
    /// Digital twin
    pub twin: TwinConfig,
    /// Controller and actuator
    pub control: ControlConfig,
    /// Reinforcement learner
    pub learning: LearningConfig,
}

impl ReactorConfig {
    /// Replace the timing block
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Replace the fusion block
    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    /// Replace the twin block
    pub fn with_twin(mut self, twin: TwinConfig) -> Self {
        self.twin = twin;
        self
    }

    /// Replace the control block, PID included
    pub fn with_control(mut self, control: ControlConfig) -> Self {
        self.control = control;
        self
    }

    /// Replace only the PID block of the control config
    pub fn with_pid(mut self, pid: PidConfig) -> Self {
        self.control.pid = pid;
        self
    }

    /// Replace the learning block
    pub fn with_learning(mut self, learning: LearningConfig) -> Self {
        self.learning = learning;
        self
    }

    /// Check every sub-config for internally inconsistent values
    pub fn validate(&self) -> ReactorResult<()> {
        self.timing.validate()?;
        self.fusion.validate()?;
        self.twin.validate()?;
        self.control.validate()?;
        self.learning.validate()
    }
}

fn invalid(reason: &'static str) -> ReactorError {
    ReactorError::InvalidConfig { reason }
}

/// Loop cadences in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Read, fuse and forecast
    pub sampling_ms: u32,
    /// Decide and actuate
    pub control_ms: u32,
    /// One learning iteration
    pub learning_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sampling_ms: timing::SAMPLING_INTERVAL_MS,
            control_ms: timing::CONTROL_INTERVAL_MS,
            learning_ms: timing::LEARNING_INTERVAL_MS,
        }
    }
}

impl TimingConfig {
    /// Set all three cadences at once
    pub fn with_intervals(mut self, sampling_ms: u32, control_ms: u32, learning_ms: u32) -> Self {
        self.sampling_ms = sampling_ms;
        self.control_ms = control_ms;
        self.learning_ms = learning_ms;
        self
    }

    /// PID time step in seconds derived from the control cadence
    pub fn control_dt(&self) -> f32 {
        self.control_ms as f32 / 1000.0
    }

    fn validate(&self) -> ReactorResult<()> {
        if self.sampling_ms == 0 || self.control_ms == 0 || self.learning_ms == 0 {
            return Err(invalid("intervals must be non-zero"));
        }
        Ok(())
    }
}

/// Kalman, fault detection and conversion parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusionConfig {
    /// Kalman estimate before the first sample, in counts
    pub initial_estimate: f32,
    /// Kalman error covariance before the first sample
    pub initial_error: f32,
    /// Kalman process noise Q
    pub process_noise: f32,
    /// Kalman measurement noise R
    pub measurement_noise: f32,
    /// Plausible raw range, inclusive
    pub plausible_min: f32,
    /// Upper bound of the plausible raw range
    pub plausible_max: f32,
    /// Time out of range before a fault counts as persistent
    pub persistent_fault_ms: u32,
    /// Relative jump between consecutive raw readings
    pub jump_threshold: f32,
    /// How long a jump must hold before the channel is flagged
    pub jump_hold_ms: u32,
    /// Raw ADC counts at full scale
    pub raw_full_scale: f32,
    /// Physical (min, max) per channel in `Channel` order
    pub channel_ranges: [(f32, f32); sensors::CHANNEL_COUNT],
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            initial_estimate: fusion::KALMAN_INITIAL_ESTIMATE,
            initial_error: fusion::KALMAN_INITIAL_ERROR,
            process_noise: fusion::KALMAN_PROCESS_NOISE,
            measurement_noise: fusion::KALMAN_MEASUREMENT_NOISE,
            plausible_min: fusion::PLAUSIBLE_RAW_MIN,
            plausible_max: fusion::PLAUSIBLE_RAW_MAX,
            persistent_fault_ms: fusion::PERSISTENT_FAULT_MS,
            jump_threshold: fusion::JUMP_THRESHOLD,
            jump_hold_ms: fusion::JUMP_HOLD_MS,
            raw_full_scale: sensors::RAW_FULL_SCALE,
            channel_ranges: [
                sensors::FLOW_RANGE,
                sensors::POLLUTANT_RANGE,
                sensors::LIGHT_RANGE,
                sensors::PH_RANGE,
                sensors::TEMPERATURE_RANGE,
            ],
        }
    }
}

impl FusionConfig {
    /// Set process noise (higher = less trust in the previous estimate)
    pub fn with_process_noise(mut self, noise: f32) -> Self {
        self.process_noise = noise;
        self
    }

    /// Set measurement noise (higher = less trust in the raw sample)
    pub fn with_measurement_noise(mut self, noise: f32) -> Self {
        self.measurement_noise = noise;
        self
    }

    /// Start every filter at `estimate` with error covariance `error`
    pub fn with_initial_estimate(mut self, estimate: f32, error: f32) -> Self {
        self.initial_estimate = estimate;
        self.initial_error = error;
        self
    }

    /// Raw counts outside `[min, max]` are range faults
    pub fn with_plausible_range(mut self, min: f32, max: f32) -> Self {
        self.plausible_min = min;
        self.plausible_max = max;
        self
    }

    /// Fault timers in milliseconds
    ///
    /// A range fault held past `persistent_ms` becomes persistent. A jump
    /// is only flagged once it has held past `jump_hold_ms`.
    pub fn with_fault_timing(mut self, persistent_ms: u32, jump_hold_ms: u32) -> Self {
        self.persistent_fault_ms = persistent_ms;
        self.jump_hold_ms = jump_hold_ms;
        self
    }

    fn validate(&self) -> ReactorResult<()> {
        if !(self.process_noise >= 0.0) || !(self.measurement_noise > 0.0) {
            return Err(invalid("kalman noise must be positive"));
        }
        if !(self.initial_error >= 0.0) {
            return Err(invalid("kalman initial error must be non-negative"));
        }
        if !(self.plausible_min < self.plausible_max) {
            return Err(invalid("plausible range is empty"));
        }
        if !(self.jump_threshold > 0.0) {
            return Err(invalid("jump threshold must be positive"));
        }
        if !(self.raw_full_scale > 0.0) {
            return Err(invalid("raw full scale must be positive"));
        }
        if self.channel_ranges.iter().any(|(lo, hi)| !(lo < hi)) {
            return Err(invalid("channel range is empty"));
        }
        Ok(())
    }
}

/// Digital twin parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TwinConfig {
    /// Baseline optimal setpoint in ppm
    pub target_pollution: f32,
    /// Energy usage cap in percent
    pub max_energy_usage: f32,
    /// Autoregressive prediction used until history is long enough, ppm
    pub ar_default: f32,
    /// Kinetic predictor horizon
    pub kinetic_horizon: f32,
    /// Absolute error that triggers reaction-rate decay
    pub drift_threshold: f32,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            target_pollution: twin::TARGET_POLLUTION,
            max_energy_usage: twin::MAX_ENERGY_USAGE,
            ar_default: twin::AR_DEFAULT_PREDICTION,
            kinetic_horizon: twin::KINETIC_HORIZON,
            drift_threshold: twin::DRIFT_ERROR_THRESHOLD,
        }
    }
}

impl TwinConfig {
    /// Set the baseline optimal setpoint, ppm
    pub fn with_target(mut self, target_pollution: f32) -> Self {
        self.target_pollution = target_pollution;
        self
    }

    /// Set the energy usage cap, percent
    pub fn with_energy_cap(mut self, max_energy_usage: f32) -> Self {
        self.max_energy_usage = max_energy_usage;
        self
    }

    fn validate(&self) -> ReactorResult<()> {
        if !self.target_pollution.is_finite() || self.target_pollution < 0.0 {
            return Err(invalid("target pollution must be a non-negative number"));
        }
        if !(self.max_energy_usage > 0.0) {
            return Err(invalid("energy cap must be positive"));
        }
        if !(self.kinetic_horizon >= 0.0) || !(self.drift_threshold >= 0.0) {
            return Err(invalid("twin horizon and drift threshold must be non-negative"));
        }
        Ok(())
    }
}

/// PID controller parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f32,
    /// Integral gain
    pub ki: f32,
    /// Derivative gain
    pub kd: f32,
    /// Output floor
    pub output_min: f32,
    /// Output ceiling
    pub output_max: f32,
    /// Integral clamp, lower bound
    pub integral_min: f32,
    /// Integral clamp, upper bound
    pub integral_max: f32,
    /// Bleed off the integral near saturation
    pub anti_windup: bool,
    /// Fraction of `output_max` above which the integral bleeds off
    pub windup_threshold: f32,
    /// Derivative smoothing factor in [0, 1]
    pub derivative_alpha: f32,
    /// Scale the proportional term with the error magnitude
    pub adaptive: bool,
    /// Strength of the adaptive scaling
    pub adaptive_gain: f32,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: control::PID_KP,
            ki: control::PID_KI,
            kd: control::PID_KD,
            output_min: control::OUTPUT_MIN,
            output_max: control::OUTPUT_MAX,
            integral_min: control::INTEGRAL_MIN,
            integral_max: control::INTEGRAL_MAX,
            anti_windup: true,
            windup_threshold: control::WINDUP_THRESHOLD,
            derivative_alpha: control::DERIVATIVE_ALPHA,
            adaptive: false,
            adaptive_gain: control::ADAPTIVE_GAIN,
        }
    }
}

impl PidConfig {
    /// Set kp, ki and kd
    pub fn with_gains(mut self, kp: f32, ki: f32, kd: f32) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// Clamp the output to `[min, max]`
    pub fn with_output_limits(mut self, min: f32, max: f32) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    /// Clamp the integral to `[min, max]`
    pub fn with_integral_limits(mut self, min: f32, max: f32) -> Self {
        self.integral_min = min;
        self.integral_max = max;
        self
    }

    /// Toggle anti-windup; `threshold` is a fraction of `output_max`
    pub fn with_anti_windup(mut self, enabled: bool, threshold: f32) -> Self {
        self.anti_windup = enabled;
        self.windup_threshold = threshold;
        self
    }

    /// Derivative smoothing, 0 disables filtering
    pub fn with_derivative_alpha(mut self, alpha: f32) -> Self {
        self.derivative_alpha = alpha;
        self
    }

    /// Enable adaptive proportional scaling with the given gain
    pub fn with_adaptive(mut self, gain: f32) -> Self {
        self.adaptive = true;
        self.adaptive_gain = gain;
        self
    }

    fn validate(&self) -> ReactorResult<()> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(invalid("pid gains must be finite"));
        }
        if !(self.output_min < self.output_max) {
            return Err(invalid("pid output range is empty"));
        }
        if !(self.integral_min <= self.integral_max) {
            return Err(invalid("pid integral range is inverted"));
        }
        if !(0.0..=1.0).contains(&self.derivative_alpha) {
            return Err(invalid("derivative alpha must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Law used by the standard mode and the modes built on top of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StandardLaw {
    /// Plain adaptive PID
    #[default]
    Pid,
    /// PID scaled by a fuzzy gain factor
    FuzzyPid,
}

/// Controller parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlConfig {
    /// PID used by the PID-based modes
    pub pid: PidConfig,
    /// Law behind the standard mode
    pub standard_law: StandardLaw,
    /// Fixed output in maintenance mode, percent
    pub maintenance_output: f32,
    /// Output scale in energy-saving mode
    pub energy_saving_scale: f32,
    /// Output boost in shock-load mode
    pub shock_load_scale: f32,
    /// Output step of the cost search, percent
    pub cost_search_step: f32,
    /// Native actuator value at 0% output
    pub actuator_min: f32,
    /// Native actuator value at 100% output
    pub actuator_max: f32,
    /// Energy consumed per percent of output
    pub energy_per_output: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pid: PidConfig::default(),
            standard_law: StandardLaw::default(),
            maintenance_output: control::MAINTENANCE_OUTPUT,
            energy_saving_scale: control::ENERGY_SAVING_SCALE,
            shock_load_scale: control::SHOCK_LOAD_SCALE,
            cost_search_step: control::COST_SEARCH_STEP,
            actuator_min: control::ACTUATOR_NATIVE_MIN,
            actuator_max: control::ACTUATOR_NATIVE_MAX,
            energy_per_output: control::ENERGY_PER_OUTPUT,
        }
    }
}

impl ControlConfig {
    /// Pick the law behind the standard mode
    pub fn with_standard_law(mut self, law: StandardLaw) -> Self {
        self.standard_law = law;
        self
    }

    /// Native actuator range that 0..100% maps onto
    pub fn with_actuator_range(mut self, min: f32, max: f32) -> Self {
        self.actuator_min = min;
        self.actuator_max = max;
        self
    }

    fn validate(&self) -> ReactorResult<()> {
        self.pid.validate()?;
        if !(self.cost_search_step > 0.0) {
            return Err(invalid("cost search step must be positive"));
        }
        if !(self.energy_saving_scale >= 0.0) || !(self.shock_load_scale >= 0.0) {
            return Err(invalid("mode scales must be non-negative"));
        }
        if !self.maintenance_output.is_finite() {
            return Err(invalid("maintenance output must be finite"));
        }
        if !(self.actuator_min.is_finite() && self.actuator_max.is_finite()) {
            return Err(invalid("actuator range must be finite"));
        }
        Ok(())
    }
}

/// Reinforcement learning parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningConfig {
    /// Learning runs only when enabled
    pub enabled: bool,
    /// Q-learning step size alpha
    pub learning_rate: f32,
    /// Discount factor gamma
    pub discount: f32,
    /// Starting exploration rate epsilon
    pub initial_exploration: f32,
    /// Multiplicative epsilon decay per iteration
    pub exploration_decay: f32,
    /// Epsilon never decays below this
    pub exploration_floor: f32,
    /// RNG seed for exploration
    pub seed: u64,
    /// Iterations between parameter saves, 0 disables saving
    pub persist_every: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            learning_rate: learning::LEARNING_RATE,
            discount: learning::DISCOUNT_FACTOR,
            initial_exploration: learning::INITIAL_EXPLORATION,
            exploration_decay: learning::EXPLORATION_DECAY,
            exploration_floor: learning::EXPLORATION_FLOOR,
            seed: learning::DEFAULT_SEED,
            persist_every: learning::PERSIST_EVERY,
        }
    }
}

impl LearningConfig {
    /// Set alpha and gamma
    pub fn with_rates(mut self, learning_rate: f32, discount: f32) -> Self {
        self.learning_rate = learning_rate;
        self.discount = discount;
        self
    }

    /// Set the exploration schedule
    pub fn with_exploration(mut self, initial: f32, decay: f32, floor: f32) -> Self {
        self.initial_exploration = initial;
        self.exploration_decay = decay;
        self.exploration_floor = floor;
        self
    }

    /// Seed the exploration RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Turn learning on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn validate(&self) -> ReactorResult<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(invalid("learning rate must be within (0, 1]"));
        }
        if !(self.discount >= 0.0 && self.discount < 1.0) {
            return Err(invalid("discount must be within [0, 1)"));
        }
        if !(self.exploration_decay > 0.0 && self.exploration_decay <= 1.0) {
            return Err(invalid("exploration decay must be within (0, 1]"));
        }
        if !(self.exploration_floor >= 0.0 && self.exploration_floor <= self.initial_exploration)
            || self.initial_exploration > 1.0
        {
            return Err(invalid("exploration floor must not exceed the initial rate"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ReactorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.control_dt(), 0.1);
        assert_eq!(config.control.pid.kp, 1.0);
        assert!(config.control.pid.anti_windup);
        assert!(!config.control.pid.adaptive);
        assert_eq!(config.fusion.channel_ranges[1], (0.0, 500.0));
    }

    #[test]
    fn inconsistent_values_are_rejected() {
        let config = ReactorConfig::default()
            .with_pid(PidConfig::default().with_output_limits(100.0, 0.0));
        assert!(matches!(
            config.validate(),
            Err(ReactorError::InvalidConfig { .. })
        ));

        let config = ReactorConfig::default()
            .with_learning(LearningConfig::default().with_rates(0.1, 1.0));
        assert!(config.validate().is_err());

        let config = ReactorConfig::default()
            .with_fusion(FusionConfig::default().with_measurement_noise(f32::NAN));
        assert!(config.validate().is_err());

        let config = ReactorConfig::default().with_timing(TimingConfig::default().with_intervals(0, 100, 1000));
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_round_trips_through_json() {
        let config = ReactorConfig::default()
            .with_control(ControlConfig::default().with_standard_law(StandardLaw::FuzzyPid));
        let json = serde_json::to_string(&config).unwrap();
        let back: ReactorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
