//! Adaptive PID with anti-windup and a filtered derivative on measurement
//!
//! ```text
//! e  = setpoint - measurement
//! P  = Kp·e                      (× (1 + g·|e|) in adaptive mode)
//! I += Ki·e·dt                   (clamped to integral bounds with anti-windup)
//! D  = -Kd·lpf((m - m_prev)/dt)  (measurement, not error: no kick on setpoint steps)
//! u  = clamp(P + I + D, out_min, out_max)
//! ```
//!
//! With anti-windup on, an unclamped `|u|` above `windup_threshold × out_max`
//! bleeds the integral by 5% instead of resetting it.

use crate::config::PidConfig;
use crate::constants::control::{MIN_DT, WINDUP_BLEED};

/// Controller gains
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidGains {
    /// Proportional gain
    pub kp: f32,
    /// Integral gain
    pub ki: f32,
    /// Derivative gain
    pub kd: f32,
}

impl PidGains {
    /// Gains from their three terms
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// True when all three gains are finite
    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

impl From<&PidConfig> for PidGains {
    fn from(config: &PidConfig) -> Self {
        Self::new(config.kp, config.ki, config.kd)
    }
}

/// Persistable PID state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidState {
    /// Gains at snapshot time
    pub gains: PidGains,
    /// Integral accumulator
    pub integral: f32,
    /// Error at the last step
    pub previous_error: f32,
    /// Measurement at the last step, for derivative-on-measurement
    pub previous_measurement: f32,
    /// Smoothed measurement derivative
    pub filtered_derivative: f32,
}

/// Positional PID with anti-windup, a filtered derivative on the
/// measurement and optional adaptive proportional scaling
#[derive(Debug, Clone)]
pub struct PidController {
    config: PidConfig,
    integral: f32,
    previous_error: f32,
    previous_measurement: f32,
    filtered_derivative: f32,
}

impl PidController {
    /// Controller with cleared accumulators
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            integral: 0.0,
            previous_error: 0.0,
            previous_measurement: 0.0,
            filtered_derivative: 0.0,
        }
    }

    /// One control step; `dt` in seconds, non-positive values use 0.01
    pub fn compute(&mut self, setpoint: f32, measurement: f32, dt: f32) -> f32 {
        let dt = if dt > 0.0 { dt } else { MIN_DT };
        let c = &self.config;

        let error = setpoint - measurement;
        let mut proportional = c.kp * error;

        self.integral += c.ki * error * dt;
        if c.anti_windup {
            self.integral = self.integral.clamp(c.integral_min, c.integral_max);
        }

        let derivative = (measurement - self.previous_measurement) / dt;
        self.filtered_derivative =
            c.derivative_alpha * derivative + (1.0 - c.derivative_alpha) * self.filtered_derivative;
        let derivative_term = -c.kd * self.filtered_derivative;

        if c.adaptive {
            proportional *= 1.0 + c.adaptive_gain * libm::fabsf(error);
        }

        let output = proportional + self.integral + derivative_term;

        if c.anti_windup && libm::fabsf(output) > c.windup_threshold * c.output_max {
            self.integral *= WINDUP_BLEED;
        }

        self.previous_error = error;
        self.previous_measurement = measurement;

        output.clamp(c.output_min, c.output_max)
    }

    /// Current gains
    pub fn gains(&self) -> PidGains {
        PidGains::from(&self.config)
    }

    /// Replace the gains; accumulators are kept
    pub fn set_gains(&mut self, gains: PidGains) {
        self.config.kp = gains.kp;
        self.config.ki = gains.ki;
        self.config.kd = gains.kd;
    }

    /// Clamp the output to `[min, max]`
    pub fn set_output_limits(&mut self, min: f32, max: f32) {
        self.config.output_min = min;
        self.config.output_max = max;
    }

    /// Clamp the integral to `[min, max]`
    pub fn set_integral_limits(&mut self, min: f32, max: f32) {
        self.config.integral_min = min;
        self.config.integral_max = max;
    }

    /// `threshold` is a fraction of `output_max`
    pub fn enable_anti_windup(&mut self, enabled: bool, threshold: f32) {
        self.config.anti_windup = enabled;
        self.config.windup_threshold = threshold;
    }

    /// Derivative smoothing factor in [0, 1]
    pub fn set_derivative_filter(&mut self, alpha: f32) {
        self.config.derivative_alpha = alpha;
    }

    /// Scale the proportional term by `1 + gain × |error|`
    pub fn enable_adaptive(&mut self, enabled: bool, gain: f32) {
        self.config.adaptive = enabled;
        self.config.adaptive_gain = gain;
    }

    /// Configuration with the current gains
    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    /// Integral accumulator after the last step
    pub fn integral_term(&self) -> f32 {
        self.integral
    }

    /// Filtered derivative of the measurement, before the `-Kd` scaling
    pub fn derivative_term(&self) -> f32 {
        self.filtered_derivative
    }

    /// Proportional contribution of the last step, without adaptive scaling
    pub fn proportional_term(&self) -> f32 {
        self.previous_error * self.config.kp
    }

    /// Error at the last step
    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }

    /// Clear the accumulators; gains and limits stay
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.previous_measurement = 0.0;
        self.filtered_derivative = 0.0;
    }

    /// State to persist
    pub fn snapshot(&self) -> PidState {
        PidState {
            gains: self.gains(),
            integral: self.integral,
            previous_error: self.previous_error,
            previous_measurement: self.previous_measurement,
            filtered_derivative: self.filtered_derivative,
        }
    }

    /// Restore saved state; non-finite values fall back to a clean start
    pub fn restore(&mut self, state: PidState) {
        if state.gains.is_finite() {
            self.set_gains(state.gains);
        }
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        self.integral = finite(state.integral)
            .clamp(self.config.integral_min, self.config.integral_max);
        self.previous_error = finite(state.previous_error);
        self.previous_measurement = finite(state.previous_measurement);
        self.filtered_derivative = finite(state.filtered_derivative);
    }
}
