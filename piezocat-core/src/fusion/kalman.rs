//! Scalar Kalman filter, one per sensor channel
//!
//! Each channel is modelled as a constant with additive process noise, so
//! the full matrix form collapses to four scalar equations:
//!
//! ```text
//! Predict:  P⁻ = P + Q
//! Gain:     K  = P⁻ / (P⁻ + R)
//! Update:   x  = x + K·(z - x)
//!           P  = (1 - K)·P⁻
//! ```
//!
//! With `Q, R > 0` the gain stays in `[0, 1)` and the error variance
//! converges to the steady-state value instead of growing.

use crate::config::FusionConfig;

/// Filter state owned by the fusion engine for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarKalman {
    /// Current estimate
    pub estimate: f32,
    /// Estimate-error variance (P)
    pub error: f32,
    /// Process noise (Q)
    pub process_noise: f32,
    /// Measurement noise (R)
    pub measurement_noise: f32,
    last_gain: f32,
}

impl ScalarKalman {
    /// Filter starting from `estimate` with error covariance `error`
    pub fn new(estimate: f32, error: f32, process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            estimate,
            error,
            process_noise,
            measurement_noise,
            last_gain: 0.0,
        }
    }

    /// Filter at the configured initial state
    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            config.initial_estimate,
            config.initial_error,
            config.process_noise,
            config.measurement_noise,
        )
    }

    /// Run one predict/update cycle and return the corrected estimate
    pub fn update(&mut self, measurement: f32) -> f32 {
        let predicted_error = self.error + self.process_noise;
        let denominator = predicted_error + self.measurement_noise;

        // Q = R = 0 would divide by zero; hold the estimate instead
        let gain = if denominator > 0.0 {
            predicted_error / denominator
        } else {
            0.0
        };

        self.estimate += gain * (measurement - self.estimate);
        self.error = (1.0 - gain) * predicted_error;
        self.last_gain = gain;

        self.estimate
    }

    /// Gain applied by the most recent update
    pub fn last_gain(&self) -> f32 {
        self.last_gain
    }

    /// Retune Q and R; the estimate and error are kept
    pub fn set_noise(&mut self, process_noise: f32, measurement_noise: f32) {
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
    }
}
