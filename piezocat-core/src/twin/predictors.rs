//! Pollutant predictors and their adaptive weighting
//!
//! Three predictors with different failure modes are fused:
//!
//! | Index | Predictor | Basis |
//! |-------|-----------|-------|
//! | 0 | autoregressive | `0.8·y(t) + 0.2·y(t-1)` over the pollutant history |
//! | 1 | kinetic | `c · exp(-k_eff · h)` first-order decay |
//! | 2 | trend heuristic | `c · (1 + trend)` |
//!
//! Weights follow inverse-error allocation once the outcome is known:
//! `wᵢ = (E - eᵢ) / 2E` with `E = Σeᵢ`. The weights keep summing to 1 and
//! a perfect round (`E = 0`) leaves them untouched.

use crate::buffer::CircularBuffer;
use crate::constants::twin::{
    AR_LATEST_COEFF, AR_PREVIOUS_COEFF, HISTORY_LEN, PREDICTOR_COUNT, PREDICTOR_INITIAL_WEIGHT,
    TREND_WINDOW,
};

/// Rolling history used by the forecaster
pub type History = CircularBuffer<f32, HISTORY_LEN>;

/// Autoregressive prediction, `default` with fewer than two samples
pub fn autoregressive(history: &History, default: f32) -> f32 {
    match (history.latest(0), history.latest(1)) {
        (Some(latest), Some(previous)) => AR_LATEST_COEFF * latest + AR_PREVIOUS_COEFF * previous,
        _ => default,
    }
}

/// First-order kinetic decay over `horizon`
pub fn kinetic(pollutant: f32, effective_rate: f32, horizon: f32) -> f32 {
    pollutant * libm::expf(-effective_rate * horizon)
}

/// Current level extrapolated along the trend
///
/// Without a full trend window the current value is returned unchanged.
pub fn trend_heuristic(pollutant: f32, trend: f32, history: &History) -> f32 {
    if history.len() < TREND_WINDOW {
        return pollutant;
    }
    pollutant * (1.0 + trend)
}

/// Mean fractional change over the three most recent points
///
/// A step whose starting value is not positive contributes nothing, and
/// the sum is always divided by the two possible steps.
pub fn performance_trend(history: &History) -> f32 {
    if history.len() < TREND_WINDOW {
        return 0.0;
    }

    let mut trend = 0.0;
    for back in (0..TREND_WINDOW - 1).rev() {
        let (Some(prev), Some(next)) = (history.latest(back + 1), history.latest(back)) else {
            continue;
        };
        if prev > 0.0 {
            trend += (next - prev) / prev;
        }
    }
    trend / (TREND_WINDOW - 1) as f32
}

/// Relative error, absolute when the actual value is not positive
pub fn prediction_error(predicted: f32, actual: f32) -> f32 {
    if actual > 0.0 {
        libm::fabsf(predicted - actual) / actual
    } else {
        libm::fabsf(predicted - actual)
    }
}

/// Adaptive weights of the three predictors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictorWeights(pub [f32; PREDICTOR_COUNT]);

impl Default for PredictorWeights {
    fn default() -> Self {
        Self([PREDICTOR_INITIAL_WEIGHT; PREDICTOR_COUNT])
    }
}

impl PredictorWeights {
    /// Weighted sum of the predictor outputs
    pub fn fuse(&self, predictions: &[f32; PREDICTOR_COUNT]) -> f32 {
        self.0.iter().zip(predictions.iter()).map(|(w, p)| w * p).sum()
    }

    /// Re-allocate by inverse error against the observed value
    pub fn update(&mut self, actual: f32, predictions: &[f32; PREDICTOR_COUNT]) {
        let mut errors = [0.0; PREDICTOR_COUNT];
        for (e, &p) in errors.iter_mut().zip(predictions.iter()) {
            *e = prediction_error(p, actual);
        }

        let total: f32 = errors.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return;
        }
        for (w, e) in self.0.iter_mut().zip(errors.iter()) {
            *w = (total - e) / (2.0 * total);
        }
    }

    /// Weights in predictor order
    pub fn as_array(&self) -> [f32; PREDICTOR_COUNT] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(values: &[f32]) -> History {
        let mut h = History::new();
        for &v in values {
            h.push(v);
        }
        h
    }

    #[test]
    fn autoregressive_uses_newest_samples() {
        assert_eq!(autoregressive(&history(&[]), 250.0), 250.0);
        assert_eq!(autoregressive(&history(&[100.0]), 250.0), 250.0);
        let h = history(&[999.0, 100.0, 200.0]);
        assert!((autoregressive(&h, 250.0) - (0.8 * 200.0 + 0.2 * 100.0)).abs() < 1e-4);
    }

    #[test]
    fn kinetic_decays() {
        assert_eq!(kinetic(200.0, 0.0, 1.0), 200.0);
        assert!((kinetic(200.0, 0.1, 1.0) - 200.0 * libm::expf(-0.1)).abs() < 1e-4);
    }

    #[test]
    fn trend_over_last_three_points() {
        assert_eq!(performance_trend(&history(&[100.0, 110.0])), 0.0);

        // 100 → 110 (+0.1), 110 → 121 (+0.1)
        let h = history(&[5.0, 100.0, 110.0, 121.0]);
        assert!((performance_trend(&h) - 0.1).abs() < 1e-5);

        // Non-positive start skips that step but still divides by two
        let h = history(&[0.0, 100.0, 150.0]);
        assert!((performance_trend(&h) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn trend_heuristic_needs_full_window() {
        assert_eq!(trend_heuristic(200.0, 0.5, &history(&[1.0, 2.0])), 200.0);
        assert_eq!(trend_heuristic(200.0, 0.5, &history(&[1.0, 2.0, 3.0])), 300.0);
    }

    #[test]
    fn weights_favour_the_accurate_predictor() {
        let mut weights = PredictorWeights::default();
        weights.update(100.0, &[100.0, 150.0, 200.0]);

        // errors 0, 0.5, 1.0 → total 1.5
        let w = weights.as_array();
        assert!((w[0] - 0.5).abs() < 1e-6);
        assert!((w[1] - 1.0 / 3.0).abs() < 1e-6);
        assert!((w[2] - 1.0 / 6.0).abs() < 1e-6);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn perfect_round_keeps_weights() {
        let mut weights = PredictorWeights::default();
        weights.update(120.0, &[120.0; 3]);
        assert_eq!(weights, PredictorWeights::default());
    }

    #[test]
    fn absolute_error_for_non_positive_actual() {
        assert_eq!(prediction_error(3.0, 0.0), 3.0);
        assert_eq!(prediction_error(50.0, 100.0), 0.5);
    }
}
