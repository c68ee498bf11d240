//! Reactor model parameters and their slow drift

use crate::constants::twin::{
    DEGRADATION_DECAY, DEGRADATION_FLOOR, FLOW_REFERENCE, INITIAL_MASS_TRANSFER,
    INITIAL_REACTION_RATE, LIGHT_REFERENCE, RATE_DECAY, RATE_FLOOR,
};
use crate::time::Timestamp;

/// Physical model of the reactor, owned by the forecaster
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReactorModel {
    /// Measured removal efficiency as a fraction
    pub efficiency: f32,
    /// Measured energy usage as a fraction
    pub energy_factor: f32,
    /// Catalyst effectiveness in [0.5, 1]
    pub degradation: f32,
    /// Kinetic reaction-rate constant, never below 0.01
    pub reaction_rate: f32,
    /// Mass-transfer coefficient
    pub mass_transfer: f32,
    /// Time of the last drift update
    pub last_update: Timestamp,
}

impl Default for ReactorModel {
    fn default() -> Self {
        Self {
            efficiency: 1.0,
            energy_factor: 1.0,
            degradation: 1.0,
            reaction_rate: INITIAL_REACTION_RATE,
            mass_transfer: INITIAL_MASS_TRANSFER,
            last_update: 0,
        }
    }
}

impl ReactorModel {
    /// Reaction rate scaled by flow and light intensity
    pub fn effective_rate(&self, flow: f32, light: f32) -> f32 {
        self.reaction_rate
            * (1.0 + 0.1 * flow / FLOW_REFERENCE)
            * (1.0 + 0.05 * light / LIGHT_REFERENCE)
    }

    /// Apply one tick of drift
    ///
    /// The reaction rate only decays after a prediction miss larger than
    /// `threshold`. Catalyst wear happens every tick regardless.
    pub fn drift(&mut self, prediction_error: f32, threshold: f32, now: Timestamp) {
        if prediction_error > threshold {
            self.reaction_rate = (self.reaction_rate * RATE_DECAY).max(RATE_FLOOR);
        }
        self.degradation = (self.degradation * DEGRADATION_DECAY).max(DEGRADATION_FLOOR);
        self.last_update = now;
    }

    /// Follow the measured plant figures (percent inputs)
    pub fn track_plant(&mut self, efficiency_pct: f32, energy_pct: f32) {
        if efficiency_pct.is_finite() {
            self.efficiency = efficiency_pct / 100.0;
        }
        if energy_pct.is_finite() {
            self.energy_factor = energy_pct / 100.0;
        }
    }

    /// Force a restored model back inside its invariants
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.degradation.is_finite() {
            self.degradation = defaults.degradation;
        }
        if !self.reaction_rate.is_finite() {
            self.reaction_rate = defaults.reaction_rate;
        }
        self.degradation = self.degradation.clamp(DEGRADATION_FLOOR, 1.0);
        self.reaction_rate = self.reaction_rate.max(RATE_FLOOR);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_decays_only_on_large_error() {
        let mut model = ReactorModel::default();
        model.drift(5.0, 10.0, 100);
        assert_eq!(model.reaction_rate, 0.1);
        assert!((model.degradation - 0.999).abs() < 1e-6);
        assert_eq!(model.last_update, 100);

        model.drift(15.0, 10.0, 200);
        assert!((model.reaction_rate - 0.095).abs() < 1e-6);
    }

    #[test]
    fn floors_hold_after_long_runs() {
        let mut model = ReactorModel::default();
        for t in 0..5000 {
            model.drift(100.0, 10.0, t);
        }
        assert_eq!(model.reaction_rate, 0.01);
        assert_eq!(model.degradation, 0.5);
    }

    #[test]
    fn effective_rate_grows_with_flow_and_light() {
        let model = ReactorModel::default();
        assert_eq!(model.effective_rate(0.0, 0.0), 0.1);
        let rate = model.effective_rate(50.0, 500.0);
        assert!((rate - 0.1 * 1.1 * 1.05).abs() < 1e-6);
    }

    #[test]
    fn sanitize_restores_invariants() {
        let model = ReactorModel {
            degradation: 3.0,
            reaction_rate: -1.0,
            ..ReactorModel::default()
        }
        .sanitized();
        assert_eq!(model.degradation, 1.0);
        assert_eq!(model.reaction_rate, 0.01);
    }
}
