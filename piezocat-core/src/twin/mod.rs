//! Digital Twin Forecaster
//!
//! ## Overview
//!
//! The forecaster keeps a small physical model of the reactor and short
//! rolling histories, and turns each fused [`SensorVector`] into a
//! [`TwinForecast`]:
//!
//! ```text
//!                 ┌─ autoregressive ─┐
//! SensorVector ───┼─ kinetic ────────┼─ weighted ─→ predicted pollution
//!                 └─ trend heuristic ┘
//!                 ├─ efficiency, remaining life
//!                 ├─ system health ─┐
//!                 ├─ trend ─────────┴─→ optimal setpoint
//!                 └─ model drift (rate decay, catalyst wear)
//! ```
//!
//! ## Ordering Within a Tick
//!
//! 1. Score last tick's per-predictor outputs against the pollutant level
//!    that has just been measured and re-weight the predictors.
//! 2. Compute the trend and every forecast field from the history *before*
//!    the current sample is appended.
//! 3. Append the current sample to the histories.
//! 4. Drift the model using `|measured - predicted|`.
//!
//! Health and trend are computed before the setpoint so the setpoint
//! adjustments always see this tick's values.

pub mod model;
pub mod predictors;

pub use model::ReactorModel;
pub use predictors::{History, PredictorWeights};

use crate::config::TwinConfig;
use crate::constants::sensors::CHANNEL_COUNT;
use crate::constants::twin::{
    EFFICIENCY_TREND_GAIN, ENERGY_ALERT_FRACTION, HEALTH_EFFICIENCY_FLOOR,
    HEALTH_EFFICIENCY_PENALTY, HEALTH_ENERGY_PENALTY, HEALTH_THRESHOLD, LIFE_POLLUTION_COEFF,
    LIFE_REFERENCE_TEMP, LIFE_TEMP_COEFF, PREDICTOR_COUNT, SETPOINT_RELAX, SETPOINT_TIGHTEN,
    SETPOINT_TREND_THRESHOLD,
};
use crate::sensor::SensorVector;

/// Forecast produced once per sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TwinForecast {
    /// Pollutant level expected at the next tick, ppm
    pub predicted_pollution: f32,
    /// Percent
    pub predicted_efficiency: f32,
    /// Remaining catalyst life, percent
    pub remaining_life: f32,
    /// Pollutant level the controller should hold, ppm
    pub optimal_setpoint: f32,
    /// Percent
    pub system_health: f32,
    /// Signed mean fractional change of the pollutant level
    pub performance_trend: f32,
}

/// System health from the sensor vector alone
///
/// `100 × working/5`, then ×0.8 below 60% efficiency and ×0.9 above 80% of
/// the energy cap.
pub fn system_health(sensors: &SensorVector, max_energy_usage: f32) -> f32 {
    let mut health = 100.0 * sensors.working_sensor_count() as f32 / CHANNEL_COUNT as f32;
    if sensors.efficiency < HEALTH_EFFICIENCY_FLOOR {
        health *= HEALTH_EFFICIENCY_PENALTY;
    }
    if sensors.energy_usage > max_energy_usage * ENERGY_ALERT_FRACTION {
        health *= HEALTH_ENERGY_PENALTY;
    }
    health
}

/// Setpoint adjusted for health and trend, relaxation applied first
pub fn optimal_setpoint(target: f32, health: f32, trend: f32) -> f32 {
    let mut setpoint = target;
    if health < HEALTH_THRESHOLD {
        setpoint *= SETPOINT_RELAX;
    }
    if trend > SETPOINT_TREND_THRESHOLD {
        setpoint *= SETPOINT_TIGHTEN;
    }
    setpoint
}

/// Multi-model forecaster with a slowly drifting reactor model
#[derive(Debug, Clone)]
pub struct TwinForecaster {
    config: TwinConfig,
    model: ReactorModel,
    weights: PredictorWeights,
    pollution: History,
    efficiency: History,
    energy: History,
    /// Per-predictor outputs awaiting the next measurement
    pending: Option<[f32; PREDICTOR_COUNT]>,
    current: TwinForecast,
}

impl TwinForecaster {
    /// Forecaster with a fresh model and empty histories
    pub fn new(config: TwinConfig) -> Self {
        Self {
            config,
            model: ReactorModel::default(),
            weights: PredictorWeights::default(),
            pollution: History::new(),
            efficiency: History::new(),
            energy: History::new(),
            pending: None,
            current: TwinForecast::default(),
        }
    }

    /// Produce this tick's forecast and advance the model
    pub fn forecast(&mut self, sensors: &SensorVector) -> TwinForecast {
        let pollutant = sensors.pollutant();

        if let Some(previous) = self.pending.take() {
            self.weights.update(pollutant, &previous);
        }

        let trend = self.performance_trend();
        let predictions = self.predictions(sensors, trend);
        let health = self.system_health(sensors);

        let forecast = TwinForecast {
            predicted_pollution: self.weights.fuse(&predictions),
            predicted_efficiency: self.predict_efficiency(sensors, trend),
            remaining_life: self.predict_remaining_life(sensors),
            optimal_setpoint: optimal_setpoint(self.config.target_pollution, health, trend),
            system_health: health,
            performance_trend: trend,
        };

        self.pollution.push(pollutant);
        self.efficiency.push(sensors.efficiency);
        self.energy.push(sensors.energy_usage);

        self.update_model(sensors, &forecast);
        self.pending = Some(predictions);
        self.current = forecast;

        forecast
    }

    /// Raw outputs of the three predictors for a vector
    pub fn predictions(&self, sensors: &SensorVector, trend: f32) -> [f32; PREDICTOR_COUNT] {
        let pollutant = sensors.pollutant();
        let rate = self.model.effective_rate(sensors.flow(), sensors.light());
        [
            predictors::autoregressive(&self.pollution, self.config.ar_default),
            predictors::kinetic(pollutant, rate, self.config.kinetic_horizon),
            predictors::trend_heuristic(pollutant, trend, &self.pollution),
        ]
    }

    /// Weighted pollutant prediction without advancing any state
    pub fn predict_pollution(&self, sensors: &SensorVector) -> f32 {
        let trend = self.performance_trend();
        self.weights.fuse(&self.predictions(sensors, trend))
    }

    /// Efficiency extrapolated along the pollution trend, percent
    pub fn predict_efficiency(&self, sensors: &SensorVector, trend: f32) -> f32 {
        (sensors.efficiency * (1.0 + EFFICIENCY_TREND_GAIN * trend)).clamp(0.0, 100.0)
    }

    /// Remaining catalyst life in percent
    ///
    /// Scaled by catalyst degradation, reduced by heat above the reference
    /// temperature and by the pollutant load.
    pub fn predict_remaining_life(&self, sensors: &SensorVector) -> f32 {
        let temperature_factor =
            1.0 - LIFE_TEMP_COEFF * (sensors.temperature() - LIFE_REFERENCE_TEMP).max(0.0);
        let pollution_factor = 1.0 - LIFE_POLLUTION_COEFF * sensors.pollutant();
        let life = 100.0 * self.model.degradation * temperature_factor * pollution_factor;
        life.clamp(0.0, 100.0)
    }

    /// Health score in [0, 100] for a vector
    pub fn system_health(&self, sensors: &SensorVector) -> f32 {
        system_health(sensors, self.config.max_energy_usage)
    }

    /// Slope of the recent pollution history
    pub fn performance_trend(&self) -> f32 {
        predictors::performance_trend(&self.pollution)
    }

    fn update_model(&mut self, sensors: &SensorVector, forecast: &TwinForecast) {
        let error = libm::fabsf(sensors.pollutant() - forecast.predicted_pollution);
        let rate_before = self.model.reaction_rate;

        self.model
            .drift(error, self.config.drift_threshold, sensors.timestamp);
        self.model.track_plant(sensors.efficiency, sensors.energy_usage);

        if self.model.reaction_rate < rate_before {
            log_debug!(
                "prediction missed by {}, reaction rate now {}",
                error,
                self.model.reaction_rate
            );
        }
    }

    /// Most recent forecast, for external readers
    pub fn current_state(&self) -> &TwinForecast {
        &self.current
    }

    /// Current reactor model
    pub fn model(&self) -> &ReactorModel {
        &self.model
    }

    /// Current predictor weights
    pub fn predictor_weights(&self) -> PredictorWeights {
        self.weights
    }

    /// Recent pollutant readings
    pub fn pollution_history(&self) -> &History {
        &self.pollution
    }

    /// Recent efficiency readings
    pub fn efficiency_history(&self) -> &History {
        &self.efficiency
    }

    /// Recent energy readings
    pub fn energy_history(&self) -> &History {
        &self.energy
    }

    /// Change the baseline setpoint
    pub fn set_target(&mut self, target_pollution: f32) {
        self.config.target_pollution = target_pollution;
    }

    /// Baseline setpoint, ppm
    pub fn target(&self) -> f32 {
        self.config.target_pollution
    }

    /// Model to persist
    pub fn snapshot(&self) -> ReactorModel {
        self.model
    }

    /// Restore a saved model, clamped back inside its invariants
    pub fn restore(&mut self, model: ReactorModel) {
        self.model = model.sanitized();
    }

    /// Drop history and return to the default model
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
