//! Control modes and the closed set of control laws behind them
//!
//! | Mode | Law |
//! |------|-----|
//! | Standard | PID (or fuzzy-scheduled PID) on the twin setpoint |
//! | EnergySaving | standard × 0.7 |
//! | HighEfficiency | one-shot cost search over 0, 20, .., 100 |
//! | ShockLoad | min(100, standard × 1.5) |
//! | Maintenance | constant 30 |

use crate::config::{ControlConfig, StandardLaw};
use crate::constants::control::{
    COST_ENERGY_WEIGHT, COST_REMOVAL_PER_OUTPUT, COST_SEARCH_DEFAULT, COST_WEAR_KNEE,
    COST_WEAR_WEIGHT, OUTPUT_MAX, OUTPUT_MIN,
};
use crate::control::fuzzy::FuzzyInference;
use crate::control::pid::PidController;
use crate::errors::{ReactorError, ReactorResult};
use crate::sensor::SensorVector;
use crate::twin::TwinForecast;

/// Operating mode of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlMode {
    /// Scaled-down PID output
    EnergySaving,
    /// PID or fuzzy PID, per configuration
    #[default]
    Standard,
    /// Cost search over the output range
    HighEfficiency,
    /// Boosted PID output for sudden pollutant spikes
    ShockLoad,
    /// Fixed output
    Maintenance,
}

impl ControlMode {
    /// Every mode, in wire-code order
    pub const ALL: [ControlMode; 5] = [
        ControlMode::EnergySaving,
        ControlMode::Standard,
        ControlMode::HighEfficiency,
        ControlMode::ShockLoad,
        ControlMode::Maintenance,
    ];

    /// Numeric code used on the command channel
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Mode for a command-channel code
    pub fn from_code(code: u8) -> ReactorResult<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(ReactorError::CommandRejected {
                reason: "unknown mode code",
            })
    }

    /// Name used in logs and telemetry
    pub const fn name(self) -> &'static str {
        match self {
            ControlMode::EnergySaving => "energy-saving",
            ControlMode::Standard => "standard",
            ControlMode::HighEfficiency => "high-efficiency",
            ControlMode::ShockLoad => "shock-load",
            ControlMode::Maintenance => "maintenance",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControlMode {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

/// Mutable collaborators a law may use for one computation
pub struct LawContext<'a> {
    /// Controller driving the PID-based laws
    pub pid: &'a mut PidController,
    /// Rule base for the fuzzy gain
    pub fuzzy: &'a FuzzyInference,
    /// Law behind the standard mode
    pub standard: StandardLaw,
    /// PID time step, seconds
    pub dt: f32,
    /// Pollutant target of the cost search
    pub cost_target: f32,
}

/// One of the laws a mode dispatches to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlLaw {
    /// Plain adaptive PID
    Pid,
    /// PID scaled by a fuzzy gain factor in [0.5, 1.5]
    FuzzyPid,
    /// Standard law scaled and capped
    ScaledPid {
        /// Multiplier on the standard output
        scale: f32,
        /// Output cap after scaling, percent
        ceiling: f32,
    },
    /// Lowest-cost output on a fixed grid
    CostSearch {
        /// Grid spacing, percent
        step: f32,
    },
    /// Fixed output, percent
    Constant(f32),
}

impl ControlLaw {
    /// Law the given mode runs under `config`
    pub fn for_mode(mode: ControlMode, config: &ControlConfig) -> Self {
        match mode {
            ControlMode::Standard => Self::standard(config.standard_law),
            ControlMode::EnergySaving => ControlLaw::ScaledPid {
                scale: config.energy_saving_scale,
                ceiling: OUTPUT_MAX,
            },
            ControlMode::ShockLoad => ControlLaw::ScaledPid {
                scale: config.shock_load_scale,
                ceiling: OUTPUT_MAX,
            },
            ControlMode::HighEfficiency => ControlLaw::CostSearch {
                step: config.cost_search_step,
            },
            ControlMode::Maintenance => ControlLaw::Constant(config.maintenance_output),
        }
    }

    fn standard(law: StandardLaw) -> Self {
        match law {
            StandardLaw::Pid => ControlLaw::Pid,
            StandardLaw::FuzzyPid => ControlLaw::FuzzyPid,
        }
    }

    /// Output in percent, before the controller's final clamp
    pub fn compute(&self, ctx: &mut LawContext<'_>, sensors: &SensorVector, twin: &TwinForecast) -> f32 {
        match *self {
            ControlLaw::Pid => pid_output(ctx, sensors, twin),
            ControlLaw::FuzzyPid => fuzzy_pid_output(ctx, sensors, twin),
            ControlLaw::ScaledPid { scale, ceiling } => {
                let base = Self::standard(ctx.standard).compute(ctx, sensors, twin);
                (base * scale).min(ceiling)
            }
            ControlLaw::CostSearch { step } => {
                cost_search(twin.predicted_pollution, ctx.cost_target, step)
            }
            ControlLaw::Constant(output) => output,
        }
    }
}

fn pid_output(ctx: &mut LawContext<'_>, sensors: &SensorVector, twin: &TwinForecast) -> f32 {
    ctx.pid
        .compute(twin.optimal_setpoint, sensors.pollutant(), ctx.dt)
        .clamp(OUTPUT_MIN, OUTPUT_MAX)
}

fn fuzzy_pid_output(ctx: &mut LawContext<'_>, sensors: &SensorVector, twin: &TwinForecast) -> f32 {
    let error = twin.optimal_setpoint - sensors.pollutant();
    let error_change = error - ctx.pid.previous_error();

    let base = pid_output(ctx, sensors, twin);
    let factor = 0.5 + ctx.fuzzy.infer(libm::fabsf(error), libm::fabsf(error_change)) / 100.0;
    (base * factor).clamp(OUTPUT_MIN, OUTPUT_MAX)
}

/// Cost of driving the actuator at `candidate` percent
pub fn control_cost(candidate: f32, predicted_pollution: f32, target: f32) -> f32 {
    let pollution = libm::fabsf(predicted_pollution - candidate * COST_REMOVAL_PER_OUTPUT - target);
    let energy = candidate * COST_ENERGY_WEIGHT;
    let wear = (candidate - COST_WEAR_KNEE).max(0.0) * COST_WEAR_WEIGHT;
    pollution + energy + wear
}

/// Cheapest candidate on the grid `0, step, 2·step, .. ≤ 100`
///
/// Ties keep the lowest candidate. Returns 50 when nothing could be scored.
pub fn cost_search(predicted_pollution: f32, target: f32, step: f32) -> f32 {
    if !(step > 0.0) {
        return COST_SEARCH_DEFAULT;
    }

    let candidates = libm::floorf(OUTPUT_MAX / step) as u32;
    let mut best = COST_SEARCH_DEFAULT;
    let mut best_cost = f32::INFINITY;

    for k in 0..=candidates {
        let candidate = k as f32 * step;
        let cost = control_cost(candidate, predicted_pollution, target);
        if cost < best_cost {
            best_cost = cost;
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PidConfig;

    fn twin(predicted: f32, setpoint: f32) -> TwinForecast {
        TwinForecast {
            predicted_pollution: predicted,
            optimal_setpoint: setpoint,
            system_health: 100.0,
            ..TwinForecast::default()
        }
    }

    #[test]
    fn mode_codes_round_trip() {
        for mode in ControlMode::ALL {
            assert_eq!(ControlMode::from_code(mode.code()), Ok(mode));
        }
        assert!(ControlMode::from_code(5).is_err());
        assert_eq!(ControlMode::Standard.code(), 1);
    }

    #[test]
    fn cost_search_picks_cheapest_grid_point() {
        // Predicted at target: any output only adds cost
        assert_eq!(cost_search(100.0, 100.0, 20.0), 0.0);

        // Predicted 300: c=0 → 200, c=20 → 190+16, ... c=0 still wins on energy
        assert_eq!(cost_search(300.0, 100.0, 20.0), 0.0);

        let costs: [f32; 6] = core::array::from_fn(|k| control_cost(k as f32 * 20.0, 300.0, 100.0));
        assert!((costs[5] - (150.0 + 80.0 + 40.0)).abs() < 1e-4);
    }

    #[test]
    fn nan_prediction_falls_back() {
        assert_eq!(cost_search(f32::NAN, 100.0, 20.0), 50.0);
        assert_eq!(cost_search(100.0, 100.0, 0.0), 50.0);
    }

    #[test]
    fn scaled_law_uses_standard_output() {
        let config = ControlConfig::default();
        let fuzzy = FuzzyInference::default();
        let sensors = SensorVector::from_values([0.0, 40.0, 0.0, 7.0, 25.0], 0);
        let forecast = twin(40.0, 100.0);

        let p_only = PidConfig::default().with_gains(1.0, 0.0, 0.0);
        let mut pid = PidController::new(p_only);
        let mut ctx = LawContext {
            pid: &mut pid,
            fuzzy: &fuzzy,
            standard: StandardLaw::Pid,
            dt: 0.1,
            cost_target: 100.0,
        };

        let standard = ControlLaw::for_mode(ControlMode::Standard, &config).compute(&mut ctx, &sensors, &forecast);
        assert_eq!(standard, 60.0);

        let saving = ControlLaw::for_mode(ControlMode::EnergySaving, &config).compute(&mut ctx, &sensors, &forecast);
        assert!((saving - 42.0).abs() < 1e-4);

        let shock = ControlLaw::for_mode(ControlMode::ShockLoad, &config).compute(&mut ctx, &sensors, &forecast);
        assert_eq!(shock, 90.0);

        let maintenance = ControlLaw::for_mode(ControlMode::Maintenance, &config).compute(&mut ctx, &sensors, &forecast);
        assert_eq!(maintenance, 30.0);
    }

    #[test]
    fn fuzzy_pid_stays_in_range() {
        let fuzzy = FuzzyInference::default();
        let mut pid = PidController::new(PidConfig::default());
        let mut ctx = LawContext {
            pid: &mut pid,
            fuzzy: &fuzzy,
            standard: StandardLaw::FuzzyPid,
            dt: 0.1,
            cost_target: 100.0,
        };
        for pollutant in [0.0, 50.0, 99.0, 150.0, 480.0] {
            let sensors = SensorVector::from_values([0.0, pollutant, 0.0, 7.0, 25.0], 0);
            let output = ControlLaw::FuzzyPid.compute(&mut ctx, &sensors, &twin(pollutant, 100.0));
            assert!((0.0..=100.0).contains(&output));
        }
    }
}
