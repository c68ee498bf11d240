//! Adaptive Controller
//!
//! Turns a fused sensor vector and a twin forecast into an actuator output
//! in percent. The controller is a small state machine over five modes;
//! each mode maps to one [`ControlLaw`] and the law computes the output.
//!
//! ```text
//! manual override? ──yes──→ clamp(override)
//!        │ no
//!        ↓
//! ControlLaw::for_mode(mode) ─→ compute ─→ clamp [0, 100] ─→ execute ─→ actuator
//! ```
//!
//! Mode changes are commanded from outside. [`select_optimal_mode`] is an
//! advisory helper; the controller never switches modes on its own.
//!
//! The PID error is `setpoint - pollutant`, so the output rises only while
//! the pollutant sits below the setpoint and is zero above it.

pub mod fuzzy;
pub mod laws;
pub mod pid;

pub use fuzzy::{FuzzyInference, FuzzyLevel, FuzzyRule, MembershipParams};
pub use laws::{cost_search, ControlLaw, ControlMode, LawContext};
pub use pid::{PidController, PidGains, PidState};

use crate::config::{ControlConfig, StandardLaw};
use crate::constants::control::{OUTPUT_MAX, OUTPUT_MIN, SHOCK_LOAD_POLLUTANT};
use crate::constants::twin::{ENERGY_ALERT_FRACTION, HEALTH_THRESHOLD, TARGET_POLLUTION};
use crate::io::Actuator;
use crate::sensor::SensorVector;
use crate::time::Timestamp;
use crate::twin::TwinForecast;

/// Mode the readings suggest, without changing any state
///
/// Checked in priority order: shock load, energy, health.
pub fn select_optimal_mode(
    sensors: &SensorVector,
    twin: &TwinForecast,
    max_energy_usage: f32,
) -> ControlMode {
    if sensors.pollutant() > SHOCK_LOAD_POLLUTANT {
        ControlMode::ShockLoad
    } else if sensors.energy_usage > max_energy_usage * ENERGY_ALERT_FRACTION {
        ControlMode::EnergySaving
    } else if twin.system_health < HEALTH_THRESHOLD {
        ControlMode::Maintenance
    } else {
        ControlMode::Standard
    }
}

/// One control output with the reason it was chosen
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ControlDecision {
    /// Percent
    pub output: f32,
    /// Mode that produced the output
    pub mode: ControlMode,
    /// Short reason for logs and telemetry
    pub rationale: &'static str,
    /// Time of the decision
    pub timestamp: Timestamp,
}

/// Running control statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlMetrics {
    /// Last executed output, percent
    pub control_effort: f32,
    /// |pollutant - setpoint| at the last computation
    pub tracking_error: f32,
    /// Energy estimate of the last executed output
    pub energy_consumption: f32,
    /// Sum of executed outputs
    pub cumulative_effort: f32,
    /// Sum of tracking errors
    pub cumulative_tracking_error: f32,
    /// Sum of energy estimates
    pub cumulative_energy: f32,
    /// Computations counted
    pub samples: u32,
}

impl ControlMetrics {
    /// Mean tracking error over all computations
    pub fn mean_tracking_error(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            self.cumulative_tracking_error / self.samples as f32
        }
    }
}

/// Mode state machine over the control laws
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    config: ControlConfig,
    pid: PidController,
    fuzzy: FuzzyInference,
    mode: ControlMode,
    previous_mode: ControlMode,
    manual_override: Option<f32>,
    /// Pollutant target of the cost search
    target: f32,
    dt: f32,
    last_output: f32,
    previous_output: f32,
    metrics: ControlMetrics,
}

impl AdaptiveController {
    /// Controller in standard mode; `dt` is the PID step in seconds
    pub fn new(config: ControlConfig, dt: f32) -> Self {
        Self {
            config,
            pid: PidController::new(config.pid),
            fuzzy: FuzzyInference::default(),
            mode: ControlMode::Standard,
            previous_mode: ControlMode::Standard,
            manual_override: None,
            target: TARGET_POLLUTION,
            dt,
            last_output: 0.0,
            previous_output: 0.0,
            metrics: ControlMetrics::default(),
        }
    }

    /// Switch mode; also cancels a manual override
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            log_info!("control mode {} -> {}", self.mode.name(), mode.name());
            self.previous_mode = self.mode;
            self.mode = mode;
        }
        self.manual_override = None;
    }

    /// Active mode
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Mode before the last transition
    pub fn previous_mode(&self) -> ControlMode {
        self.previous_mode
    }

    /// Output in [0, 100] for the current mode
    ///
    /// Non-finite inputs hold the last output instead of feeding the PID.
    pub fn compute_control(&mut self, sensors: &SensorVector, twin: &TwinForecast) -> f32 {
        if let Some(output) = self.manual_override {
            return output;
        }

        let pollutant = sensors.pollutant();
        let setpoint = twin.optimal_setpoint;
        if !pollutant.is_finite() || !setpoint.is_finite() {
            log_warn!("non-finite control input, holding {}", self.last_output);
            return self.last_output;
        }

        let tracking_error = libm::fabsf(pollutant - setpoint);
        self.metrics.tracking_error = tracking_error;
        self.metrics.cumulative_tracking_error += tracking_error;
        self.metrics.samples = self.metrics.samples.saturating_add(1);

        let law = ControlLaw::for_mode(self.mode, &self.config);
        let mut ctx = LawContext {
            pid: &mut self.pid,
            fuzzy: &self.fuzzy,
            standard: self.config.standard_law,
            dt: self.dt,
            cost_target: self.target,
        };
        let output = law.compute(&mut ctx, sensors, twin);

        if output.is_finite() {
            output.clamp(OUTPUT_MIN, OUTPUT_MAX)
        } else {
            self.last_output
        }
    }

    /// [`compute_control`](Self::compute_control) plus the reason for telemetry
    pub fn decide(
        &mut self,
        sensors: &SensorVector,
        twin: &TwinForecast,
        now: Timestamp,
    ) -> ControlDecision {
        let output = self.compute_control(sensors, twin);
        ControlDecision {
            output,
            mode: self.mode,
            rationale: self.rationale(),
            timestamp: now,
        }
    }

    fn rationale(&self) -> &'static str {
        if self.manual_override.is_some() {
            return "manual override";
        }
        match self.mode {
            ControlMode::Standard => match self.config.standard_law {
                StandardLaw::Pid => "adaptive PID on twin setpoint",
                StandardLaw::FuzzyPid => "fuzzy-scheduled PID on twin setpoint",
            },
            ControlMode::EnergySaving => "standard output scaled down to save energy",
            ControlMode::HighEfficiency => "cost search over predicted pollution",
            ControlMode::ShockLoad => "standard output boosted for shock load",
            ControlMode::Maintenance => "fixed maintenance output",
        }
    }

    /// Drive the actuator with `output` percent and record it
    pub fn execute<A: Actuator>(&mut self, output: f32, actuator: &mut A) {
        let output = if output.is_finite() {
            output.clamp(OUTPUT_MIN, OUTPUT_MAX)
        } else {
            self.last_output
        };
        actuator.write(self.to_native(output));

        self.previous_output = self.last_output;
        self.last_output = output;

        let energy = output * self.config.energy_per_output;
        let m = &mut self.metrics;
        m.control_effort = output;
        m.energy_consumption = energy;
        m.cumulative_effort += output;
        m.cumulative_energy += energy;
    }

    /// Map percent onto the actuator's native range
    pub fn to_native(&self, output: f32) -> f32 {
        let span = self.config.actuator_max - self.config.actuator_min;
        self.config.actuator_min + output / OUTPUT_MAX * span
    }

    /// Bypass the laws with a fixed output, clamped to [0, 100]
    pub fn set_manual_override(&mut self, output: f32) {
        if output.is_finite() {
            self.manual_override = Some(output.clamp(OUTPUT_MIN, OUTPUT_MAX));
        }
    }

    /// Return to the mode's own law
    pub fn clear_manual_override(&mut self) {
        self.manual_override = None;
    }

    /// Active override, percent
    pub fn manual_override(&self) -> Option<f32> {
        self.manual_override
    }

    /// Install new gains; non-finite gains are ignored
    pub fn set_pid_gains(&mut self, gains: PidGains) {
        if gains.is_finite() {
            self.pid.set_gains(gains);
        }
    }

    /// Gains the PID is running with
    pub fn pid_gains(&self) -> PidGains {
        self.pid.gains()
    }

    /// PID controller state
    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Rule base of the fuzzy PID law
    pub fn fuzzy_mut(&mut self) -> &mut FuzzyInference {
        &mut self.fuzzy
    }

    /// Pollutant target, ppm; non-finite values are ignored
    pub fn set_target(&mut self, target: f32) {
        if target.is_finite() {
            self.target = target;
        }
    }

    /// Current pollutant target, ppm
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Last output sent to the actuator, percent
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    /// Output before the last one, percent
    pub fn previous_output(&self) -> f32 {
        self.previous_output
    }

    /// Energy estimate of the last executed output
    pub fn energy_estimate(&self) -> f32 {
        self.metrics.energy_consumption
    }

    /// Running statistics
    pub fn metrics(&self) -> &ControlMetrics {
        &self.metrics
    }

    /// PID state to persist
    pub fn snapshot_pid(&self) -> PidState {
        self.pid.snapshot()
    }

    /// Restore saved PID state
    pub fn restore_pid(&mut self, state: PidState) {
        self.pid.restore(state);
    }

    /// Back to the startup state, keeping configuration and target
    pub fn reset(&mut self) {
        self.pid.reset();
        self.mode = ControlMode::Standard;
        self.previous_mode = ControlMode::Standard;
        self.manual_override = None;
        self.last_output = 0.0;
        self.previous_output = 0.0;
        self.metrics = ControlMetrics::default();
    }
}
