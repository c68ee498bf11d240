//! Reactor supervisor
//!
//! `ReactorCore` owns the four subsystems and runs them in a fixed order
//! from a single cooperative loop:
//!
//! ```text
//! tick(now)
//!  ├─ apply pending commands (at most one per kind)
//!  ├─ sample due?  read → fuse → derive plant figures → forecast
//!  ├─ control due? decide → execute on the actuator
//!  └─ learn due?   learn → apply gains / source weights
//! ```
//!
//! Nothing here blocks and nothing here fails the tick. A source with no
//! frame ready skips the sampling stage; a source error is logged and
//! reported. Control runs on the latest forecast, so it keeps its faster
//! cadence between samples.

use crate::command::{Command, CommandMailbox};
use crate::config::ReactorConfig;
use crate::constants::sensors::INFLUENT_REFERENCE_PPM;
use crate::control::{AdaptiveController, ControlDecision, ControlMode, PidGains};
use crate::errors::{ReactorError, ReactorResult};
use crate::fusion::FusionEngine;
use crate::io::{Actuator, SensorSource};
use crate::learning::{LearningInputs, LearningOutcome, ReinforcementLearner};
use crate::persistence::{ParameterSnapshot, ParameterStore};
use crate::sensor::{RawFrame, SensorVector};
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use crate::time::{DueStages, Scheduler, TimeSource, Timestamp};
use crate::twin::{TwinForecast, TwinForecaster};

/// Removal efficiency in percent against the influent reference
pub fn removal_efficiency(pollutant: f32) -> f32 {
    (100.0 * (1.0 - pollutant / INFLUENT_REFERENCE_PPM)).clamp(0.0, 100.0)
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    /// Time the tick ran at
    pub timestamp: Timestamp,
    /// Stages that were due
    pub stages: DueStages,
    /// Commands drained and applied before the stages ran
    pub commands_applied: usize,
    /// Fused vector, when sampling produced one
    pub sensors: Option<SensorVector>,
    /// Four-source pollutant blend for the sampled vector
    pub blended_pollutant: Option<f32>,
    /// Twin forecast for the sampled vector
    pub forecast: Option<TwinForecast>,
    /// Output written to the actuator, percent
    pub output: Option<f32>,
    /// Control decision, when control ran
    pub decision: Option<ControlDecision>,
    /// Learning outcome, when an iteration completed
    pub learning: Option<LearningOutcome>,
    /// Set when the source reported an error instead of a frame
    pub sensor_error: Option<ReactorError>,
    /// Learned parameters should be saved with [`ReactorCore::save_parameters`]
    pub save_due: bool,
}

/// Supervisor that owns the fusion engine, twin, controller and learner
///
/// Drive it by calling [`ReactorCore::tick`] from the firmware main loop.
pub struct ReactorCore {
    config: ReactorConfig,
    fusion: FusionEngine,
    twin: TwinForecaster,
    controller: AdaptiveController,
    learner: ReinforcementLearner,
    scheduler: Scheduler,
    mailbox: CommandMailbox,
    latest: Option<SensorVector>,
    forecast: Option<TwinForecast>,
    /// |measured - predicted| pollutant at the last sample
    prediction_error: f32,
    last_tick: Timestamp,
}

impl ReactorCore {
    /// Build a core from a validated configuration
    pub fn new(config: ReactorConfig) -> ReactorResult<Self> {
        config.validate()?;

        let timing = config.timing;
        let controller = AdaptiveController::new(config.control, timing.control_dt());
        let learner = ReinforcementLearner::new(config.learning, controller.pid_gains());

        Ok(Self {
            fusion: FusionEngine::new(config.fusion.clone()),
            twin: TwinForecaster::new(config.twin),
            controller,
            learner,
            scheduler: Scheduler::new(timing.sampling_ms, timing.control_ms, timing.learning_ms, 0),
            mailbox: CommandMailbox::new(),
            latest: None,
            forecast: None,
            prediction_error: 0.0,
            last_tick: 0,
            config,
        })
    }

    /// Run every stage that is due at `now`
    pub fn tick<S, A, T>(
        &mut self,
        now: Timestamp,
        source: &mut S,
        actuator: &mut A,
        telemetry: &mut T,
    ) -> TickReport
    where
        S: SensorSource,
        A: Actuator,
        T: TelemetrySink,
    {
        self.last_tick = now;
        let mut report = TickReport {
            timestamp: now,
            commands_applied: self.apply_commands(now),
            ..TickReport::default()
        };

        let stages = self.scheduler.poll(now);
        report.stages = stages;

        if stages.sample {
            match source.read_frame() {
                Ok(frame) => {
                    let vector = self.sample(&frame, now);
                    telemetry.publish(&TelemetryRecord::sensors(now, vector));

                    let model = self.twin.model();
                    report.blended_pollutant = Some(self.fusion.blend_pollutant(
                        &vector,
                        model.reaction_rate,
                        model.degradation,
                    ));

                    let forecast = self.twin.forecast(&vector);
                    telemetry.publish(&TelemetryRecord::forecast(now, forecast));

                    self.latest = Some(vector);
                    self.forecast = Some(forecast);
                    report.sensors = Some(vector);
                    report.forecast = Some(forecast);
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(_)) => {
                    log_warn!("sensor source failed, sampling skipped");
                    report.sensor_error = Some(ReactorError::SensorUnavailable);
                }
            }
        }

        if stages.control {
            if let (Some(vector), Some(forecast)) = (self.latest, self.forecast) {
                let decision = self.controller.decide(&vector, &forecast, now);
                self.controller.execute(decision.output, actuator);
                telemetry.publish(&TelemetryRecord::decision(now, decision));

                report.output = Some(self.controller.last_output());
                report.decision = Some(decision);
            }
        }

        if stages.learn {
            report.learning = self.learn();
            report.save_due = report.learning.is_some() && self.learner.should_persist();
        }

        report
    }

    /// Run every stage that is due at the clock's current time
    pub fn tick_with<C, S, A, T>(
        &mut self,
        clock: &C,
        source: &mut S,
        actuator: &mut A,
        telemetry: &mut T,
    ) -> TickReport
    where
        C: TimeSource,
        S: SensorSource,
        A: Actuator,
        T: TelemetrySink,
    {
        self.tick(clock.now(), source, actuator, telemetry)
    }

    /// Fuse one frame and attach the derived plant figures
    fn sample(&mut self, frame: &RawFrame, now: Timestamp) -> SensorVector {
        let mut vector = self.fusion.process(frame, now);
        vector.energy_usage = self.controller.energy_estimate();
        vector.efficiency = removal_efficiency(vector.pollutant());

        if let Some(previous) = self.forecast {
            self.prediction_error = libm::fabsf(vector.pollutant() - previous.predicted_pollution);
        }
        vector
    }

    fn learn(&mut self) -> Option<LearningOutcome> {
        let (vector, forecast) = (self.latest?, self.forecast?);

        let inputs = LearningInputs {
            last_output: self.controller.last_output(),
            tracking_error: forecast.optimal_setpoint - vector.pollutant(),
            prediction_error: self.prediction_error,
            gains: self.controller.pid_gains(),
            source_weights: self.fusion.source_weights(),
        };
        let outcome = self.learner.learn(&vector, &forecast, &inputs)?;

        if outcome.gains != inputs.gains {
            log_debug!(
                "PID gains -> kp {} ki {} kd {}",
                outcome.gains.kp,
                outcome.gains.ki,
                outcome.gains.kd
            );
        }
        self.controller.set_pid_gains(outcome.gains);
        if let Some(weights) = outcome.source_weights {
            self.fusion.set_source_weights(weights);
        }
        Some(outcome)
    }

    /// Queue a command for the next tick
    pub fn post_command(&mut self, command: Command) -> ReactorResult<()> {
        self.mailbox.post(command)
    }

    fn apply_commands(&mut self, now: Timestamp) -> usize {
        let commands = self.mailbox.drain();
        for command in commands.iter() {
            self.apply(*command, now);
        }
        commands.len()
    }

    fn apply(&mut self, command: Command, now: Timestamp) {
        match command {
            Command::SetMode(mode) => self.controller.set_mode(mode),
            Command::SetTarget(target) => {
                self.twin.set_target(target);
                self.controller.set_target(target);
            }
            Command::ManualOverride(output) => self.controller.set_manual_override(output),
            Command::CancelOverride => self.controller.clear_manual_override(),
            Command::Reset => {
                self.last_tick = now;
                self.reset();
            }
            Command::Calibrate {
                channel,
                known_value,
            } => {
                if let Err(e) = self.fusion.calibrate_from_last(channel, known_value) {
                    log_warn!("calibration of {} ignored: {}", channel.name(), e);
                }
            }
        }
    }

    /// Reinitialise every subsystem in place; configuration is kept
    pub fn reset(&mut self) {
        log_info!("reactor core reset");
        self.fusion.reset();
        self.twin.reset();
        self.controller.reset();
        self.learner.reset();
        self.scheduler.reset(self.last_tick);
        self.latest = None;
        self.forecast = None;
        self.prediction_error = 0.0;
    }

    /// Current learned parameters
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot::new(
            self.controller.snapshot_pid(),
            self.learner.snapshot(),
            self.twin.snapshot(),
        )
    }

    /// Write the current parameters to `store`
    pub fn save_parameters<P: ParameterStore>(&self, store: &mut P) -> ReactorResult<()> {
        store.save(&self.snapshot()).map_err(|e| {
            log_warn!("parameter save failed: {}", e);
            e
        })
    }

    /// Restore saved parameters; on any failure the current ones stay
    pub fn load_parameters<P: ParameterStore>(&mut self, store: &mut P) -> ReactorResult<()> {
        let snapshot = store.load().and_then(|s| s.validate().map(|_| s));
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log_warn!("parameter load failed, keeping defaults: {}", e);
                return Err(e);
            }
        };

        self.controller.restore_pid(snapshot.pid);
        self.learner.restore(snapshot.learning);
        self.twin.restore(snapshot.model);
        self.fusion.set_source_weights(snapshot.learning.source_weights);
        Ok(())
    }

    /// Configuration the core was built with
    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Fusion engine state
    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }

    /// Digital twin state
    pub fn twin(&self) -> &TwinForecaster {
        &self.twin
    }

    /// Controller state
    pub fn controller(&self) -> &AdaptiveController {
        &self.controller
    }

    /// Learner state
    pub fn learner(&self) -> &ReinforcementLearner {
        &self.learner
    }

    /// Learner access for hosts that toggle or reseed learning
    pub fn learner_mut(&mut self) -> &mut ReinforcementLearner {
        &mut self.learner
    }

    /// Active control mode
    pub fn mode(&self) -> ControlMode {
        self.controller.mode()
    }

    /// Gains the PID is running with
    pub fn pid_gains(&self) -> PidGains {
        self.controller.pid_gains()
    }

    /// Most recent fused vector
    pub fn latest_sensors(&self) -> Option<&SensorVector> {
        self.latest.as_ref()
    }

    /// Most recent forecast
    pub fn latest_forecast(&self) -> Option<&TwinForecast> {
        self.forecast.as_ref()
    }

    /// Absolute pollutant forecast error at the last sample, ppm
    pub fn prediction_error(&self) -> f32 {
        self.prediction_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LearningConfig, TimingConfig};
    use crate::fusion::Calibration;
    use crate::persistence::MemoryStore;
    use crate::sensor::Channel;
    use crate::telemetry::{MemorySink, NullSink, TelemetryPayload};
    use crate::time::FixedTime;

    struct Frames {
        frame: RawFrame,
        ready: bool,
    }

    impl SensorSource for Frames {
        type Error = ();

        fn read_frame(&mut self) -> nb::Result<RawFrame, ()> {
            if self.ready {
                Ok(self.frame)
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

    struct Broken;

    impl SensorSource for Broken {
        type Error = ();

        fn read_frame(&mut self) -> nb::Result<RawFrame, ()> {
            Err(nb::Error::Other(()))
        }
    }

    struct Servo(Option<f32>);

    impl Actuator for Servo {
        fn write(&mut self, native: f32) {
            self.0 = Some(native);
        }
    }

    fn steady() -> Frames {
        Frames {
            frame: RawFrame::new([300.0, 200.0, 500.0, 400.0, 300.0]),
            ready: true,
        }
    }

    #[test]
    fn efficiency_against_influent() {
        assert_eq!(removal_efficiency(0.0), 100.0);
        assert_eq!(removal_efficiency(250.0), 50.0);
        assert_eq!(removal_efficiency(900.0), 0.0);
    }

    #[test]
    fn first_tick_samples_and_controls() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        let mut sink: MemorySink<8> = MemorySink::new();
        let mut servo = Servo(None);

        let report = core.tick(0, &mut steady(), &mut servo, &mut sink);
        assert!(report.stages.sample && report.stages.control);
        assert!(report.sensors.is_some());
        assert!(report.forecast.is_some());
        let output = report.output.unwrap();
        assert!((0.0..=100.0).contains(&output));
        assert!(servo.0.is_some());

        let kinds: Vec<_> = sink
            .iter()
            .map(|r| match r.payload {
                TelemetryPayload::Sensors(_) => 's',
                TelemetryPayload::Forecast(_) => 'f',
                TelemetryPayload::Decision(_) => 'd',
            })
            .collect();
        assert_eq!(kinds, ['s', 'f', 'd']);
    }

    #[test]
    fn blocked_source_skips_sampling() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        let mut source = Frames {
            ready: false,
            ..steady()
        };
        let report = core.tick(0, &mut source, &mut Servo(None), &mut NullSink);
        assert!(report.sensors.is_none());
        // No vector yet, so nothing to control on
        assert!(report.output.is_none());
    }

    #[test]
    fn source_error_is_reported_and_control_continues() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        let mut clock = FixedTime::new(0);
        let report = core.tick_with(&clock, &mut steady(), &mut Servo(None), &mut NullSink);
        assert_eq!(report.sensor_error, None);

        clock.advance(1_000);
        let report = core.tick_with(&clock, &mut Broken, &mut Servo(None), &mut NullSink);
        assert_eq!(report.timestamp, 1_000);
        assert!(report.stages.sample);
        assert_eq!(report.sensor_error, Some(ReactorError::SensorUnavailable));
        assert!(report.sensors.is_none());
        assert!(report.output.is_some());
    }

    #[test]
    fn commands_apply_once() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        core.post_command(Command::SetMode(ControlMode::Maintenance)).unwrap();
        core.post_command(Command::SetTarget(120.0)).unwrap();

        let report = core.tick(0, &mut steady(), &mut Servo(None), &mut NullSink);
        assert_eq!(report.commands_applied, 2);
        assert_eq!(report.output, Some(30.0));
        assert_eq!(core.twin().target(), 120.0);

        let report = core.tick(100, &mut steady(), &mut Servo(None), &mut NullSink);
        assert_eq!(report.commands_applied, 0);
        assert_eq!(core.mode(), ControlMode::Maintenance);
    }

    #[test]
    fn manual_override_reaches_actuator() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        core.post_command(Command::ManualOverride(50.0)).unwrap();
        let mut servo = Servo(None);

        let report = core.tick(0, &mut steady(), &mut servo, &mut NullSink);
        assert_eq!(report.output, Some(50.0));
        assert_eq!(servo.0, Some(90.0));
    }

    #[test]
    fn calibration_uses_last_raw_sample() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        core.tick(0, &mut steady(), &mut Servo(None), &mut NullSink);

        core.post_command(Command::Calibrate {
            channel: Channel::Pollutant,
            known_value: 400.0,
        })
        .unwrap();
        core.tick(100, &mut steady(), &mut Servo(None), &mut NullSink);

        let calibration = core.fusion().calibration(Channel::Pollutant);
        assert!((calibration.apply(200.0) - 400.0).abs() < 0.01);
    }

    #[test]
    fn calibration_without_a_sample_is_ignored() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        core.post_command(Command::Calibrate {
            channel: Channel::Pollutant,
            known_value: 400.0,
        })
        .unwrap();

        let report = core.tick(0, &mut steady(), &mut Servo(None), &mut NullSink);
        assert_eq!(report.commands_applied, 1);
        assert_eq!(core.fusion().calibration(Channel::Pollutant), Calibration::default());
        let pollutant = report.sensors.unwrap().pollutant();
        assert!((0.0..=500.0).contains(&pollutant), "pollutant {}", pollutant);
    }

    #[test]
    fn reset_then_calibrate_keeps_unit_gain() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        for t in (0..2_000).step_by(100) {
            core.tick(t, &mut steady(), &mut Servo(None), &mut NullSink);
        }
        assert_eq!(core.fusion().last_raw(Channel::Pollutant), Some(200.0));

        // Reset drains first and clears the reference sample
        core.post_command(Command::Calibrate {
            channel: Channel::Pollutant,
            known_value: 400.0,
        })
        .unwrap();
        core.post_command(Command::Reset).unwrap();
        let report = core.tick(2_000, &mut steady(), &mut Servo(None), &mut NullSink);

        assert_eq!(report.commands_applied, 2);
        assert_eq!(core.fusion().calibration(Channel::Pollutant).gain, 1.0);
        let pollutant = report.sensors.unwrap().pollutant();
        assert!((0.0..=500.0).contains(&pollutant), "pollutant {}", pollutant);
    }

    #[test]
    fn learning_runs_on_its_own_cadence() {
        let timing = TimingConfig::default().with_intervals(1000, 100, 2000);
        let config = ReactorConfig::default()
            .with_timing(timing)
            .with_learning(LearningConfig::default());
        let mut core = ReactorCore::new(config).unwrap();

        let mut learned = 0;
        for t in (0..=10_000).step_by(100) {
            let report = core.tick(t, &mut steady(), &mut Servo(None), &mut NullSink);
            if report.learning.is_some() {
                learned += 1;
            }
        }
        assert_eq!(learned, 5);
        assert_eq!(core.learner().iterations(), 5);
    }

    #[test]
    fn parameters_survive_a_store_round_trip() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        let mut store = MemoryStore::new();

        assert!(core.load_parameters(&mut store).is_err());

        for t in (0..5_000).step_by(100) {
            core.tick(t, &mut steady(), &mut Servo(None), &mut NullSink);
        }
        core.save_parameters(&mut store).unwrap();

        let mut restored = ReactorCore::new(ReactorConfig::default()).unwrap();
        restored.load_parameters(&mut store).unwrap();
        assert_eq!(restored.snapshot(), core.snapshot());
    }

    #[test]
    fn corrupt_snapshot_keeps_defaults() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        let defaults = core.snapshot();

        let mut corrupt = defaults;
        corrupt.learning.q_table.set(1, 1, f32::NAN).unwrap();
        let mut store = MemoryStore::new();
        store.save(&corrupt).unwrap();

        assert!(matches!(
            core.load_parameters(&mut store),
            Err(ReactorError::Persistence { .. })
        ));
        assert_eq!(core.snapshot(), defaults);
    }

    #[test]
    fn reset_command_restores_startup_state() {
        let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
        core.post_command(Command::SetMode(ControlMode::ShockLoad)).unwrap();
        core.tick(0, &mut steady(), &mut Servo(None), &mut NullSink);
        assert_eq!(core.mode(), ControlMode::ShockLoad);

        core.post_command(Command::Reset).unwrap();
        let report = core.tick(100, &mut steady(), &mut Servo(None), &mut NullSink);
        assert_eq!(core.mode(), ControlMode::Standard);
        // Fresh scheduler primes sampling again
        assert!(report.stages.sample);
    }
}
