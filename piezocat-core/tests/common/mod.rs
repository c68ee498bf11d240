//! Shared fixtures for the integration tests
//!
//! Provides:
//! - A first-order plant simulator that produces raw ADC frames
//! - Recording actuator and telemetry sinks
//! - A parameter store that always fails
//! - A loop driver that feeds actuator output back into the plant

#![allow(dead_code)]

use piezocat_core::errors::{ReactorError, ReactorResult};
use piezocat_core::io::{Actuator, SensorSource};
use piezocat_core::persistence::{ParameterSnapshot, ParameterStore};
use piezocat_core::reactor::{ReactorCore, TickReport};
use piezocat_core::sensor::{Channel, RawFrame};
use piezocat_core::telemetry::{TelemetryPayload, TelemetryRecord, TelemetrySink};
use piezocat_core::time::{FixedTime, TimeSource, Timestamp};

/// ADC full scale
pub const FULL_SCALE: f32 = 1023.0;

/// Pollutant ppm to raw counts on the 0..500 ppm channel
pub fn pollutant_counts(ppm: f32) -> f32 {
    ppm * FULL_SCALE / 500.0
}

/// First-order pollutant plant with fixed auxiliary channels
///
/// Each sample relaxes the pollutant toward the influent level and removes
/// a share proportional to the last actuator output.
pub struct PlantSim {
    pub pollutant_ppm: f32,
    pub influent_ppm: f32,
    /// ppm removed per sample at 100% output
    pub removal_at_full: f32,
    pub inflow_rate: f32,
    /// Raw counts of flow, light, pH and temperature
    pub aux_counts: [f32; 4],
    /// Forced raw value per channel, for fault injection
    pub forced: [Option<f32>; 5],
    pub blocked: bool,
    pub failing: bool,
    output: f32,
    seed: u32,
    noise_counts: f32,
}

impl PlantSim {
    pub fn new(pollutant_ppm: f32) -> Self {
        Self {
            pollutant_ppm,
            influent_ppm: pollutant_ppm,
            removal_at_full: 20.0,
            inflow_rate: 0.05,
            aux_counts: [300.0, 500.0, 400.0, 300.0],
            forced: [None; 5],
            blocked: false,
            failing: false,
            output: 0.0,
            seed: 42,
            noise_counts: 0.0,
        }
    }

    pub fn with_noise(mut self, counts: f32) -> Self {
        self.noise_counts = counts;
        self
    }

    pub fn force(&mut self, channel: Channel, raw: f32) {
        self.forced[channel.index()] = Some(raw);
    }

    pub fn release(&mut self, channel: Channel) {
        self.forced[channel.index()] = None;
    }

    /// Feed back the output percent the controller applied
    pub fn apply(&mut self, output: f32) {
        self.output = output;
    }

    fn step(&mut self) {
        let inflow = self.inflow_rate * (self.influent_ppm - self.pollutant_ppm);
        let removal = self.removal_at_full * self.output / 100.0;
        self.pollutant_ppm = (self.pollutant_ppm + inflow - removal).clamp(0.0, 500.0);
    }

    fn noise(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        let uniform = self.seed as f32 / u32::MAX as f32;
        (uniform - 0.5) * 2.0 * self.noise_counts
    }

    pub fn frame(&mut self) -> RawFrame {
        let [flow, light, ph, temperature] = self.aux_counts;
        let pollutant = pollutant_counts(self.pollutant_ppm) + self.noise();
        let mut frame = RawFrame::new([flow, pollutant, light, ph, temperature]);
        for channel in Channel::ALL {
            if let Some(raw) = self.forced[channel.index()] {
                frame.set(channel, raw);
            }
        }
        frame
    }
}

impl SensorSource for PlantSim {
    type Error = ();

    fn read_frame(&mut self) -> nb::Result<RawFrame, ()> {
        if self.failing {
            return Err(nb::Error::Other(()));
        }
        if self.blocked {
            return Err(nb::Error::WouldBlock);
        }
        self.step();
        Ok(self.frame())
    }
}

/// Remembers every native command written
#[derive(Default)]
pub struct RecordingActuator {
    pub writes: Vec<f32>,
}

impl Actuator for RecordingActuator {
    fn write(&mut self, native: f32) {
        self.writes.push(native);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub records: Vec<TelemetryRecord>,
}

impl RecordingSink {
    pub fn count(&self, kind: fn(&TelemetryPayload) -> bool) -> usize {
        self.records.iter().filter(|r| kind(&r.payload)).count()
    }
}

impl TelemetrySink for RecordingSink {
    fn publish(&mut self, record: &TelemetryRecord) {
        self.records.push(*record);
    }
}

pub fn is_sensors(payload: &TelemetryPayload) -> bool {
    matches!(payload, TelemetryPayload::Sensors(_))
}

pub fn is_decision(payload: &TelemetryPayload) -> bool {
    matches!(payload, TelemetryPayload::Decision(_))
}

pub fn is_forecast(payload: &TelemetryPayload) -> bool {
    matches!(payload, TelemetryPayload::Forecast(_))
}

/// Storage that rejects every request
pub struct FailingStore;

impl ParameterStore for FailingStore {
    fn save(&mut self, _snapshot: &ParameterSnapshot) -> ReactorResult<()> {
        Err(ReactorError::Persistence {
            reason: "medium unavailable",
        })
    }

    fn load(&mut self) -> ReactorResult<ParameterSnapshot> {
        Err(ReactorError::Persistence {
            reason: "medium unavailable",
        })
    }
}

/// Tick every `step_ms` over `[from, to)`, feeding outputs back into the plant
pub fn run<T: TelemetrySink>(
    core: &mut ReactorCore,
    plant: &mut PlantSim,
    actuator: &mut RecordingActuator,
    sink: &mut T,
    from: Timestamp,
    to: Timestamp,
    step_ms: u32,
) -> Vec<TickReport> {
    let mut reports = Vec::new();
    let mut clock = FixedTime::new(from);
    while clock.now() < to {
        let report = core.tick_with(&clock, plant, actuator, sink);
        if let Some(output) = report.output {
            plant.apply(output);
        }
        reports.push(report);
        clock.advance(step_ms);
    }
    reports
}
