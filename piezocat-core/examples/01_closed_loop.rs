//! Closed-Loop Reactor Example
//!
//! Runs the full reactor core against a small first-order plant and prints
//! what each stage produced.
//!
//! ## What You'll Learn
//!
//! - Wiring a sensor source, actuator and telemetry sink into `ReactorCore`
//! - The three independent cadences (sample, control, learn)
//! - Posting operator commands between ticks
//! - Saving learned parameters when the core asks for it
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_closed_loop
//! ```

use piezocat_core::command::Command;
use piezocat_core::config::{LearningConfig, TimingConfig};
use piezocat_core::control::ControlMode;
use piezocat_core::io::{Actuator, SensorSource};
use piezocat_core::persistence::MemoryStore;
use piezocat_core::sensor::RawFrame;
use piezocat_core::telemetry::{TelemetryRecord, TelemetrySink};
use piezocat_core::{ReactorConfig, ReactorCore};

/// Pollutant relaxes toward the influent level; actuator output removes it
struct Plant {
    pollutant_ppm: f32,
    influent_ppm: f32,
    output: f32,
}

impl Plant {
    fn step(&mut self) {
        let inflow = 0.05 * (self.influent_ppm - self.pollutant_ppm);
        let removal = 20.0 * self.output / 100.0;
        self.pollutant_ppm = (self.pollutant_ppm + inflow - removal).clamp(0.0, 500.0);
    }
}

impl SensorSource for Plant {
    type Error = ();

    fn read_frame(&mut self) -> nb::Result<RawFrame, ()> {
        self.step();
        let counts = self.pollutant_ppm * 1023.0 / 500.0;
        Ok(RawFrame::new([300.0, counts, 500.0, 400.0, 300.0]))
    }
}

/// Servo angle in degrees
struct Servo {
    angle: f32,
}

impl Actuator for Servo {
    fn write(&mut self, native: f32) {
        self.angle = native;
    }
}

/// Keeps the last decision record as a JSON line
#[derive(Default)]
struct JsonTail {
    published: usize,
    last_decision: Option<String>,
}

impl TelemetrySink for JsonTail {
    fn publish(&mut self, record: &TelemetryRecord) {
        self.published += 1;
        if let piezocat_core::telemetry::TelemetryPayload::Decision(_) = record.payload {
            self.last_decision = serde_json::to_string(record).ok();
        }
    }
}

fn main() {
    println!("Piezo-Catalytic Reactor Closed Loop");
    println!("===================================\n");

    let config = ReactorConfig::default()
        .with_timing(TimingConfig::default().with_intervals(1000, 100, 5000))
        .with_learning(LearningConfig::default().with_seed(2024));
    let mut core = ReactorCore::new(config).unwrap();

    let mut plant = Plant {
        pollutant_ppm: 350.0,
        influent_ppm: 350.0,
        output: 0.0,
    };
    let mut servo = Servo { angle: 0.0 };
    let mut telemetry = JsonTail::default();
    let mut store = MemoryStore::new();

    println!("Time(s) | Mode           | Plant ppm | Fused ppm | Predicted | Output % | Servo °");
    println!("--------|----------------|-----------|-----------|-----------|----------|--------");

    for now in (0..120_000u32).step_by(100) {
        // Operator actions partway through the run
        match now {
            30_000 => core.post_command(Command::SetMode(ControlMode::Maintenance)).unwrap(),
            60_000 => core.post_command(Command::ManualOverride(70.0)).unwrap(),
            90_000 => core.post_command(Command::SetMode(ControlMode::Standard)).unwrap(),
            _ => {}
        }

        let report = core.tick(now, &mut plant, &mut servo, &mut telemetry);
        if let Some(output) = report.output {
            plant.output = output;
        }
        if report.save_due && core.save_parameters(&mut store).is_ok() {
            println!("        | parameters saved after {} learning iterations", core.learner().iterations());
        }

        if now % 10_000 == 0 {
            if let (Some(sensors), Some(forecast)) = (core.latest_sensors(), core.latest_forecast()) {
                println!(
                    "{:>7} | {:<14} | {:>9.1} | {:>9.1} | {:>9.1} | {:>8.1} | {:>6.1}",
                    now / 1000,
                    core.mode().name(),
                    plant.pollutant_ppm,
                    sensors.pollutant(),
                    forecast.predicted_pollution,
                    core.controller().last_output(),
                    servo.angle
                );
            }
        }
    }

    println!("\nTelemetry records published: {}", telemetry.published);
    if let Some(line) = telemetry.last_decision {
        println!("Last decision: {}", line);
    }

    let learner = core.learner();
    println!("\nLearning");
    println!("  iterations:       {}", learner.iterations());
    println!("  exploration rate: {:.3}", learner.exploration_rate());
    println!("  improvement:      {:+.4}", learner.performance_improvement());
    let gains = core.pid_gains();
    println!("  PID gains:        kp {:.3} ki {:.3} kd {:.3}", gains.kp, gains.ki, gains.kd);
    println!("  saves:            {}", store.save_count());
}
