//! Sensor Fault Injection Example
//!
//! Shows how the fusion engine keeps producing a usable vector while a
//! channel misbehaves, and how an operator calibration is applied.
//!
//! ## Scenarios
//!
//! 1. A single out-of-range spike on the pollutant channel
//! 2. The pollutant sensor stuck at full scale until it turns persistent
//! 3. Recovery, then a single-point calibration of the channel
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_fault_injection
//! ```

use piezocat_core::command::Command;
use piezocat_core::io::{Actuator, SensorSource};
use piezocat_core::sensor::{Channel, RawFrame};
use piezocat_core::telemetry::NullSink;
use piezocat_core::{ReactorConfig, ReactorCore, TickReport};

struct ScriptedAdc {
    frame: RawFrame,
}

impl SensorSource for ScriptedAdc {
    type Error = ();

    fn read_frame(&mut self) -> nb::Result<RawFrame, ()> {
        Ok(self.frame)
    }
}

struct NoActuator;

impl Actuator for NoActuator {
    fn write(&mut self, _native: f32) {}
}

fn print_sample(label: &str, core: &ReactorCore, report: &TickReport) {
    let (Some(sensors), Some(forecast)) = (report.sensors, report.forecast) else {
        return;
    };
    println!(
        "{:<10} | {:>9.1} | {:>6} | {:>10} | {:>7.2} | {:>6.1}",
        label,
        sensors.pollutant(),
        sensors.is_faulty(Channel::Pollutant),
        core.fusion().is_persistently_faulty(Channel::Pollutant),
        sensors.quality(Channel::Pollutant),
        forecast.system_health
    );
}

fn main() {
    println!("Sensor Fault Injection");
    println!("======================\n");

    let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
    let mut adc = ScriptedAdc {
        frame: RawFrame::new([300.0, 512.0, 500.0, 400.0, 300.0]),
    };
    let mut now = 0u32;

    println!("Phase      | Pollutant | Faulty | Persistent | Quality | Health");
    println!("-----------|-----------|--------|------------|---------|-------");

    let mut sample = |core: &mut ReactorCore, adc: &mut ScriptedAdc, label: &str| {
        let report = core.tick(now, adc, &mut NoActuator, &mut NullSink);
        print_sample(label, core, &report);
        now += 1000;
    };

    for _ in 0..5 {
        sample(&mut core, &mut adc, "steady");
    }

    // Scenario 1: one implausible reading
    adc.frame.set(Channel::Pollutant, 1020.0);
    sample(&mut core, &mut adc, "spike");
    adc.frame.set(Channel::Pollutant, 512.0);
    for _ in 0..3 {
        sample(&mut core, &mut adc, "recovered");
    }

    // Scenario 2: stuck at full scale
    adc.frame.set(Channel::Pollutant, 1023.0);
    for _ in 0..8 {
        sample(&mut core, &mut adc, "stuck");
    }

    // Scenario 3: repaired, then calibrated so 512 counts read as 400
    adc.frame.set(Channel::Pollutant, 512.0);
    sample(&mut core, &mut adc, "repaired");
    core.post_command(Command::calibrate(Channel::Pollutant.index(), 400.0).unwrap())
        .unwrap();
    for _ in 0..5 {
        sample(&mut core, &mut adc, "calibrated");
    }

    let calibration = core.fusion().calibration(Channel::Pollutant);
    println!(
        "\nPollutant calibration: gain {:.4}, offset {:.1}",
        calibration.gain, calibration.offset
    );
}
