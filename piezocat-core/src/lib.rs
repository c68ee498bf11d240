//! Estimation, forecasting, control and online learning for a piezo-catalytic
//! water-treatment reactor
//!
//! The crate is the algorithmic core of the reactor firmware. Each sampling
//! tick flows through four tightly coupled subsystems:
//!
//! ```text
//! raw samples ─→ FusionEngine ─→ TwinForecaster ─→ AdaptiveController ─→ actuator
//!                     ↑               │                    ↑
//!                     └──── ReinforcementLearner ←─────────┘   (slower cadence)
//! ```
//!
//! Key constraints:
//! - Runs single-threaded on a small MCU, no heap allocation in the hot path
//! - Every operation is bounded and non-blocking
//! - Nothing in the core is fatal: faults degrade the output, never abort it
//!
//! ```no_run
//! use piezocat_core::{ReactorCore, ReactorConfig};
//! # use piezocat_core::io::{SensorSource, Actuator};
//! # use piezocat_core::sensor::RawFrame;
//! # use piezocat_core::telemetry::NullSink;
//! # struct Adc; impl SensorSource for Adc { type Error = (); fn read_frame(&mut self) -> nb::Result<RawFrame, ()> { Ok(RawFrame::new([512.0; 5])) } }
//! # struct Servo; impl Actuator for Servo { fn write(&mut self, _native: f32) {} }
//! # let (mut adc, mut servo, mut sink) = (Adc, Servo, NullSink);
//!
//! let mut core = ReactorCore::new(ReactorConfig::default()).unwrap();
//!
//! // Called from the main loop with the current millisecond counter
//! let report = core.tick(1_000, &mut adc, &mut servo, &mut sink);
//! if let Some(output) = report.output {
//!     // actuator has been driven with `output` percent
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod buffer;
pub mod command;
pub mod config;
pub mod constants;
pub mod control;
pub mod errors;
pub mod fusion;
pub mod io;
pub mod learning;
pub mod persistence;
pub mod reactor;
pub mod sensor;
pub mod telemetry;
pub mod time;
pub mod twin;

// Public API
pub use config::ReactorConfig;
pub use control::{AdaptiveController, ControlMode, select_optimal_mode};
pub use errors::{ReactorError, ReactorResult};
pub use fusion::FusionEngine;
pub use learning::ReinforcementLearner;
pub use reactor::{ReactorCore, TickReport};
pub use sensor::{Channel, SensorVector};
pub use twin::{TwinForecast, TwinForecaster};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
