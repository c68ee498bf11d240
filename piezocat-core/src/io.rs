//! Hardware boundary
//!
//! The core never touches a peripheral directly. Raw samples come in
//! through [`SensorSource`] and the actuator command goes out through
//! [`Actuator`]; both are implemented by the board support code.
//!
//! Reads are non-blocking in the `nb` style: a source that has no complete
//! frame yet returns `WouldBlock` and the sampling stage is skipped for
//! that pass.
//!
//! ```rust
//! use piezocat_core::io::SensorSource;
//! use piezocat_core::sensor::RawFrame;
//!
//! struct Adc {
//!     ready: bool,
//! }
//!
//! impl SensorSource for Adc {
//!     type Error = ();
//!
//!     fn read_frame(&mut self) -> nb::Result<RawFrame, ()> {
//!         if !self.ready {
//!             return Err(nb::Error::WouldBlock);
//!         }
//!         Ok(RawFrame::new([512.0; 5]))
//!     }
//! }
//!
//! let mut adc = Adc { ready: false };
//! assert!(matches!(adc.read_frame(), Err(nb::Error::WouldBlock)));
//! adc.ready = true;
//! assert!(adc.read_frame().is_ok());
//! ```

use crate::sensor::RawFrame;

/// Supplier of one raw sample per channel
pub trait SensorSource {
    /// Hardware-specific read failure
    type Error;

    /// Next complete frame of raw counts
    fn read_frame(&mut self) -> nb::Result<RawFrame, Self::Error>;
}

/// Consumer of the actuator command in its native range
pub trait Actuator {
    /// Drive the actuator to `native`, already clamped to its range
    fn write(&mut self, native: f32);
}

impl<S: SensorSource + ?Sized> SensorSource for &mut S {
    type Error = S::Error;

    fn read_frame(&mut self) -> nb::Result<RawFrame, Self::Error> {
        (**self).read_frame()
    }
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn write(&mut self, native: f32) {
        (**self).write(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Last(f32);

    impl Actuator for Last {
        fn write(&mut self, native: f32) {
            self.0 = native;
        }
    }

    fn drive<A: Actuator>(mut actuator: A, value: f32) {
        actuator.write(value);
    }

    #[test]
    fn mutable_reference_forwards() {
        let mut servo = Last(0.0);
        drive(&mut servo, 90.0);
        assert_eq!(servo.0, 90.0);
    }
}
