//! Error Types for the Reactor Core
//!
//! ## Design Philosophy
//!
//! Errors follow the same embedded-first rules as the rest of the crate:
//!
//! 1. **Small Size**: every variant is a few bytes so errors can be returned
//!    from the control path without cost.
//!
//! 2. **No Heap Allocation**: messages are `&'static str`, never `String`.
//!
//! 3. **Copy Semantics**: errors are `Copy` and can be stored in reports.
//!
//! ## What Is (and Is Not) an Error
//!
//! Nothing in the control loop is fatal. Sensor faults are resolved by
//! compensation, zero denominators by floor substitution, and malformed
//! commands are dropped. `ReactorError` is only surfaced at the edges:
//!
//! - checked constructors (`Channel::from_index`, `QTable::get`)
//! - configuration validation
//! - the persistence hooks
//! - command construction from untrusted values
//!
//! ```rust
//! use piezocat_core::{Channel, ReactorError};
//!
//! match Channel::from_index(7) {
//!     Ok(_) => unreachable!(),
//!     Err(ReactorError::ChannelOutOfRange { index }) => assert_eq!(index, 7),
//!     Err(_) => unreachable!(),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for reactor core operations
pub type ReactorResult<T> = Result<T, ReactorError>;

/// Reactor core errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ReactorError {
    /// Sensor channel index outside the fixed 5-channel vector
    #[error("Channel index {index} out of range")]
    ChannelOutOfRange {
        /// Offending index
        index: usize,
    },

    /// Action bucket outside the Q-table
    #[error("Action index {index} out of range")]
    ActionOutOfRange {
        /// Offending index
        index: usize,
    },

    /// Pollutant state bucket outside the Q-table
    #[error("State index {index} out of range")]
    StateOutOfRange {
        /// Offending index
        index: usize,
    },

    /// Value makes no physical sense (NaN, infinity, unusable reference)
    #[error("Invalid value: not a finite number")]
    InvalidValue,

    /// Configuration parameters are inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Which constraint failed
        reason: &'static str,
    },

    /// Parameter store could not save or load
    #[error("Persistence failed: {reason}")]
    Persistence {
        /// Why the save or load failed
        reason: &'static str,
    },

    /// Inbound command could not be applied
    #[error("Command rejected: {reason}")]
    CommandRejected {
        /// Why the command was refused
        reason: &'static str,
    },

    /// Raw sampling collaborator reported an error
    #[error("Sensor source unavailable")]
    SensorUnavailable,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReactorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ChannelOutOfRange { index } =>
                defmt::write!(fmt, "Channel {} out of range", index),
            Self::ActionOutOfRange { index } =>
                defmt::write!(fmt, "Action {} out of range", index),
            Self::StateOutOfRange { index } =>
                defmt::write!(fmt, "State {} out of range", index),
            Self::InvalidValue =>
                defmt::write!(fmt, "Invalid value"),
            Self::InvalidConfig { reason } =>
                defmt::write!(fmt, "Invalid config: {}", reason),
            Self::Persistence { reason } =>
                defmt::write!(fmt, "Persistence: {}", reason),
            Self::CommandRejected { reason } =>
                defmt::write!(fmt, "Command rejected: {}", reason),
            Self::SensorUnavailable =>
                defmt::write!(fmt, "Sensor source unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_small() {
        assert!(core::mem::size_of::<ReactorError>() <= 24);
    }

    #[cfg(feature = "std")]
    #[test]
    fn display_includes_context() {
        let err = ReactorError::ChannelOutOfRange { index: 9 };
        assert_eq!(std::format!("{}", err), "Channel index 9 out of range");

        let err = ReactorError::StateOutOfRange { index: 5 };
        assert_eq!(std::format!("{}", err), "State index 5 out of range");

        let err = ReactorError::Persistence { reason: "store empty" };
        assert!(std::format!("{}", err).contains("store empty"));
    }
}
