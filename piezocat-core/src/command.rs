//! Inbound operator commands
//!
//! Commands arrive from the communication side at any time and are applied
//! at the start of the next tick. The mailbox holds one pending command per
//! kind: posting a second command of the same kind replaces the first, and
//! draining empties every slot, so each command is applied at most once.
//!
//! Values are validated when the command is built; a malformed command is
//! rejected before it can reach the core.

use heapless::Vec;

use crate::control::ControlMode;
use crate::errors::{ReactorError, ReactorResult};
use crate::sensor::Channel;

/// Number of command kinds, and the most a single drain can return
pub const COMMAND_KINDS: usize = 5;

/// Inbound request that changes controller state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Switch the control mode
    SetMode(ControlMode),
    /// Pollutant target in ppm
    SetTarget(f32),
    /// Fixed output in percent, clamped by the controller
    ManualOverride(f32),
    /// Return to the mode's own control law
    CancelOverride,
    /// Reinitialise every subsystem; configuration is kept
    Reset,
    /// Single-point calibration against the channel's last raw sample
    Calibrate {
        /// Channel to calibrate
        channel: Channel,
        /// What the last raw sample should have read, in counts
        known_value: f32,
    },
}

impl Command {
    /// Mode change from a wire code
    pub fn set_mode_raw(code: u8) -> ReactorResult<Self> {
        ControlMode::from_code(code).map(Command::SetMode)
    }

    /// Target change; the value must be finite
    pub fn set_target(target: f32) -> ReactorResult<Self> {
        finite(target, "target must be finite").map(Command::SetTarget)
    }

    /// Override with a fixed output percent
    pub fn manual_override(output: f32) -> ReactorResult<Self> {
        finite(output, "override must be finite").map(Command::ManualOverride)
    }

    /// Calibration request from an untrusted channel index
    pub fn calibrate(channel_index: usize, known_value: f32) -> ReactorResult<Self> {
        let channel = Channel::from_index(channel_index)?;
        let known_value = finite(known_value, "calibration value must be finite")?;
        Ok(Command::Calibrate {
            channel,
            known_value,
        })
    }

    /// Check values of a command built directly from its variants
    pub fn validate(&self) -> ReactorResult<()> {
        match *self {
            Command::SetTarget(v) => finite(v, "target must be finite").map(drop),
            Command::ManualOverride(v) => finite(v, "override must be finite").map(drop),
            Command::Calibrate { known_value, .. } => {
                finite(known_value, "calibration value must be finite").map(drop)
            }
            Command::SetMode(_) | Command::CancelOverride | Command::Reset => Ok(()),
        }
    }
}

fn finite(value: f32, reason: &'static str) -> ReactorResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ReactorError::CommandRejected { reason })
    }
}

/// Pending override change; set and cancel share one slot
#[derive(Debug, Clone, Copy, PartialEq)]
enum OverrideRequest {
    Set(f32),
    Cancel,
}

/// One slot per command kind
#[derive(Debug, Clone, Default)]
pub struct CommandMailbox {
    reset: bool,
    calibrate: Option<(Channel, f32)>,
    mode: Option<ControlMode>,
    target: Option<f32>,
    manual: Option<OverrideRequest>,
}

impl CommandMailbox {
    /// Mailbox with every slot empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command, replacing any pending one of the same kind
    pub fn post(&mut self, command: Command) -> ReactorResult<()> {
        if let Err(e) = command.validate() {
            log_warn!("command rejected: {:?}", command);
            return Err(e);
        }
        match command {
            Command::SetMode(mode) => self.mode = Some(mode),
            Command::SetTarget(target) => self.target = Some(target),
            Command::ManualOverride(output) => self.manual = Some(OverrideRequest::Set(output)),
            Command::CancelOverride => self.manual = Some(OverrideRequest::Cancel),
            Command::Reset => self.reset = true,
            Command::Calibrate {
                channel,
                known_value,
            } => self.calibrate = Some((channel, known_value)),
        }
        Ok(())
    }

    /// True when no command of any kind is pending
    pub fn is_empty(&self) -> bool {
        !self.reset
            && self.calibrate.is_none()
            && self.mode.is_none()
            && self.target.is_none()
            && self.manual.is_none()
    }

    /// Take every pending command in application order
    ///
    /// Reset comes first so the rest apply to a clean core; the override
    /// comes after the mode change, which would otherwise cancel it.
    pub fn drain(&mut self) -> Vec<Command, COMMAND_KINDS> {
        let mut out = Vec::new();
        let taken = core::mem::take(self);

        let pending = [
            taken.reset.then_some(Command::Reset),
            taken.calibrate.map(|(channel, known_value)| Command::Calibrate {
                channel,
                known_value,
            }),
            taken.mode.map(Command::SetMode),
            taken.target.map(Command::SetTarget),
            taken.manual.map(|request| match request {
                OverrideRequest::Set(output) => Command::ManualOverride(output),
                OverrideRequest::Cancel => Command::CancelOverride,
            }),
        ];
        for command in pending.into_iter().flatten() {
            // One slot per kind never exceeds the capacity
            let _ = out.push(command);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_mode_codes_are_checked() {
        assert_eq!(
            Command::set_mode_raw(3),
            Ok(Command::SetMode(ControlMode::ShockLoad))
        );
        assert!(matches!(
            Command::set_mode_raw(9),
            Err(ReactorError::CommandRejected { .. })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert!(Command::set_target(f32::NAN).is_err());
        assert!(Command::manual_override(f32::INFINITY).is_err());
        assert!(matches!(
            Command::calibrate(5, 100.0),
            Err(ReactorError::ChannelOutOfRange { index: 5 })
        ));

        let mut mailbox = CommandMailbox::new();
        assert!(mailbox.post(Command::SetTarget(f32::NAN)).is_err());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn later_post_replaces_same_kind() {
        let mut mailbox = CommandMailbox::new();
        mailbox.post(Command::ManualOverride(40.0)).unwrap();
        mailbox.post(Command::CancelOverride).unwrap();
        mailbox.post(Command::SetTarget(80.0)).unwrap();
        mailbox.post(Command::SetTarget(90.0)).unwrap();

        let drained = mailbox.drain();
        assert_eq!(drained.as_slice(), &[Command::SetTarget(90.0), Command::CancelOverride]);
    }

    #[test]
    fn drain_is_at_most_once_and_ordered() {
        let mut mailbox = CommandMailbox::new();
        mailbox.post(Command::ManualOverride(40.0)).unwrap();
        mailbox.post(Command::SetMode(ControlMode::Maintenance)).unwrap();
        mailbox.post(Command::Reset).unwrap();

        let drained = mailbox.drain();
        assert_eq!(
            drained.as_slice(),
            &[
                Command::Reset,
                Command::SetMode(ControlMode::Maintenance),
                Command::ManualOverride(40.0),
            ]
        );
        assert!(mailbox.is_empty());
        assert!(mailbox.drain().is_empty());
    }
}
