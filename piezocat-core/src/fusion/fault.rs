//! Per-channel fault detection on raw samples
//!
//! Two independent triggers, each with its own hold timer:
//!
//! | Trigger | Condition | Faulty when | Persistent when |
//! |---------|-----------|-------------|-----------------|
//! | Range   | raw outside the plausible band | immediately | held > `persistent_fault_ms` |
//! | Jump    | relative change > `jump_threshold` | held > `jump_hold_ms` | never |
//!
//! Timers are edge-reset: the first reading that no longer violates a
//! trigger clears its timer, there is no decay. An out-of-range reading does
//! not become the jump reference, so a channel returning into range is
//! compared against its last plausible value.

use crate::config::FusionConfig;
use crate::time::{elapsed_ms, Timestamp};

/// Fault detection thresholds, copied out of [`FusionConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultThresholds {
    /// Lowest plausible raw reading
    pub plausible_min: f32,
    /// Highest plausible raw reading
    pub plausible_max: f32,
    /// Range fault hold before it turns persistent, ms
    pub persistent_ms: u32,
    /// Relative change that counts as a jump
    pub jump_threshold: f32,
    /// Jump hold before the channel is flagged, ms
    pub jump_hold_ms: u32,
}

impl From<&FusionConfig> for FaultThresholds {
    fn from(config: &FusionConfig) -> Self {
        Self {
            plausible_min: config.plausible_min,
            plausible_max: config.plausible_max,
            persistent_ms: config.persistent_fault_ms,
            jump_threshold: config.jump_threshold,
            jump_hold_ms: config.jump_hold_ms,
        }
    }
}

/// Fault state of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultDetector {
    previous: Option<f32>,
    range_since: Option<Timestamp>,
    jump_since: Option<Timestamp>,
    persistent: bool,
}

impl FaultDetector {
    /// Detector with no history
    pub const fn new() -> Self {
        Self {
            previous: None,
            range_since: None,
            jump_since: None,
            persistent: false,
        }
    }

    /// Classify a raw sample taken at `now`, returning true when faulty
    pub fn detect(&mut self, raw: f32, now: Timestamp, limits: &FaultThresholds) -> bool {
        if !(raw >= limits.plausible_min && raw <= limits.plausible_max) {
            if held_longer(&mut self.range_since, now, limits.persistent_ms) {
                self.persistent = true;
            }
            return true;
        }
        self.range_since = None;

        if let Some(previous) = self.previous.filter(|&p| p > 0.0) {
            let change = libm::fabsf(raw - previous) / previous;
            if change > limits.jump_threshold {
                if held_longer(&mut self.jump_since, now, limits.jump_hold_ms) {
                    return true;
                }
            } else {
                self.jump_since = None;
            }
        }

        self.previous = Some(raw);
        self.persistent = false;
        false
    }

    /// Out-of-range condition held past the persistent limit
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Forget history and timers
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Start or continue a hold timer; a backwards clock restarts it
fn held_longer(timer: &mut Option<Timestamp>, now: Timestamp, limit_ms: u32) -> bool {
    let since = *timer.get_or_insert(now);
    match elapsed_ms(since, now) {
        Some(held) => held > limit_ms,
        None => {
            *timer = Some(now);
            false
        }
    }
}
