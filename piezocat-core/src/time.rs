//! Time management for the control loop
//!
//! The firmware runs off a free-running 32-bit millisecond counter. It wraps
//! roughly every 49.7 days, so every elapsed-time computation here treats a
//! counter that appears to run backwards as "not yet elapsed" instead of
//! underflowing into a huge interval.

/// Milliseconds since boot from the MCU tick counter
pub type Timestamp = u32;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Fixed time source for testing and host simulation
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock stopped at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to `timestamp`
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance the clock, wrapping like the hardware counter does
    pub fn advance(&mut self, ms: u32) {
        self.timestamp = self.timestamp.wrapping_add(ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Milliseconds from `since` to `now`
///
/// Returns `None` when `now` is before `since` (counter wrapped or was reset).
/// Callers treat that as "not yet elapsed".
pub fn elapsed_ms(since: Timestamp, now: Timestamp) -> Option<u32> {
    if now < since {
        None
    } else {
        Some(now - since)
    }
}

/// Non-blocking periodic timer
///
/// `poll` returns true once per elapsed interval and re-arms itself at the
/// poll instant. A clock that jumped backwards resynchronises the timer and
/// reports "not elapsed".
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval_ms: u32,
    last: Timestamp,
}

impl IntervalTimer {
    /// Create a timer armed at `now`
    pub fn new(interval_ms: u32, now: Timestamp) -> Self {
        Self {
            interval_ms,
            last: now,
        }
    }

    /// Check whether the interval has elapsed, re-arming when it has
    pub fn poll(&mut self, now: Timestamp) -> bool {
        match elapsed_ms(self.last, now) {
            None => {
                self.last = now;
                false
            }
            Some(elapsed) if elapsed >= self.interval_ms => {
                self.last = now;
                true
            }
            Some(_) => false,
        }
    }

    /// Re-arm at `now`
    pub fn reset(&mut self, now: Timestamp) {
        self.last = now;
    }

    /// Change the interval and re-arm at `now`
    pub fn set_interval(&mut self, interval_ms: u32, now: Timestamp) {
        self.interval_ms = interval_ms;
        self.reset(now);
    }

    /// Configured interval
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Milliseconds until the next trigger (full interval after a wrap)
    pub fn remaining(&self, now: Timestamp) -> u32 {
        match elapsed_ms(self.last, now) {
            None => self.interval_ms,
            Some(elapsed) => self.interval_ms.saturating_sub(elapsed),
        }
    }
}

/// Stages of the control loop that run on their own cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DueStages {
    /// Read, fuse and forecast
    pub sample: bool,
    /// Compute control and actuate
    pub control: bool,
    /// Run one learning iteration
    pub learn: bool,
}

impl DueStages {
    /// Sampling and control both due, used for the very first tick
    pub const PRIMED: Self = Self {
        sample: true,
        control: true,
        learn: false,
    };

    /// True when at least one stage is due
    pub fn any(&self) -> bool {
        self.sample || self.control || self.learn
    }
}

/// Owns the three independent, non-multiplexed cadences
#[derive(Debug, Clone)]
pub struct Scheduler {
    sampling: IntervalTimer,
    control: IntervalTimer,
    learning: IntervalTimer,
    primed: bool,
}

impl Scheduler {
    /// Scheduler with all three timers armed at `now`
    pub fn new(sampling_ms: u32, control_ms: u32, learning_ms: u32, now: Timestamp) -> Self {
        Self {
            sampling: IntervalTimer::new(sampling_ms, now),
            control: IntervalTimer::new(control_ms, now),
            learning: IntervalTimer::new(learning_ms, now),
            primed: false,
        }
    }

    /// Which stages are due at `now`
    ///
    /// The first poll after construction or reset runs sampling and control
    /// immediately so the loop has a fused vector before its first interval.
    pub fn poll(&mut self, now: Timestamp) -> DueStages {
        if !self.primed {
            self.primed = true;
            self.sampling.reset(now);
            self.control.reset(now);
            self.learning.reset(now);
            return DueStages::PRIMED;
        }

        DueStages {
            sample: self.sampling.poll(now),
            control: self.control.poll(now),
            learn: self.learning.poll(now),
        }
    }

    /// Forget the priming so the next poll starts a fresh cycle
    pub fn reset(&mut self, now: Timestamp) {
        self.sampling.reset(now);
        self.control.reset(now);
        self.learning.reset(now);
        self.primed = false;
    }
}
