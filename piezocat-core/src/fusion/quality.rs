//! Data quality scoring
//!
//! Quality is derived from the dispersion of the last few filtered samples:
//!
//! ```text
//! dv        = variance / (mean + ε)
//! stability = 1 - clamp(dv, 0, 0.5)
//! quality   = clamp(0.7·stability + 0.3·(1 - dv), 0, 1)
//! ```
//!
//! A faulty channel scores 0 regardless of its history.

use crate::buffer::CircularBuffer;
use crate::constants::fusion::{
    QUALITY_EPSILON, QUALITY_STABILITY_WEIGHT, QUALITY_VARIANCE_WEIGHT, STABILITY_CLAMP,
    STABILITY_WINDOW,
};

/// Rolling stability window of one channel
#[derive(Debug, Clone, Default)]
pub struct QualityTracker {
    window: CircularBuffer<f32, STABILITY_WINDOW>,
}

impl QualityTracker {
    /// Tracker with an empty window
    pub const fn new() -> Self {
        Self {
            window: CircularBuffer::new(),
        }
    }

    /// Record one filtered value
    pub fn push(&mut self, value: f32) {
        self.window.push(value);
    }

    /// Normalised dispersion over the window, 0 when empty
    pub fn dispersion(&self) -> f32 {
        match (self.window.mean(), self.window.variance()) {
            (Some(mean), Some(variance)) => variance / (mean + QUALITY_EPSILON),
            _ => 0.0,
        }
    }

    /// 1 for a perfectly steady channel, never below 0.5
    pub fn stability(&self) -> f32 {
        1.0 - self.dispersion().clamp(0.0, STABILITY_CLAMP)
    }

    /// Quality in [0, 1]
    pub fn score(&self, faulty: bool) -> f32 {
        if faulty {
            return 0.0;
        }
        let dv = self.dispersion();
        let stability = 1.0 - dv.clamp(0.0, STABILITY_CLAMP);
        let quality = QUALITY_STABILITY_WEIGHT * stability + QUALITY_VARIANCE_WEIGHT * (1.0 - dv);
        if quality.is_nan() {
            0.0
        } else {
            quality.clamp(0.0, 1.0)
        }
    }

    /// Empty the window
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_channel_scores_one() {
        let mut tracker = QualityTracker::new();
        for _ in 0..5 {
            tracker.push(512.0);
        }
        assert_eq!(tracker.dispersion(), 0.0);
        assert_eq!(tracker.score(false), 1.0);
        assert_eq!(tracker.score(true), 0.0);
    }

    #[test]
    fn noisy_channel_scores_lower() {
        let mut tracker = QualityTracker::new();
        for v in [100.0, 120.0, 80.0, 110.0, 90.0] {
            tracker.push(v);
        }
        // variance 200, mean 100: dv ≈ 2, stability 0.5, quality 0.35 - 0.3
        let quality = tracker.score(false);
        assert!((tracker.stability() - 0.5).abs() < 1e-6);
        assert!((quality - 0.05).abs() < 1e-3);
    }

    #[test]
    fn empty_window_is_trusted() {
        let tracker = QualityTracker::new();
        assert_eq!(tracker.score(false), 1.0);
    }
}
