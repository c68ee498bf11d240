//! Kalman Fusion Engine
//!
//! ## Overview
//!
//! The fusion engine turns one [`RawFrame`] of ADC counts into a
//! [`SensorVector`] in physical units. It owns all per-channel state: the
//! scalar Kalman filters, fault timers, stability windows and calibration.
//!
//! ```text
//! raw ──┬─→ FaultDetector ──────────────────────────┐ fault flag
//!       └─→ ScalarKalman ─→ Calibration ─→ physical ─┤
//!                 │                                  ↓
//!                 └──→ QualityTracker ─→ quality   compensate faulty
//!                                                    ↓
//!                                              fuse_weighted
//! ```
//!
//! ## Faults Never Abort
//!
//! A faulty channel is never dropped from the vector. Its value is replaced
//! by the mean of the other four channels, an unfiltered last-resort
//! estimate, and its quality is forced to 0 so it carries no weight.
//!
//! ## Usage
//!
//! ```rust
//! use piezocat_core::config::FusionConfig;
//! use piezocat_core::fusion::FusionEngine;
//! use piezocat_core::sensor::{Channel, RawFrame};
//!
//! let mut engine = FusionEngine::new(FusionConfig::default());
//! let vector = engine.process(&RawFrame::new([512.0; 5]), 0);
//!
//! assert!(!vector.is_faulty(Channel::Pollutant));
//! let total: f32 = engine.weights().iter().sum();
//! assert!((total - 1.0).abs() < 1e-5);
//! ```

pub mod blend;
pub mod calibration;
pub mod fault;
pub mod kalman;
pub mod quality;

pub use blend::{SourceEstimates, SourceWeights};
pub use calibration::{to_physical, Calibration};
pub use fault::{FaultDetector, FaultThresholds};
pub use kalman::ScalarKalman;
pub use quality::QualityTracker;

use crate::config::FusionConfig;
use crate::constants::sensors::{CHANNEL_COUNT, MIN_CALIBRATION_COUNTS};
use crate::errors::{ReactorError, ReactorResult};
use crate::sensor::{Channel, RawFrame, SensorVector};
use crate::time::Timestamp;

/// Per-channel filtering, fault handling and quality weighting
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
    limits: FaultThresholds,
    filters: [ScalarKalman; CHANNEL_COUNT],
    detectors: [FaultDetector; CHANNEL_COUNT],
    trackers: [QualityTracker; CHANNEL_COUNT],
    calibration: [Calibration; CHANNEL_COUNT],
    weights: [f32; CHANNEL_COUNT],
    source_weights: SourceWeights,
    raw_physical: [f32; CHANNEL_COUNT],
    last_raw: [Option<f32>; CHANNEL_COUNT],
    confidence: f32,
}

impl FusionEngine {
    /// Engine with default calibration and equal channel weights
    pub fn new(config: FusionConfig) -> Self {
        Self {
            limits: FaultThresholds::from(&config),
            filters: [ScalarKalman::from_config(&config); CHANNEL_COUNT],
            detectors: [FaultDetector::new(); CHANNEL_COUNT],
            trackers: core::array::from_fn(|_| QualityTracker::new()),
            calibration: [Calibration::default(); CHANNEL_COUNT],
            weights: [1.0 / CHANNEL_COUNT as f32; CHANNEL_COUNT],
            source_weights: SourceWeights::default(),
            raw_physical: [0.0; CHANNEL_COUNT],
            last_raw: [None; CHANNEL_COUNT],
            confidence: 1.0,
            config,
        }
    }

    /// Run the channel's Kalman filter on one measurement
    pub fn filter(&mut self, channel: Channel, measurement: f32) -> f32 {
        let filter = &mut self.filters[channel.index()];
        if measurement.is_finite() {
            filter.update(measurement)
        } else {
            filter.estimate
        }
    }

    /// Classify a raw sample, updating the channel's fault timers
    pub fn detect_fault(&mut self, channel: Channel, raw: f32, now: Timestamp) -> bool {
        let detector = &mut self.detectors[channel.index()];
        let was_persistent = detector.is_persistent();
        let faulty = detector.detect(raw, now, &self.limits);

        if detector.is_persistent() && !was_persistent {
            log_warn!("{} sensor persistently out of range", channel.name());
        }
        faulty
    }

    /// Last-resort estimate for a faulty channel: mean of the other four
    pub fn compensate(&self, channel: Channel, vector: &SensorVector) -> f32 {
        vector.mean_excluding(channel)
    }

    /// Refresh the quality weights from a vector
    ///
    /// `wᵢ = qᵢ / Σq`. With every quality at 0 the previous weights stay.
    pub fn fuse_weighted(&mut self, vector: &SensorVector) -> [f32; CHANNEL_COUNT] {
        let total: f32 = vector.quality.iter().sum();
        if total > 0.0 {
            for (w, q) in self.weights.iter_mut().zip(vector.quality.iter()) {
                *w = q / total;
            }
        }
        self.weights
    }

    /// Fuse one frame of raw samples into a physical sensor vector
    pub fn process(&mut self, raw: &RawFrame, now: Timestamp) -> SensorVector {
        let mut vector = SensorVector {
            timestamp: now,
            ..SensorVector::default()
        };

        for channel in Channel::ALL {
            let i = channel.index();
            let sample = raw.get(channel);

            let faulty = self.detect_fault(channel, sample, now);
            let filtered = self.filter(channel, sample);

            self.trackers[i].push(filtered);
            vector.values[i] = self.to_physical(channel, filtered);
            vector.faults[i] = faulty;
            vector.quality[i] = self.trackers[i].score(faulty);

            if sample.is_finite() {
                self.last_raw[i] = Some(sample);
                self.raw_physical[i] = self.to_physical(channel, sample);
            }
        }

        // Compensate from the uncompensated snapshot so substitutes never feed each other
        let measured = vector;
        for channel in Channel::ALL {
            if measured.is_faulty(channel) {
                let estimate = self.compensate(channel, &measured);
                log_debug!("compensating {} with {}", channel.name(), estimate);
                vector.set(channel, estimate);
            }
        }

        self.fuse_weighted(&vector);
        self.confidence = vector.quality.iter().sum::<f32>() / CHANNEL_COUNT as f32;
        vector
    }

    fn to_physical(&self, channel: Channel, counts: f32) -> f32 {
        let i = channel.index();
        to_physical(
            self.calibration[i].apply(counts),
            self.config.raw_full_scale,
            self.config.channel_ranges[i],
        )
    }

    /// Current quality weights, summing to 1 once any channel had quality
    pub fn weights(&self) -> [f32; CHANNEL_COUNT] {
        self.weights
    }

    /// Single-point calibration so `raw` counts read as `known_value` counts
    /// Single-point calibration of one channel against a known reading
    ///
    /// `raw` must be a finite reading of at least
    /// [`MIN_CALIBRATION_COUNTS`]; anything smaller would blow the gain up.
    /// On error the channel keeps its current calibration.
    pub fn calibrate(
        &mut self,
        channel: Channel,
        raw: f32,
        known_value: f32,
    ) -> ReactorResult<Calibration> {
        if !raw.is_finite() || !known_value.is_finite() || raw < MIN_CALIBRATION_COUNTS {
            return Err(ReactorError::InvalidValue);
        }

        let calibration = Calibration::from_reference(raw, known_value);
        log_info!(
            "calibrated {}: gain {} offset {}",
            channel.name(),
            calibration.gain,
            calibration.offset
        );
        self.calibration[channel.index()] = calibration;
        Ok(calibration)
    }

    /// Calibrate against the channel's most recent raw sample
    pub fn calibrate_from_last(
        &mut self,
        channel: Channel,
        known_value: f32,
    ) -> ReactorResult<Calibration> {
        let raw = self.last_raw(channel).ok_or(ReactorError::CommandRejected {
            reason: "no raw sample to calibrate against",
        })?;
        self.calibrate(channel, raw, known_value)
    }

    /// Install a calibration directly
    pub fn set_calibration(&mut self, channel: Channel, calibration: Calibration) {
        self.calibration[channel.index()] = calibration;
    }

    /// Current calibration of a channel
    pub fn calibration(&self, channel: Channel) -> Calibration {
        self.calibration[channel.index()]
    }

    /// Retune one channel's filter
    pub fn update_noise(&mut self, channel: Channel, process_noise: f32, measurement_noise: f32) {
        self.filters[channel.index()].set_noise(process_noise, measurement_noise);
    }

    /// Filter state of a channel
    pub fn kalman(&self, channel: Channel) -> &ScalarKalman {
        &self.filters[channel.index()]
    }

    /// Most recent finite raw sample of a channel, in counts
    ///
    /// `None` until the channel has been sampled since construction or reset.
    pub fn last_raw(&self, channel: Channel) -> Option<f32> {
        self.last_raw[channel.index()]
    }

    /// Current four-source blend weights
    pub fn source_weights(&self) -> SourceWeights {
        self.source_weights
    }

    /// Replace the blend weights, normalised to sum to 1
    pub fn set_source_weights(&mut self, weights: SourceWeights) {
        self.source_weights = weights.normalized();
    }

    /// Per-source pollutant estimates for a vector produced by this engine
    pub fn source_estimates(
        &self,
        vector: &SensorVector,
        reaction_rate: f32,
        degradation: f32,
    ) -> SourceEstimates {
        SourceEstimates::from_vector(
            vector,
            self.raw_physical[Channel::Pollutant.index()],
            reaction_rate,
            degradation,
        )
    }

    /// Pollutant level blended from the four estimate sources
    pub fn blend_pollutant(&self, vector: &SensorVector, reaction_rate: f32, degradation: f32) -> f32 {
        self.source_estimates(vector, reaction_rate, degradation)
            .blend(&self.source_weights)
    }

    /// Mean channel quality of the last processed frame
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// True once a range fault has outlasted the persistent limit
    pub fn is_persistently_faulty(&self, channel: Channel) -> bool {
        self.detectors[channel.index()].is_persistent()
    }

    /// Reinitialise one channel's filter, fault timers, window and calibration
    pub fn reset_channel(&mut self, channel: Channel) {
        let i = channel.index();
        self.filters[i] = ScalarKalman::from_config(&self.config);
        self.detectors[i].reset();
        self.trackers[i].clear();
        self.calibration[i] = Calibration::default();
        self.last_raw[i] = None;
    }

    /// Back to the state right after construction
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}
