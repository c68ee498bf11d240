//! Four-source pollutant blend
//!
//! Besides the per-channel filters, the pollutant level can be estimated
//! from four independent sources:
//!
//! ```text
//! regression  mean of the four other channels
//! physical    pollutant × (1 - reaction rate) × degradation
//! kalman      fused pollutant channel
//! raw         unfiltered pollutant sample in ppm
//! ```
//!
//! The learner shifts weight between the regression and physical sources
//! when forecasts go wrong; the blend itself is a normalised dot product.

use crate::constants::fusion::{SOURCE_COUNT, SOURCE_DEFAULT_WEIGHT};
use crate::sensor::{Channel, SensorVector};

/// Weight of each pollutant estimate source
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceWeights {
    /// Mean of the four other channels
    pub regression: f32,
    /// Kinetic estimate from the reactor model
    pub physical: f32,
    /// Fused pollutant channel
    pub kalman: f32,
    /// Unfiltered pollutant sample
    pub raw: f32,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::from_array([SOURCE_DEFAULT_WEIGHT; SOURCE_COUNT])
    }
}

impl SourceWeights {
    /// Weights in `regression, physical, kalman, raw` order
    pub fn from_array(weights: [f32; SOURCE_COUNT]) -> Self {
        Self {
            regression: weights[0],
            physical: weights[1],
            kalman: weights[2],
            raw: weights[3],
        }
    }

    /// Inverse of [`SourceWeights::from_array`]
    pub fn as_array(&self) -> [f32; SOURCE_COUNT] {
        [self.regression, self.physical, self.kalman, self.raw]
    }

    /// Total weight
    pub fn sum(&self) -> f32 {
        self.as_array().iter().sum()
    }

    /// Finite, non-negative and with a positive total
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|w| w.is_finite() && *w >= 0.0) && self.sum() > 0.0
    }

    /// Rescale to sum to 1; a zero or non-finite total leaves them unchanged
    pub fn normalized(self) -> Self {
        let total = self.sum();
        if !(total > 0.0) || !total.is_finite() {
            return self;
        }
        let mut weights = self.as_array();
        for w in weights.iter_mut() {
            *w /= total;
        }
        Self::from_array(weights)
    }
}

/// Per-source pollutant estimates for one vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEstimates {
    /// Mean of the four other channels, ppm
    pub regression: f32,
    /// `pollutant × (1 - reaction_rate) × degradation`, ppm
    pub physical: f32,
    /// Fused pollutant, ppm
    pub kalman: f32,
    /// Raw pollutant sample converted to ppm
    pub raw: f32,
}

impl SourceEstimates {
    /// Estimates for a fused vector and the raw pollutant sample in ppm
    pub fn from_vector(
        vector: &SensorVector,
        raw_pollutant: f32,
        reaction_rate: f32,
        degradation: f32,
    ) -> Self {
        let pollutant = vector.pollutant();
        Self {
            regression: vector.mean_excluding(Channel::Pollutant),
            physical: pollutant * (1.0 - reaction_rate) * degradation,
            kalman: pollutant,
            raw: raw_pollutant,
        }
    }

    /// Estimates in weight order
    pub fn as_array(&self) -> [f32; SOURCE_COUNT] {
        [self.regression, self.physical, self.kalman, self.raw]
    }

    /// Weighted mean; falls back to the Kalman estimate with no usable weight
    pub fn blend(&self, weights: &SourceWeights) -> f32 {
        let total = weights.sum();
        if !(total > 0.0) {
            return self.kalman;
        }
        let dot: f32 = self
            .as_array()
            .iter()
            .zip(weights.as_array().iter())
            .map(|(s, w)| s * w)
            .sum();
        dot / total
    }
}
