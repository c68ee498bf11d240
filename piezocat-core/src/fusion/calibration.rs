//! Per-channel calibration and physical conversion

use crate::constants::sensors::CALIBRATION_EPSILON;

/// Linear correction applied to filtered counts before conversion
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calibration {
    /// Added after scaling, counts
    pub offset: f32,
    /// Multiplier on raw counts
    pub gain: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: 0.0,
            gain: 1.0,
        }
    }
}

impl Calibration {
    /// Calibration from explicit coefficients
    pub fn new(offset: f32, gain: f32) -> Self {
        Self { offset, gain }
    }

    /// Single-point calibration: `raw` counts should read as `known` counts
    pub fn from_reference(raw: f32, known: f32) -> Self {
        Self {
            offset: 0.0,
            gain: known / (raw + CALIBRATION_EPSILON),
        }
    }

    /// Corrected counts
    pub fn apply(&self, raw: f32) -> f32 {
        raw * self.gain + self.offset
    }
}

/// Map calibrated counts in `[0, full_scale]` onto `(min, max)`
pub fn to_physical(counts: f32, full_scale: f32, range: (f32, f32)) -> f32 {
    let (min, max) = range;
    counts * (max - min) / full_scale + min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_is_linear() {
        assert_eq!(to_physical(0.0, 1023.0, (0.0, 500.0)), 0.0);
        assert_eq!(to_physical(1023.0, 1023.0, (0.0, 500.0)), 500.0);
        assert!((to_physical(511.5, 1023.0, (0.0, 14.0)) - 7.0).abs() < 1e-5);
    }

    #[test]
    fn reference_point_maps_onto_known_value() {
        let calibration = Calibration::from_reference(400.0, 600.0);
        assert!((calibration.apply(400.0) - 600.0).abs() < 0.01);
        assert_eq!(Calibration::default().apply(123.0), 123.0);
    }
}
