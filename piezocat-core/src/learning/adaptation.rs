//! Parameter adaptation driven by the learner

use crate::constants::learning::{
    GAIN_BOOST_ERROR, KI_SHRINK, KP_BOOST, PHYSICAL_GROW, REGRESSION_SHRINK, WEIGHT_SHIFT_ERROR,
};
use crate::control::PidGains;
use crate::fusion::SourceWeights;

/// Gains for the next learning period
///
/// A large tracking error boosts Kp and softens Ki relative to the best
/// known gains, leaving Kd as it is. Otherwise the best gains come back
/// unchanged.
pub fn adapt_gains(current: PidGains, best: PidGains, error: f32) -> PidGains {
    if libm::fabsf(error) > GAIN_BOOST_ERROR {
        PidGains::new(best.kp * KP_BOOST, best.ki * KI_SHRINK, current.kd)
    } else {
        best
    }
}

/// Shift weight from the regression source to the physical model
///
/// Returns `None` while the forecast is good enough.
pub fn shift_source_weights(weights: SourceWeights, prediction_error: f32) -> Option<SourceWeights> {
    if !(prediction_error > WEIGHT_SHIFT_ERROR) {
        return None;
    }
    let shifted = SourceWeights {
        regression: weights.regression * REGRESSION_SHRINK,
        physical: weights.physical * PHYSICAL_GROW,
        ..weights
    };
    Some(shifted.normalized())
}
