//! Fuzzy inference for PID gain scheduling
//!
//! Two inputs, five linguistic levels each, a rule base of at most 25 rules.
//!
//! ```text
//! |e|, |Δe| ─→ triangular memberships ─→ min-AND per rule ─→ max per output level
//!                                                              ↓
//!                                           weighted centroid over level centres
//! ```
//!
//! Inputs are clamped into the span of the level centres so the outermost
//! levels saturate instead of dropping to zero.

use heapless::Vec;

use crate::constants::control::{FUZZY_DEFAULT_OUTPUT, FUZZY_LEVELS, MAX_FUZZY_RULES};
use crate::errors::{ReactorError, ReactorResult};

/// Linguistic level of a fuzzy variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FuzzyLevel {
    /// Centred on 0
    VeryLow,
    /// Centred on 25
    Low,
    /// Centred on 50
    Medium,
    /// Centred on 75
    High,
    /// Centred on 100
    VeryHigh,
}

impl FuzzyLevel {
    /// Levels in ascending order
    pub const ALL: [FuzzyLevel; FUZZY_LEVELS] = [
        FuzzyLevel::VeryLow,
        FuzzyLevel::Low,
        FuzzyLevel::Medium,
        FuzzyLevel::High,
        FuzzyLevel::VeryHigh,
    ];

    /// Position in [`FuzzyLevel::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Triangle with peak 1 at `center`, reaching 0 at `center ± width`
pub fn triangle(x: f32, center: f32, width: f32) -> f32 {
    let left = center - width;
    let right = center + width;
    if x <= left || x >= right {
        return 0.0;
    }
    if x <= center {
        (x - left) / (center - left)
    } else {
        (right - x) / (right - center)
    }
}

/// Gaussian bell around `center` with standard deviation `width`
pub fn gaussian(x: f32, center: f32, width: f32) -> f32 {
    let z = (x - center) / width;
    libm::expf(-z * z / 2.0)
}

/// Trapezoid rising over `a..b`, flat over `b..=c`, falling over `c..d`
pub fn trapezoid(x: f32, a: f32, b: f32, c: f32, d: f32) -> f32 {
    if x <= a || x >= d {
        return 0.0;
    }
    if x >= b && x <= c {
        return 1.0;
    }
    if x < b {
        (x - a) / (b - a)
    } else {
        (d - x) / (d - c)
    }
}

/// Centre and half-width of each level
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MembershipParams {
    /// Peak of each level's triangle
    pub centers: [f32; FUZZY_LEVELS],
    /// Half-width of each level's triangle
    pub widths: [f32; FUZZY_LEVELS],
}

impl Default for MembershipParams {
    fn default() -> Self {
        Self {
            centers: [0.0, 25.0, 50.0, 75.0, 100.0],
            widths: [25.0; FUZZY_LEVELS],
        }
    }
}

impl MembershipParams {
    /// Degree of membership of `x` in every level
    pub fn memberships(&self, x: f32) -> [f32; FUZZY_LEVELS] {
        let lo = self.centers[0];
        let hi = self.centers[FUZZY_LEVELS - 1];
        let x = if x.is_nan() { lo } else { x.clamp(lo, hi) };

        let mut mu = [0.0; FUZZY_LEVELS];
        for (i, m) in mu.iter_mut().enumerate() {
            *m = triangle(x, self.centers[i], self.widths[i]);
        }
        mu
    }
}

/// `IF input1 AND input2 THEN output`, scaled by `weight`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuzzyRule {
    /// Level of the first input
    pub input1: FuzzyLevel,
    /// Level of the second input
    pub input2: FuzzyLevel,
    /// Output level the rule fires
    pub output: FuzzyLevel,
    /// Scale on the activation, 1 by default
    pub weight: f32,
}

impl FuzzyRule {
    /// Rule with unit weight
    pub const fn new(input1: FuzzyLevel, input2: FuzzyLevel, output: FuzzyLevel) -> Self {
        Self {
            input1,
            input2,
            output,
            weight: 1.0,
        }
    }

    /// Min-AND activation scaled by the rule weight
    pub fn activation(&self, mu1: &[f32; FUZZY_LEVELS], mu2: &[f32; FUZZY_LEVELS]) -> f32 {
        mu1[self.input1.index()].min(mu2[self.input2.index()]) * self.weight
    }
}

/// Mamdani-style inference over a fixed-capacity rule base
#[derive(Debug, Clone)]
pub struct FuzzyInference {
    params: MembershipParams,
    rules: Vec<FuzzyRule, MAX_FUZZY_RULES>,
}

impl Default for FuzzyInference {
    fn default() -> Self {
        Self::with_default_rules(MembershipParams::default())
    }
}

impl FuzzyInference {
    /// Empty rule base
    pub fn new(params: MembershipParams) -> Self {
        Self {
            params,
            rules: Vec::new(),
        }
    }

    /// Full 5×5 table where the output follows the larger input
    pub fn with_default_rules(params: MembershipParams) -> Self {
        let mut inference = Self::new(params);
        for a in FuzzyLevel::ALL {
            for b in FuzzyLevel::ALL {
                // 25 rules exactly fill the capacity
                let _ = inference.rules.push(FuzzyRule::new(a, b, a.max(b)));
            }
        }
        inference
    }

    /// Append a rule; fails once the rule base is full
    pub fn add_rule(&mut self, rule: FuzzyRule) -> ReactorResult<()> {
        self.rules.push(rule).map_err(|_| ReactorError::InvalidConfig {
            reason: "fuzzy rule base is full",
        })
    }

    /// Empty the rule base
    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Rules in insertion order
    pub fn rules(&self) -> &[FuzzyRule] {
        &self.rules
    }

    /// Membership functions in use
    pub fn params(&self) -> &MembershipParams {
        &self.params
    }

    /// Replace the membership functions
    pub fn set_params(&mut self, params: MembershipParams) {
        self.params = params;
    }

    /// Strongest activation of each output level
    pub fn activations(&self, input1: f32, input2: f32) -> [f32; FUZZY_LEVELS] {
        let mu1 = self.params.memberships(input1);
        let mu2 = self.params.memberships(input2);

        let mut strength = [0.0_f32; FUZZY_LEVELS];
        for rule in self.rules.iter() {
            let slot = &mut strength[rule.output.index()];
            *slot = slot.max(rule.activation(&mu1, &mu2));
        }
        strength
    }

    /// Crisp output in the units of the level centres
    pub fn infer(&self, input1: f32, input2: f32) -> f32 {
        defuzzify(&self.activations(input1, input2), &self.params.centers)
    }
}

/// Weighted centroid, 0.5 when nothing is active
pub fn defuzzify(activations: &[f32; FUZZY_LEVELS], outputs: &[f32; FUZZY_LEVELS]) -> f32 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (a, o) in activations.iter().zip(outputs.iter()) {
        numerator += a * o;
        denominator += a;
    }
    if denominator > 0.0 {
        numerator / denominator
    } else {
        FUZZY_DEFAULT_OUTPUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_shapes() {
        assert_eq!(triangle(50.0, 50.0, 25.0), 1.0);
        assert_eq!(triangle(37.5, 50.0, 25.0), 0.5);
        assert_eq!(triangle(80.0, 50.0, 25.0), 0.0);

        assert_eq!(trapezoid(5.0, 0.0, 10.0, 20.0, 30.0), 0.5);
        assert_eq!(trapezoid(15.0, 0.0, 10.0, 20.0, 30.0), 1.0);
        assert_eq!(trapezoid(25.0, 0.0, 10.0, 20.0, 30.0), 0.5);

        assert_eq!(gaussian(3.0, 3.0, 1.0), 1.0);
        assert!((gaussian(4.0, 3.0, 1.0) - libm::expf(-0.5)).abs() < 1e-6);
    }

    #[test]
    fn memberships_saturate_outside_span() {
        let params = MembershipParams::default();
        assert_eq!(params.memberships(-40.0), [1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(params.memberships(400.0), [0.0, 0.0, 0.0, 0.0, 1.0]);

        let mu = params.memberships(62.5);
        assert_eq!(mu[2], 0.5);
        assert_eq!(mu[3], 0.5);
    }

    #[test]
    fn default_rules_follow_larger_input() {
        let fuzzy = FuzzyInference::default();
        assert_eq!(fuzzy.rules().len(), MAX_FUZZY_RULES);

        assert_eq!(fuzzy.infer(0.0, 0.0), 0.0);
        assert_eq!(fuzzy.infer(100.0, 0.0), 100.0);
        assert_eq!(fuzzy.infer(50.0, 25.0), 50.0);
    }

    #[test]
    fn empty_rule_base_defaults() {
        let mut fuzzy = FuzzyInference::new(MembershipParams::default());
        assert_eq!(fuzzy.infer(30.0, 60.0), 0.5);

        fuzzy
            .add_rule(FuzzyRule::new(FuzzyLevel::Low, FuzzyLevel::Low, FuzzyLevel::High))
            .unwrap();
        assert_eq!(fuzzy.infer(25.0, 25.0), 75.0);
    }

    #[test]
    fn full_rule_base_rejects_more() {
        let mut fuzzy = FuzzyInference::default();
        let rule = FuzzyRule::new(FuzzyLevel::Low, FuzzyLevel::Low, FuzzyLevel::Low);
        assert!(matches!(
            fuzzy.add_rule(rule),
            Err(ReactorError::InvalidConfig { .. })
        ));
    }
}
