//! Property tests for the invariants the control loop relies on

use proptest::prelude::*;

use piezocat_core::config::{ControlConfig, FusionConfig, LearningConfig, StandardLaw};
use piezocat_core::control::{AdaptiveController, ControlMode, PidGains};
use piezocat_core::fusion::{FusionEngine, ScalarKalman};
use piezocat_core::learning::ReinforcementLearner;
use piezocat_core::sensor::{Channel, RawFrame, SensorVector};
use piezocat_core::twin::TwinForecast;

fn standard_law(fuzzy: bool) -> StandardLaw {
    if fuzzy {
        StandardLaw::FuzzyPid
    } else {
        StandardLaw::Pid
    }
}

proptest! {
    #[test]
    fn control_output_stays_in_percent_range(
        mode in 0u8..5,
        fuzzy in any::<bool>(),
        values in proptest::array::uniform5(-1.0e4f32..1.0e4),
        energy in -100.0f32..200.0,
        efficiency in -100.0f32..200.0,
        predicted in -1.0e4f32..1.0e4,
        setpoint in -1.0e4f32..1.0e4,
        health in 0.0f32..100.0,
        steps in 1usize..20,
    ) {
        let config = ControlConfig::default().with_standard_law(standard_law(fuzzy));
        let mut controller = AdaptiveController::new(config, 0.1);
        controller.set_mode(ControlMode::from_code(mode).unwrap());

        let sensors = SensorVector::from_values(values, 0).with_plant(energy, efficiency);
        let twin = TwinForecast {
            predicted_pollution: predicted,
            optimal_setpoint: setpoint,
            system_health: health,
            ..TwinForecast::default()
        };

        for _ in 0..steps {
            let output = controller.compute_control(&sensors, &twin);
            prop_assert!((0.0..=100.0).contains(&output), "output {} out of range", output);
        }
    }

    #[test]
    fn kalman_gain_bounded_for_any_noise(
        q in 0.0f32..10.0,
        r in 0.0f32..10.0,
        measurements in proptest::collection::vec(-1.0e3f32..1.0e3, 1..100),
    ) {
        let mut filter = ScalarKalman::new(250.0, 1.0, q, r);
        for z in measurements {
            filter.update(z);
            prop_assert!((0.0..=1.0).contains(&filter.last_gain()));
        }
    }

    #[test]
    fn kalman_error_never_grows_with_fixed_noise(
        measurements in proptest::collection::vec(-1.0e3f32..1.0e3, 1..100),
    ) {
        let mut filter = ScalarKalman::from_config(&FusionConfig::default());
        let mut previous = filter.error;
        for z in measurements {
            filter.update(z);
            prop_assert!(filter.error <= previous + 1e-6);
            previous = filter.error;
        }
    }

    #[test]
    fn isolated_spike_clears_after_steady_samples(
        baseline in 100.0f32..900.0,
        spike in 0.0f32..2000.0,
        lead in 1u32..6,
    ) {
        let mut engine = FusionEngine::new(FusionConfig::default());
        let steady = RawFrame::new([baseline; 5]);
        let mut spiked = steady;
        spiked.set(Channel::Pollutant, spike);

        let mut now = 0;
        for _ in 0..lead {
            engine.process(&steady, now);
            now += 1000;
        }
        engine.process(&spiked, now);

        let mut last = SensorVector::default();
        for _ in 0..11 {
            now += 1000;
            last = engine.process(&steady, now);
        }
        prop_assert!(!last.is_faulty(Channel::Pollutant));
        prop_assert!(!engine.is_persistently_faulty(Channel::Pollutant));
    }

    #[test]
    fn fusion_weights_sum_to_one(
        frames in proptest::collection::vec(proptest::array::uniform5(-100.0f32..2000.0), 1..30),
    ) {
        let mut engine = FusionEngine::new(FusionConfig::default());
        for (i, samples) in frames.into_iter().enumerate() {
            let vector = engine.process(&RawFrame::new(samples), i as u32 * 1000);
            let weights = engine.weights();
            if vector.quality.iter().any(|&q| q > 0.0) {
                let sum: f32 = weights.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-4, "weights sum {}", sum);
            }
            prop_assert!(weights.iter().all(|w| (0.0..=1.0 + 1e-6).contains(w)));
        }
    }

    #[test]
    fn q_values_stay_bounded(
        reward in 0.0f32..=1.0,
        visits in proptest::collection::vec((0usize..5, 0usize..10), 1..2000),
    ) {
        let config = LearningConfig::default();
        let bound = 1.0 / (1.0 - config.discount) + 1e-3;
        let mut learner = ReinforcementLearner::new(config, PidGains::new(1.0, 0.1, 0.05));

        for (state, action) in visits {
            learner.update_q(state, action, reward, state);
        }
        for q in learner.q_table().iter() {
            prop_assert!((0.0..=bound).contains(&q), "q {} escaped [0, {}]", q, bound);
        }
    }

    #[test]
    fn exploration_never_rises_or_drops_below_floor(
        initial in 0.05f32..1.0,
        decay in 0.5f32..=1.0,
        floor in 0.0f32..0.05,
        iterations in 1usize..500,
    ) {
        let config = LearningConfig::default().with_exploration(initial, decay, floor);
        let mut learner = ReinforcementLearner::new(config, PidGains::new(1.0, 0.1, 0.05));
        let mut previous = learner.exploration_rate();
        for _ in 0..iterations {
            learner.decay_exploration();
            let rate = learner.exploration_rate();
            prop_assert!(rate <= previous);
            prop_assert!(rate >= floor);
            previous = rate;
        }
    }
}
