//! End-to-end scenarios with hand-checked expected values

use piezocat_core::config::{ControlConfig, PidConfig, TwinConfig};
use piezocat_core::constants::twin::{INITIAL_REACTION_RATE, MAX_ENERGY_USAGE};
use piezocat_core::control::{select_optimal_mode, AdaptiveController, ControlMode, PidController};
use piezocat_core::sensor::SensorVector;
use piezocat_core::twin::{system_health, ReactorModel, TwinForecast, TwinForecaster};

#[test]
fn shock_load_is_advised_and_boosts_standard_output() {
    let sensors = SensorVector::from_values([30.0, 350.0, 500.0, 7.0, 25.0], 0).with_plant(40.0, 90.0);
    let twin = TwinForecast {
        predicted_pollution: 340.0,
        optimal_setpoint: 400.0,
        system_health: 80.0,
        ..TwinForecast::default()
    };

    let advised = select_optimal_mode(&sensors, &twin, MAX_ENERGY_USAGE);
    assert_eq!(advised, ControlMode::ShockLoad);

    let mut standard = AdaptiveController::new(ControlConfig::default(), 0.1);
    let mut shock = AdaptiveController::new(ControlConfig::default(), 0.1);
    shock.set_mode(advised);

    for _ in 0..10 {
        let base = standard.compute_control(&sensors, &twin);
        let boosted = shock.compute_control(&sensors, &twin);
        assert!(boosted <= 100.0);
        assert!(boosted >= base, "shock {} < standard {}", boosted, base);
    }
}

#[test]
fn healthy_plant_scores_full_health() {
    let sensors = SensorVector::from_values([30.0, 150.0, 500.0, 7.0, 25.0], 0).with_plant(40.0, 90.0);
    assert_eq!(sensors.fault_count(), 0);
    assert_eq!(system_health(&sensors, MAX_ENERGY_USAGE), 100.0);

    let mut twin = TwinForecaster::new(TwinConfig::default());
    assert_eq!(twin.forecast(&sensors).system_health, 100.0);
}

#[test]
fn proportional_only_pid_outputs_error() {
    let mut pid = PidController::new(PidConfig::default().with_gains(1.0, 0.0, 0.0));
    let output = pid.compute(100.0, 50.0, 1.0);
    assert_eq!(output, 50.0);
    assert_eq!(pid.proportional_term(), 50.0);
}

#[test]
fn reaction_rate_decays_geometrically_on_repeated_misses() {
    let mut model = ReactorModel::default();
    for tick in 1..=10 {
        model.drift(25.0, 10.0, tick * 1000);
    }
    let expected = (INITIAL_REACTION_RATE * 0.95f32.powi(10)).max(0.01);
    assert!((model.reaction_rate - expected).abs() < 1e-6);

    for tick in 11..=200 {
        model.drift(25.0, 10.0, tick * 1000);
    }
    assert_eq!(model.reaction_rate, 0.01);
}

#[test]
fn twin_miss_slows_reaction_rate() {
    let mut twin = TwinForecaster::new(TwinConfig::default());
    // First forecast leans on the 250 ppm AR default, far from 500
    let sensors = SensorVector::from_values([0.0, 500.0, 0.0, 7.0, 25.0], 0).with_plant(0.0, 0.0);
    twin.forecast(&sensors);
    assert!((twin.model().reaction_rate - INITIAL_REACTION_RATE * 0.95).abs() < 1e-6);
}
