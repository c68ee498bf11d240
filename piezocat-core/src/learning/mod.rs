//! Reinforcement Learner
//!
//! Runs once per learning interval, far slower than the control loop.
//!
//! ```text
//! reward = 0.5·eff/100 + 0.3·(1 - energy/100) + 0.2·health/100
//! s      = pollutant bucket (100/200/300/400 ppm)
//! a      = ε-greedy over 10 output buckets
//! Q(s,a) += α·(reward + γ·max Q(s,·) - Q(s,a))
//! ε      = max(ε·0.995, 0.01)
//! ```
//!
//! The Bellman target reuses the current state as the next state. The
//! learner only sees one sample per iteration and never observes the
//! transition, so this is a single-state update rather than full Q-learning.
//!
//! Besides the table, each iteration proposes PID gains and, when the
//! forecast missed, new fusion source weights. The caller decides whether
//! to apply them.

pub mod adaptation;
pub mod qtable;

pub use adaptation::{adapt_gains, shift_source_weights};
pub use qtable::{discretize_action, discretize_state, QTable};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::buffer::CircularBuffer;
use crate::config::LearningConfig;
use crate::constants::learning::{
    ACTION_COUNT, REWARD_EFFICIENCY_WEIGHT, REWARD_ENERGY_WEIGHT, REWARD_HEALTH_WEIGHT,
    REWARD_HISTORY_LEN,
};
use crate::control::PidGains;
use crate::fusion::SourceWeights;
use crate::sensor::SensorVector;
use crate::twin::TwinForecast;

/// Multi-objective reward, roughly in [0, 1] for in-range plant figures
pub fn reward(sensors: &SensorVector, twin: &TwinForecast) -> f32 {
    REWARD_EFFICIENCY_WEIGHT * (sensors.efficiency / 100.0)
        + REWARD_ENERGY_WEIGHT * (1.0 - sensors.energy_usage / 100.0)
        + REWARD_HEALTH_WEIGHT * (twin.system_health / 100.0)
}

/// What one iteration sees besides the sensor vector and forecast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningInputs {
    /// Output applied during the last period, percent
    pub last_output: f32,
    /// setpoint - pollutant
    pub tracking_error: f32,
    /// |actual - predicted| pollutant
    pub prediction_error: f32,
    /// Gains the controller is running with
    pub gains: PidGains,
    /// Current fusion source weights
    pub source_weights: SourceWeights,
}

/// Result of one learning iteration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LearningOutcome {
    /// Reward in [0, 1]
    pub reward: f32,
    /// Pollutant bucket
    pub state: usize,
    /// ε-greedy choice used for the table update
    pub action: usize,
    /// Bucket of the output actually applied
    pub applied_action: usize,
    /// Gains after adaptation
    pub gains: PidGains,
    /// New fusion source weights when the forecast missed
    pub source_weights: Option<SourceWeights>,
    /// Iteration count after this one
    pub iteration: u32,
}

/// Persistable learner state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningState {
    /// Learned action values
    pub q_table: QTable,
    /// Gains the learner falls back to
    pub best_gains: PidGains,
    /// Fusion source weights
    pub source_weights: SourceWeights,
    /// Exploration rate epsilon
    pub exploration_rate: f32,
    /// Completed iterations
    pub iterations: u32,
}

/// Tabular Q-learner that tunes the PID gains and fusion source weights
///
/// Exploration draws from a `SmallRng` seeded from the configuration, so runs
/// with the same seed and inputs repeat exactly.
#[derive(Debug, Clone)]
pub struct ReinforcementLearner {
    config: LearningConfig,
    q_table: QTable,
    rng: SmallRng,
    exploration_rate: f32,
    enabled: bool,
    iterations: u32,
    best_gains: PidGains,
    source_weights: SourceWeights,
    rewards: CircularBuffer<f32, REWARD_HISTORY_LEN>,
}

impl ReinforcementLearner {
    /// Learner starting from `best_gains`
    pub fn new(config: LearningConfig, best_gains: PidGains) -> Self {
        Self {
            config,
            q_table: QTable::new(),
            rng: SmallRng::seed_from_u64(config.seed),
            exploration_rate: config.initial_exploration,
            enabled: config.enabled,
            iterations: 0,
            best_gains,
            source_weights: SourceWeights::default(),
            rewards: CircularBuffer::new(),
        }
    }

    /// One iteration; `None` while disabled
    pub fn learn(
        &mut self,
        sensors: &SensorVector,
        twin: &TwinForecast,
        inputs: &LearningInputs,
    ) -> Option<LearningOutcome> {
        if !self.enabled {
            return None;
        }

        let reward = reward(sensors, twin);
        let reward = if reward.is_finite() { reward } else { 0.0 };
        self.rewards.push(reward);

        let state = discretize_state(sensors.pollutant());
        let action = self.select_action(state);
        self.update_q(state, action, reward, state);
        self.decay_exploration();

        let gains = adapt_gains(inputs.gains, self.best_gains, inputs.tracking_error);
        let source_weights = shift_source_weights(inputs.source_weights, inputs.prediction_error);
        if let Some(weights) = source_weights {
            self.source_weights = weights;
        }

        self.iterations = self.iterations.wrapping_add(1);
        log_debug!(
            "learn #{}: reward {} state {} action {} eps {}",
            self.iterations,
            reward,
            state,
            action,
            self.exploration_rate
        );

        Some(LearningOutcome {
            reward,
            state,
            action,
            applied_action: discretize_action(inputs.last_output),
            gains,
            source_weights,
            iteration: self.iterations,
        })
    }

    /// ε-greedy: uniform random action with probability ε, else greedy
    pub fn select_action(&mut self, state: usize) -> usize {
        if self.rng.gen::<f32>() < self.exploration_rate {
            self.rng.gen_range(0..ACTION_COUNT)
        } else {
            self.q_table.best_action(state).unwrap_or(0)
        }
    }

    /// Bellman update; out-of-range indices are ignored
    pub fn update_q(&mut self, state: usize, action: usize, reward: f32, next_state: usize) {
        let (Ok(q), Ok(max_next)) = (
            self.q_table.get(state, action),
            self.q_table.max_value(next_state),
        ) else {
            return;
        };
        let target = reward + self.config.discount * max_next;
        let updated = q + self.config.learning_rate * (target - q);
        let _ = self.q_table.set(state, action, updated);
    }

    /// Shrink epsilon toward its floor
    pub fn decay_exploration(&mut self) {
        self.exploration_rate =
            (self.exploration_rate * self.config.exploration_decay).max(self.config.exploration_floor);
    }

    /// Mean reward of the newer half of the record minus the older half
    pub fn performance_improvement(&self) -> f32 {
        let n = self.rewards.len();
        if n < 2 {
            return 0.0;
        }
        let half = n / 2;
        let older: f32 = self.rewards.iter().take(half).sum::<f32>() / half as f32;
        let newer: f32 = self.rewards.iter().skip(half).sum::<f32>() / (n - half) as f32;
        newer - older
    }

    /// Whether the caller should save parameters after this iteration
    pub fn should_persist(&self) -> bool {
        self.config.persist_every > 0
            && self.iterations > 0
            && self.iterations % self.config.persist_every == 0
    }

    /// Turn learning on or off
    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether iterations run
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current epsilon
    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    /// Completed iterations
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Learned action values
    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Fallback gains
    pub fn best_gains(&self) -> PidGains {
        self.best_gains
    }

    /// Replace the fallback gains; non-finite gains are ignored
    pub fn set_best_gains(&mut self, gains: PidGains) {
        if gains.is_finite() {
            self.best_gains = gains;
        }
    }

    /// Source weights from the last adaptation
    pub fn source_weights(&self) -> SourceWeights {
        self.source_weights
    }

    /// Most recent reward
    pub fn last_reward(&self) -> Option<f32> {
        self.rewards.last()
    }

    /// State to persist
    pub fn snapshot(&self) -> LearningState {
        LearningState {
            q_table: self.q_table,
            best_gains: self.best_gains,
            source_weights: self.source_weights,
            exploration_rate: self.exploration_rate,
            iterations: self.iterations,
        }
    }

    /// Restore a saved state
    ///
    /// Each part is checked on its own: a non-finite table, invalid source
    /// weights or a non-finite exploration rate keep the current value.
    pub fn restore(&mut self, state: LearningState) {
        if state.q_table.is_finite() {
            self.q_table = state.q_table;
        } else {
            log_warn!("saved q-table is not finite, keeping current");
        }
        self.set_best_gains(state.best_gains);
        if state.source_weights.is_valid() {
            self.source_weights = state.source_weights;
        } else {
            log_warn!("saved source weights are invalid, keeping current");
        }
        if state.exploration_rate.is_finite() {
            self.exploration_rate = state
                .exploration_rate
                .clamp(self.config.exploration_floor, 1.0);
        }
        self.iterations = state.iterations;
    }

    /// Clear the table and statistics; best gains and enable flag stay
    pub fn reset(&mut self) {
        self.q_table.clear();
        self.exploration_rate = self.config.initial_exploration;
        self.iterations = 0;
        self.rewards.clear();
        self.source_weights = SourceWeights::default();
        self.rng = SmallRng::seed_from_u64(self.config.seed);
    }
}
