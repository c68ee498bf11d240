//! Save/load hooks for learned parameters
//!
//! The core decides *what* to persist (PID state, learner state, reactor
//! model) and *when*; the storage medium is behind [`ParameterStore`].
//! A failed load is reported and the core keeps running on defaults.

use crate::control::PidState;
use crate::errors::{ReactorError, ReactorResult};
use crate::learning::LearningState;
use crate::twin::ReactorModel;

/// Layout version written with every snapshot
pub const SNAPSHOT_VERSION: u16 = 1;

/// Everything the core persists
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSnapshot {
    /// Layout version, [`SNAPSHOT_VERSION`] when written by this crate
    pub version: u16,
    /// PID gains and integrator state
    pub pid: PidState,
    /// Q-table, best gains, source weights and exploration
    pub learning: LearningState,
    /// Drifting reactor model
    pub model: ReactorModel,
}

impl ParameterSnapshot {
    /// Snapshot stamped with the current layout version
    pub fn new(pid: PidState, learning: LearningState, model: ReactorModel) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            pid,
            learning,
            model,
        }
    }

    /// Reject snapshots from another layout or with unusable learned values
    pub fn validate(&self) -> ReactorResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ReactorError::Persistence {
                reason: "snapshot version mismatch",
            });
        }
        if !self.pid.gains.is_finite() || !self.learning.best_gains.is_finite() {
            return Err(ReactorError::Persistence {
                reason: "snapshot gains are not finite",
            });
        }
        if !self.learning.q_table.is_finite() {
            return Err(ReactorError::Persistence {
                reason: "snapshot q-table is not finite",
            });
        }
        if !self.learning.source_weights.is_valid() {
            return Err(ReactorError::Persistence {
                reason: "snapshot source weights are invalid",
            });
        }
        Ok(())
    }
}

/// Storage collaborator
pub trait ParameterStore {
    /// Store a snapshot, replacing the previous one
    fn save(&mut self, snapshot: &ParameterSnapshot) -> ReactorResult<()>;

    /// Most recently stored snapshot
    fn load(&mut self) -> ReactorResult<ParameterSnapshot>;
}

/// Single-slot store held in RAM
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Option<ParameterSnapshot>,
    saves: u32,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful saves so far
    pub fn save_count(&self) -> u32 {
        self.saves
    }

    /// Stored snapshot, if any
    pub fn snapshot(&self) -> Option<&ParameterSnapshot> {
        self.slot.as_ref()
    }
}

impl ParameterStore for MemoryStore {
    fn save(&mut self, snapshot: &ParameterSnapshot) -> ReactorResult<()> {
        self.slot = Some(*snapshot);
        self.saves = self.saves.saturating_add(1);
        Ok(())
    }

    fn load(&mut self) -> ReactorResult<ParameterSnapshot> {
        self.slot.ok_or(ReactorError::Persistence {
            reason: "no saved parameters",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LearningConfig, PidConfig};
    use crate::control::{PidController, PidGains};
    use crate::fusion::SourceWeights;
    use crate::learning::ReinforcementLearner;

    fn snapshot() -> ParameterSnapshot {
        let pid = PidController::new(PidConfig::default()).snapshot();
        let learning =
            ReinforcementLearner::new(LearningConfig::default(), PidGains::new(1.0, 0.1, 0.05)).snapshot();
        ParameterSnapshot::new(pid, learning, ReactorModel::default())
    }

    #[test]
    fn empty_store_reports_failure() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.load(), Err(ReactorError::Persistence { .. })));
    }

    #[test]
    fn store_keeps_last_snapshot() {
        let mut store = MemoryStore::new();
        let saved = snapshot();
        store.save(&saved).unwrap();
        assert_eq!(store.load(), Ok(saved));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn validation_rejects_bad_snapshots() {
        let mut stale = snapshot();
        stale.version = 0;
        assert!(stale.validate().is_err());

        let mut broken = snapshot();
        broken.pid.gains.kp = f32::NAN;
        assert!(broken.validate().is_err());

        assert!(snapshot().validate().is_ok());
    }

    #[test]
    fn validation_rejects_corrupt_learner_state() {
        let mut poisoned = snapshot();
        poisoned.learning.q_table.set(2, 3, f32::NAN).unwrap();
        assert_eq!(
            poisoned.validate(),
            Err(ReactorError::Persistence {
                reason: "snapshot q-table is not finite"
            })
        );

        let mut skewed = snapshot();
        skewed.learning.source_weights.physical = f32::INFINITY;
        assert!(skewed.validate().is_err());

        let mut negative = snapshot();
        negative.learning.source_weights.regression = -0.5;
        assert!(negative.validate().is_err());

        let mut empty = snapshot();
        empty.learning.source_weights = SourceWeights::from_array([0.0; 4]);
        assert_eq!(
            empty.validate(),
            Err(ReactorError::Persistence {
                reason: "snapshot source weights are invalid"
            })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_json_round_trip() {
        let saved = snapshot();
        let json = serde_json::to_string(&saved).unwrap();
        let loaded: ParameterSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, saved);
    }
}
