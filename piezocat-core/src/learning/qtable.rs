//! Tabular action values over pollutant buckets × output buckets

use crate::constants::learning::{ACTION_BUCKET_WIDTH, ACTION_COUNT, STATE_COUNT, STATE_THRESHOLDS};
use crate::errors::{ReactorError, ReactorResult};

/// Pollutant bucket: 0 below 100 ppm, 4 at 400 ppm and above
///
/// NaN lands in bucket 0.
pub fn discretize_state(pollutant: f32) -> usize {
    STATE_THRESHOLDS.iter().filter(|&&t| pollutant >= t).count()
}

/// Output bucket of width 10, clamped into the table
pub fn discretize_action(output: f32) -> usize {
    // `as` saturates: NaN and negatives become 0
    let bucket = libm::floorf(output / ACTION_BUCKET_WIDTH) as usize;
    bucket.min(ACTION_COUNT - 1)
}

/// Q(s, a) for the fixed 5 × 10 space
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QTable {
    values: [[f32; ACTION_COUNT]; STATE_COUNT],
}

impl Default for QTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QTable {
    /// All-zero table
    pub const fn new() -> Self {
        Self {
            values: [[0.0; ACTION_COUNT]; STATE_COUNT],
        }
    }

    fn check(state: usize, action: usize) -> ReactorResult<()> {
        if state >= STATE_COUNT {
            return Err(ReactorError::StateOutOfRange { index: state });
        }
        if action >= ACTION_COUNT {
            return Err(ReactorError::ActionOutOfRange { index: action });
        }
        Ok(())
    }

    /// Q(state, action)
    pub fn get(&self, state: usize, action: usize) -> ReactorResult<f32> {
        Self::check(state, action)?;
        Ok(self.values[state][action])
    }

    /// Out-of-range indices are rejected and leave the table untouched
    pub fn set(&mut self, state: usize, action: usize, value: f32) -> ReactorResult<()> {
        Self::check(state, action)?;
        self.values[state][action] = value;
        Ok(())
    }

    /// All action values of one state
    pub fn row(&self, state: usize) -> ReactorResult<&[f32; ACTION_COUNT]> {
        self.values
            .get(state)
            .ok_or(ReactorError::StateOutOfRange { index: state })
    }

    /// Greedy action; the first one wins ties
    pub fn best_action(&self, state: usize) -> ReactorResult<usize> {
        let row = self.row(state)?;
        let mut best = 0;
        for (a, &q) in row.iter().enumerate().skip(1) {
            if q > row[best] {
                best = a;
            }
        }
        Ok(best)
    }

    /// Largest value in the row, never below 0
    pub fn max_value(&self, state: usize) -> ReactorResult<f32> {
        let row = self.row(state)?;
        Ok(row.iter().fold(0.0_f32, |acc, &q| if q > acc { q } else { acc }))
    }

    /// Every value, row by row
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().flat_map(|row| row.iter().copied())
    }

    /// True when no entry is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.iter().all(f32::is_finite)
    }

    /// Zero every entry
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_buckets() {
        assert_eq!(discretize_state(0.0), 0);
        assert_eq!(discretize_state(99.9), 0);
        assert_eq!(discretize_state(100.0), 1);
        assert_eq!(discretize_state(250.0), 2);
        assert_eq!(discretize_state(399.0), 3);
        assert_eq!(discretize_state(1e6), 4);
        assert_eq!(discretize_state(f32::NAN), 0);
    }

    #[test]
    fn action_buckets() {
        assert_eq!(discretize_action(0.0), 0);
        assert_eq!(discretize_action(9.99), 0);
        assert_eq!(discretize_action(45.0), 4);
        assert_eq!(discretize_action(100.0), 9);
        assert_eq!(discretize_action(-5.0), 0);
        assert_eq!(discretize_action(f32::NAN), 0);
    }

    #[test]
    fn checked_access() {
        let mut table = QTable::new();
        assert!(table.set(2, 3, 0.7).is_ok());
        assert_eq!(table.get(2, 3), Ok(0.7));

        assert_eq!(
            table.set(5, 0, 1.0),
            Err(ReactorError::StateOutOfRange { index: 5 })
        );
        assert_eq!(
            table.get(0, 10),
            Err(ReactorError::ActionOutOfRange { index: 10 })
        );
        assert_eq!(table.iter().filter(|&q| q != 0.0).count(), 1);
    }

    #[test]
    fn row_access_reports_the_state_index() {
        let table = QTable::new();
        assert_eq!(table.row(7), Err(ReactorError::StateOutOfRange { index: 7 }));
        assert_eq!(
            table.best_action(STATE_COUNT),
            Err(ReactorError::StateOutOfRange { index: STATE_COUNT })
        );
        assert_eq!(
            table.max_value(5),
            Err(ReactorError::StateOutOfRange { index: 5 })
        );
    }

    #[test]
    fn finiteness_covers_every_entry() {
        let mut table = QTable::new();
        assert!(table.is_finite());
        table.set(4, 9, f32::INFINITY).unwrap();
        assert!(!table.is_finite());
    }

    #[test]
    fn greedy_ties_keep_first() {
        let mut table = QTable::new();
        assert_eq!(table.best_action(1), Ok(0));

        table.set(1, 4, 0.5).unwrap();
        table.set(1, 7, 0.5).unwrap();
        assert_eq!(table.best_action(1), Ok(4));
        assert_eq!(table.max_value(1), Ok(0.5));
    }

    #[test]
    fn max_value_floors_at_zero() {
        let mut table = QTable::new();
        for a in 0..ACTION_COUNT {
            table.set(3, a, -1.0).unwrap();
        }
        assert_eq!(table.max_value(3), Ok(0.0));
        assert_eq!(table.best_action(3), Ok(0));
    }
}
