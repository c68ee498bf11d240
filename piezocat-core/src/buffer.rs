//! Fixed-capacity rolling window
//!
//! Every history the core keeps is a bounded sliding window: the per-channel
//! stability windows in the fusion engine, the forecaster's pollutant,
//! efficiency and energy histories, and the learner's reward record. All of
//! them want the same behaviour, so they share this ring:
//!
//! - capacity fixed at compile time through a const generic, no allocation
//! - pushing into a full window overwrites the oldest element
//! - logical indexing in chronological order, with `latest(k)` counting
//!   back from the newest element
//!
//! ```text
//! CircularBuffer<f32, 4> after pushing 1..=6:
//!
//! physical  [5, 6, 3, 4]   write_pos = 2
//! logical   [3, 4, 5, 6]   get(0) = 3, latest(0) = 6, latest(1) = 5
//! ```
//!
//! ```rust
//! use piezocat_core::buffer::CircularBuffer;
//!
//! let mut window: CircularBuffer<f32, 3> = CircularBuffer::new();
//! for v in [10.0, 20.0, 30.0, 40.0] {
//!     window.push(v);
//! }
//! assert_eq!(window.len(), 3);
//! assert_eq!(window.latest(0), Some(40.0));
//! assert_eq!(window.get(0), Some(20.0));
//! assert_eq!(window.mean(), Some(30.0));
//! ```

/// Fixed-size ring of `Copy` values, oldest overwritten first
///
/// Invariants: `write_pos < N` and `len <= N`.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T: Copy, const N: usize> {
    // Option instead of MaybeUninit keeps the crate free of unsafe
    data: [Option<T>; N],
    write_pos: usize,
    len: usize,
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Empty buffer
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Append a value, overwriting the oldest one when full
    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        self.data[self.write_pos] = Some(value);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.len
    }

    /// True before the first push
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `N` values have been pushed
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Fixed capacity `N`
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Most recent value
    pub fn last(&self) -> Option<T> {
        self.latest(0)
    }

    /// Value by chronological index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }

        // Until the ring fills up the oldest element sits at slot 0
        let slot = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[slot]
    }

    /// Value counted back from the newest (0 = newest)
    pub fn latest(&self, back: usize) -> Option<T> {
        if back >= self.len {
            return None;
        }
        self.get(self.len - 1 - back)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            buffer: self,
            index: 0,
        }
    }

    /// Drop every value and rewind
    pub fn clear(&mut self) {
        self.data = [None; N];
        self.write_pos = 0;
        self.len = 0;
    }
}

impl<const N: usize> CircularBuffer<f32, N> {
    /// Arithmetic mean, `None` when empty
    pub fn mean(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let sum: f32 = self.iter().sum();
        Some(sum / self.len as f32)
    }

    /// Population variance, `None` when empty
    pub fn variance(&self) -> Option<f32> {
        let mean = self.mean()?;
        let sum_sq: f32 = self.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some(sum_sq / self.len as f32)
    }
}

impl<T: Copy, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Chronological iterator over a [`CircularBuffer`]
pub struct Iter<'a, T: Copy, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    index: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.buffer.len().saturating_sub(self.index);
        (left, Some(left))
    }
}
