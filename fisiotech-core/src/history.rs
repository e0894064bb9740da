//! Rolling history of classification results
//!
//! Two parallel sequences of the last [`HISTORY_CAPACITY`] successful
//! classifications: the sample intensity and the model confidence. Both are
//! pushed together by [`HistoryBuffer::record`] so entry `i` of one always
//! belongs to entry `i` of the other.
//!
//! Readers never see the live buffer. [`HistoryBuffer::snapshot`] copies both
//! sequences into a [`HistorySnapshot`] that is stored inline and can be
//! handed to another thread.

use crate::buffer::CircularBuffer;

/// Number of results kept per sequence
pub const HISTORY_CAPACITY: usize = 50;

/// Bounded intensity and confidence history
#[derive(Clone, Debug, Default)]
pub struct HistoryBuffer {
    intensity: CircularBuffer<f64, HISTORY_CAPACITY>,
    confidence: CircularBuffer<f64, HISTORY_CAPACITY>,
}

impl HistoryBuffer {
    /// Empty history
    pub const fn new() -> Self {
        Self {
            intensity: CircularBuffer::new(),
            confidence: CircularBuffer::new(),
        }
    }

    /// Record one successful classification
    pub fn record(&mut self, intensity: f64, confidence: f64) {
        self.intensity.push(intensity);
        self.confidence.push(confidence);
    }

    /// Number of intensity entries
    pub fn len(&self) -> usize {
        self.intensity.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.intensity.is_empty() && self.confidence.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.intensity.clear();
        self.confidence.clear();
    }

    /// Copy both sequences, oldest first
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            intensity: self.intensity.iter().copied().collect(),
            confidence: self.confidence.iter().copied().collect(),
        }
    }
}

/// Point-in-time copy of a [`HistoryBuffer`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistorySnapshot {
    /// Intensity values, oldest first
    pub intensity: heapless::Vec<f64, HISTORY_CAPACITY>,
    /// Confidence values, oldest first
    pub confidence: heapless::Vec<f64, HISTORY_CAPACITY>,
}

impl HistorySnapshot {
    /// Number of intensity entries
    pub fn len(&self) -> usize {
        self.intensity.len()
    }

    /// Whether the snapshot holds no intensity entries
    pub fn is_empty(&self) -> bool {
        self.intensity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn record_keeps_sequences_aligned() {
        let mut history = HistoryBuffer::new();
        history.record(0.4, 0.9);
        history.record(0.5, 0.8);

        let snap = history.snapshot();
        assert_eq!(&snap.intensity[..], &[0.4, 0.5]);
        assert_eq!(&snap.confidence[..], &[0.9, 0.8]);
    }

    #[test]
    fn fifty_first_insert_evicts_first() {
        let mut history = HistoryBuffer::new();
        for i in 0..=HISTORY_CAPACITY {
            history.record(i as f64, 0.5);
        }

        let snap = history.snapshot();
        assert_eq!(snap.len(), HISTORY_CAPACITY);
        assert_eq!(snap.intensity[0], 1.0);
        assert_eq!(snap.intensity[HISTORY_CAPACITY - 1], HISTORY_CAPACITY as f64);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let mut history = HistoryBuffer::new();
        history.record(1.0, 1.0);
        let first = history.snapshot();
        let second = history.snapshot();
        assert_eq!(first, second);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn sequences_stay_paired_across_eviction() {
        let mut history = HistoryBuffer::new();
        for i in 0..(HISTORY_CAPACITY + 7) {
            history.record(i as f64, i as f64 / 100.0);
        }
        let snap = history.snapshot();
        assert_eq!(snap.intensity.len(), snap.confidence.len());
        for (intensity, confidence) in snap.intensity.iter().zip(&snap.confidence) {
            assert_eq!(*confidence, *intensity / 100.0);
        }
        assert_eq!(snap.intensity[0], 7.0);
    }

    proptest! {
        #[test]
        fn bounded_and_ordered(values in proptest::collection::vec(-10.0f64..10.0, 0..200)) {
            let mut history = HistoryBuffer::new();
            for &v in &values {
                history.record(v, 0.5);
                prop_assert!(history.len() <= HISTORY_CAPACITY);
            }

            let start = values.len().saturating_sub(HISTORY_CAPACITY);
            let snap = history.snapshot();
            prop_assert_eq!(&snap.intensity[..], &values[start..]);
        }
    }
}
