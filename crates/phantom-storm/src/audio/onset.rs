//! Onset detection from short per-band histories.
//!
//! Each band keeps the last few frames of energy. An onset is measured as the
//! larger of two jumps:
//! 1. Immediate: current value minus the previous frame (sudden transients)
//! 2. Gradual: current value minus the mean of the previous three frames
//!    (swelling entries such as a horn crescendo)

use std::collections::VecDeque;

use super::bands::BandEnergies;

/// Frames of history kept per band
pub const HISTORY_CAPACITY: usize = 10;

/// Prior frames needed before an increase is reported
const MIN_PRIOR_SAMPLES: usize = 3;

/// Frames used by the gradual-increase mean
const GRADUAL_WINDOW: usize = 3;

/// Frames used by the weighted recent average
const RECENT_WINDOW: usize = 8;

/// Baseline reported before any data has arrived (mid-range guess)
pub const DEFAULT_RECENT_AVERAGE: f32 = 50.0;

/// Bands tracked by the detector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Bass,
    Mid,
    Treble,
    Overall,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Bass, Band::Mid, Band::Treble, Band::Overall];

    fn index(self) -> usize {
        match self {
            Band::Bass => 0,
            Band::Mid => 1,
            Band::Treble => 2,
            Band::Overall => 3,
        }
    }
}

/// Bounded FIFO of recent band values, oldest first
#[derive(Clone, Debug, Default)]
pub struct BandHistory {
    values: VecDeque<f32>,
}

impl BandHistory {
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Append a value, evicting the oldest past capacity
    pub fn push(&mut self, value: f32) {
        self.values.push_back(value);
        while self.values.len() > HISTORY_CAPACITY {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f32> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// The last `n` values, oldest first
    fn tail(&self, n: usize) -> impl Iterator<Item = &f32> {
        self.values.iter().skip(self.values.len().saturating_sub(n))
    }

    /// How far `current` jumps above this history (0 with too little data)
    fn increase(&self, current: f32) -> f32 {
        let Some(previous) = self.last() else {
            return 0.0;
        };
        if self.len() < MIN_PRIOR_SAMPLES {
            return 0.0;
        }

        let window_mean = self.tail(GRADUAL_WINDOW).sum::<f32>() / GRADUAL_WINDOW as f32;
        let immediate = current - previous;
        let gradual = current - window_mean;
        immediate.max(gradual)
    }

    /// Weighted mean of the last 8 values, most recent weighted highest
    fn weighted_recent_average(&self) -> f32 {
        if self.is_empty() {
            return DEFAULT_RECENT_AVERAGE;
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for (i, &value) in self.tail(RECENT_WINDOW).enumerate() {
            let weight = (i + 1) as f32;
            weighted_sum += value * weight;
            total_weight += weight;
        }
        weighted_sum / total_weight
    }
}

/// Per-band increases for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OnsetIncreases {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
}

/// Owns the band histories and measures increases against them
#[derive(Clone, Debug)]
pub struct OnsetDetector {
    histories: [BandHistory; 4],
}

impl OnsetDetector {
    pub fn new() -> Self {
        Self {
            histories: [
                BandHistory::new(),
                BandHistory::new(),
                BandHistory::new(),
                BandHistory::new(),
            ],
        }
    }

    /// Measure `current` against the band's prior frames, then record it
    pub fn detect_increase(&mut self, band: Band, current: f32) -> f32 {
        let history = &mut self.histories[band.index()];
        let increase = history.increase(current);
        history.push(current);
        increase
    }

    /// Run all four bands for one frame
    pub fn observe(&mut self, energies: &BandEnergies) -> OnsetIncreases {
        OnsetIncreases {
            bass: self.detect_increase(Band::Bass, energies.bass),
            mid: self.detect_increase(Band::Mid, energies.mid),
            treble: self.detect_increase(Band::Treble, energies.treble),
            overall: self.detect_increase(Band::Overall, energies.overall),
        }
    }

    /// Recency-weighted average of the band (50 before any data)
    pub fn recent_average(&self, band: Band) -> f32 {
        self.histories[band.index()].weighted_recent_average()
    }

    pub fn history(&self, band: Band) -> &BandHistory {
        &self.histories[band.index()]
    }

    pub fn reset(&mut self) {
        for history in &mut self.histories {
            history.clear();
        }
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_increase_until_three_prior_frames() {
        let mut detector = OnsetDetector::new();
        assert_eq!(detector.detect_increase(Band::Bass, 10.0), 0.0);
        assert_eq!(detector.detect_increase(Band::Bass, 50.0), 0.0);
        assert_eq!(detector.detect_increase(Band::Bass, 90.0), 0.0);
        assert!(detector.detect_increase(Band::Bass, 200.0) > 0.0);
    }

    #[test]
    fn test_flat_history_jump() {
        let mut detector = OnsetDetector::new();
        for _ in 0..3 {
            detector.detect_increase(Band::Mid, 10.0);
        }
        assert_eq!(detector.detect_increase(Band::Mid, 20.0), 10.0);
    }

    #[test]
    fn test_gradual_swell_beats_immediate() {
        let mut detector = OnsetDetector::new();
        for value in [10.0, 20.0, 30.0] {
            detector.detect_increase(Band::Treble, value);
        }
        // immediate = 35 - 30 = 5, gradual = 35 - 20 = 15
        assert_eq!(detector.detect_increase(Band::Treble, 35.0), 15.0);
    }

    #[test]
    fn test_drop_reports_negative_increase() {
        let mut detector = OnsetDetector::new();
        for value in [40.0, 40.0, 40.0] {
            detector.detect_increase(Band::Overall, value);
        }
        assert!(detector.detect_increase(Band::Overall, 10.0) < 0.0);
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut detector = OnsetDetector::new();
        for i in 0..15 {
            detector.detect_increase(Band::Bass, i as f32);
        }
        let history: Vec<f32> = detector.history(Band::Bass).iter().copied().collect();
        assert_eq!(history, (5..15).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_bands_are_independent() {
        let mut detector = OnsetDetector::new();
        detector.detect_increase(Band::Bass, 1.0);
        assert_eq!(detector.history(Band::Bass).len(), 1);
        assert!(detector.history(Band::Mid).is_empty());
    }

    #[test]
    fn test_recent_average_defaults_to_fifty() {
        let detector = OnsetDetector::new();
        assert_eq!(detector.recent_average(Band::Overall), DEFAULT_RECENT_AVERAGE);
    }

    #[test]
    fn test_recent_average_weights_recent_frames() {
        let mut detector = OnsetDetector::new();
        detector.detect_increase(Band::Overall, 10.0);
        detector.detect_increase(Band::Overall, 40.0);
        // (10*1 + 40*2) / 3
        assert!((detector.recent_average(Band::Overall) - 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_recent_average_uses_last_eight() {
        let mut detector = OnsetDetector::new();
        detector.detect_increase(Band::Overall, 1000.0);
        detector.detect_increase(Band::Overall, 1000.0);
        for _ in 0..8 {
            detector.detect_increase(Band::Overall, 20.0);
        }
        assert!((detector.recent_average(Band::Overall) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_reset_clears_every_band() {
        let mut detector = OnsetDetector::new();
        detector.observe(&BandEnergies {
            bass: 1.0,
            mid: 2.0,
            treble: 3.0,
            overall: 2.0,
        });
        detector.reset();
        for band in Band::ALL {
            assert!(detector.history(band).is_empty());
        }
    }

    proptest! {
        #[test]
        fn prop_history_is_bounded(values in proptest::collection::vec(0.0f32..255.0, 0..64)) {
            let mut detector = OnsetDetector::new();
            for value in &values {
                detector.detect_increase(Band::Treble, *value);
                prop_assert!(detector.history(Band::Treble).len() <= HISTORY_CAPACITY);
            }
            let kept: Vec<f32> = detector.history(Band::Treble).iter().copied().collect();
            let start = values.len().saturating_sub(HISTORY_CAPACITY);
            prop_assert_eq!(kept, values[start..].to_vec());
        }
    }
}
