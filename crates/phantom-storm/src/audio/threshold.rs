//! Adaptive trigger threshold.
//!
//! The threshold follows recent loudness so a loud passage does not fire on
//! every frame, but is capped at twice the base so sustained energy can
//! never push it out of reach.

/// Base minimum threshold before sensitivity scaling
pub const DEFAULT_MIN_THRESHOLD: f32 = 100.0;

/// Default user sensitivity in percent
pub const DEFAULT_SENSITIVITY: u32 = 100;

/// Headroom above the recent average
const RECENT_HEADROOM: f32 = 1.15;

/// Ceiling as a multiple of the base threshold
const MAX_BASE_MULTIPLE: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdEngine {
    min_threshold: f32,
    sensitivity: u32,
}

impl ThresholdEngine {
    pub fn new(min_threshold: f32, sensitivity: u32) -> Self {
        Self {
            min_threshold: min_threshold.max(0.0),
            sensitivity,
        }
    }

    pub fn sensitivity(&self) -> u32 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, percent: u32) {
        self.sensitivity = percent;
    }

    /// Minimum threshold scaled by sensitivity
    pub fn base_threshold(&self) -> f32 {
        self.min_threshold * self.sensitivity as f32 / 100.0
    }

    /// Threshold given the recent overall average
    pub fn dynamic_threshold(&self, recent_average: f32) -> f32 {
        let base = self.base_threshold();
        (recent_average * RECENT_HEADROOM)
            .max(base)
            .min(base * MAX_BASE_MULTIPLE)
    }
}

impl Default for ThresholdEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_THRESHOLD, DEFAULT_SENSITIVITY)
    }
}
