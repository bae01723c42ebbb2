//! Per-frame aging of flashes and the ambient background glow.

use super::flash::FlashSet;

/// Ambient multiplier applied every frame
pub const AMBIENT_DECAY: f32 = 0.95;

/// Ceiling of the ambient level
pub const MAX_AMBIENT: f32 = 0.6;

/// Overall energy that maps to full ambient before the ceiling applies
const AMBIENT_DIVISOR: f32 = 400.0;

/// Slow background glow, independent of individual flashes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AmbientLight {
    level: f32,
}

impl AmbientLight {
    pub fn new() -> Self {
        Self { level: 0.0 }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Follow the overall loudness of the current frame
    pub fn set_from_energy(&mut self, overall: f32) {
        self.level = (overall / AMBIENT_DIVISOR).clamp(0.0, MAX_AMBIENT);
    }

    pub fn decay(&mut self) {
        self.level *= AMBIENT_DECAY;
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

/// End-of-frame bookkeeping: age every flash, drop the expired, dim the ambient
pub fn end_frame(flashes: &mut FlashSet, ambient: &mut AmbientLight) {
    flashes.age_all();
    ambient.decay();
}
