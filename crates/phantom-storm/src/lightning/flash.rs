//! Lightning flashes and the bounded live set that holds them.

use std::collections::VecDeque;

use phantom_storm_api::{DominantBand, Point, Polyline, Rgba};

use crate::audio::BandEnergies;

/// Maximum number of flashes alive at once
pub const MAX_LIVE_FLASHES: usize = 25;

/// Bass share above which a strike counts as bass-dominant
const BASS_DOMINANCE: f32 = 0.5;
/// Treble share above which a strike counts as treble-dominant
const TREBLE_DOMINANCE: f32 = 0.4;

/// Share of each band in bass + mid + treble
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandRatios {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl BandRatios {
    /// `None` when there is no energy to split (avoids NaN ratios)
    pub fn from_energies(energies: &BandEnergies) -> Option<Self> {
        let total = energies.bass + energies.mid + energies.treble;
        if !(total.is_finite() && total > 0.0) {
            return None;
        }
        Some(Self {
            bass: energies.bass / total,
            mid: energies.mid / total,
            treble: energies.treble / total,
        })
    }

    /// Bass wins outright above half; treble needs only 40%; mid otherwise
    pub fn dominant(&self) -> DominantBand {
        if self.bass > BASS_DOMINANCE {
            DominantBand::Bass
        } else if self.treble > TREBLE_DOMINANCE {
            DominantBand::Treble
        } else {
            DominantBand::Mid
        }
    }
}

/// One lightning strike. Only `age` changes after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct LightningFlash {
    /// Insertion sequence number, unique within an engine run
    pub id: u64,
    pub position: Point,
    /// Brightness (0-1)
    pub intensity: f32,
    /// Frames lived so far
    pub age: u32,
    /// Lifetime in frames
    pub max_age: u32,
    /// Random-walk polylines relative to `position`
    pub branches: Vec<Polyline>,
    pub color: Rgba,
    pub band: DominantBand,
}

impl LightningFlash {
    pub fn is_alive(&self) -> bool {
        self.age < self.max_age
    }

    /// Remaining life (1 when new, approaching 0 at expiry)
    pub fn fade(&self) -> f32 {
        if self.max_age == 0 {
            return 0.0;
        }
        (1.0 - self.age as f32 / self.max_age as f32).max(0.0)
    }
}

/// Live flashes in insertion order, oldest first
#[derive(Clone, Debug, Default)]
pub struct FlashSet {
    flashes: VecDeque<LightningFlash>,
}

impl FlashSet {
    pub fn new() -> Self {
        Self {
            flashes: VecDeque::with_capacity(MAX_LIVE_FLASHES),
        }
    }

    /// Add new flashes, dropping the oldest past [`MAX_LIVE_FLASHES`]
    pub fn extend(&mut self, flashes: impl IntoIterator<Item = LightningFlash>) {
        for flash in flashes {
            debug_assert!(flash.max_age > 0, "flash lifetime must be positive");
            self.flashes.push_back(flash);
        }
        while self.flashes.len() > MAX_LIVE_FLASHES {
            self.flashes.pop_front();
        }
    }

    /// Advance every flash one frame and drop the expired ones
    pub fn age_all(&mut self) {
        for flash in &mut self.flashes {
            flash.age += 1;
        }
        self.flashes.retain(LightningFlash::is_alive);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LightningFlash> {
        self.flashes.iter()
    }

    pub fn len(&self) -> usize {
        self.flashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.flashes.clear();
    }
}
