//! Peak decision.
//!
//! A single global threshold under-detects horns and keys relative to drums,
//! so each band gets its own pair of (increase, level) gates, plus softer
//! gates for gentle entries and a loud-passage fallback. The gates overlap
//! on purpose.

use super::bands::BandEnergies;
use super::onset::OnsetIncreases;

/// Whether this frame is a musical peak worth a lightning strike
pub fn is_musical_peak(energies: &BandEnergies, increases: &OnsetIncreases) -> bool {
    let BandEnergies {
        bass,
        mid,
        treble,
        overall,
    } = *energies;

    (increases.bass > 8.0 && bass > 25.0) // Bass drum hits
        || (increases.mid > 4.0 && mid > 15.0) // Horn sections and brass
        || (increases.treble > 5.0 && treble > 12.0) // High piano and strings
        || (increases.overall > 6.0 && overall > 25.0) // General musical peaks
        || (increases.mid > 2.0 && mid > 20.0) // Gentle horn entries
        || (increases.treble > 3.0 && treble > 18.0) // Gentle keyboard entries
        || (overall > 30.0
            && (increases.bass > 3.0 || increases.mid > 2.0 || increases.treble > 3.0))
}
