//! Band aggregation.
//!
//! Reduces a byte spectrum to three perceptual bands. The spectrum is cut
//! into six contiguous regions, each region is noise-gated and averaged, and
//! the regions are blended with weights that favour horns and keys over a
//! plain equal split.

use super::spectrum::{FrequencySnapshot, REFERENCE_BINS};

/// Number of raw spectral regions
pub const NUM_REGIONS: usize = 6;

/// Default level subtracted from every bin before averaging
pub const DEFAULT_NOISE_FLOOR: f32 = 8.0;

/// Region edges for a 128-bin snapshot (fft size 256 at 44.1kHz)
/// Kick/bass, bass guitar/low brass, horns/vocals, trumpets/piano,
/// high piano/cymbals, harmonics/air
const REFERENCE_EDGES: [usize; NUM_REGIONS + 1] = [0, 8, 20, 40, 70, 100, 128];

/// Per-frame band levels, roughly 0-255
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
}

/// Bin ranges for each region, derived from the snapshot length
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandLayout {
    bins: usize,
    regions: [(usize, usize); NUM_REGIONS],
}

impl BandLayout {
    /// Scale the reference edges to `bins` bins
    pub fn for_bins(bins: usize) -> Self {
        let edge = |i: usize| REFERENCE_EDGES[i] * bins / REFERENCE_BINS;
        let mut regions = [(0usize, 0usize); NUM_REGIONS];
        for (i, region) in regions.iter_mut().enumerate() {
            *region = (edge(i), edge(i + 1));
        }
        Self { bins, regions }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn regions(&self) -> &[(usize, usize); NUM_REGIONS] {
        &self.regions
    }
}

impl Default for BandLayout {
    fn default() -> Self {
        Self::for_bins(REFERENCE_BINS)
    }
}

/// Stateless reducer from snapshot to [`BandEnergies`]
#[derive(Clone, Debug)]
pub struct BandAggregator {
    noise_floor: f32,
    layout: BandLayout,
}

impl BandAggregator {
    pub fn new(noise_floor: f32) -> Self {
        Self {
            noise_floor: noise_floor.max(0.0),
            layout: BandLayout::default(),
        }
    }

    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    pub fn aggregate(&self, snapshot: &FrequencySnapshot) -> BandEnergies {
        let bins = snapshot.as_slice();
        let layout = if bins.len() == self.layout.bins() {
            self.layout
        } else {
            BandLayout::for_bins(bins.len())
        };

        let mut avg = [0.0f32; NUM_REGIONS];
        for (i, &(low, high)) in layout.regions().iter().enumerate() {
            avg[i] = gated_average(&bins[low..high], self.noise_floor);
        }
        let [bass_sub, low_mid, mid_sub, high_mid, treble_sub, air] = avg;

        let bass = (bass_sub * 2.0 + low_mid) / 3.0; // Drums and bass
        let mid = (mid_sub * 3.0 + high_mid * 2.0) / 5.0; // Horns and brass
        let treble = (high_mid + treble_sub * 3.0 + air) / 5.0; // High piano and strings
        let overall = (bass + mid + treble) / 3.0;

        BandEnergies {
            bass,
            mid,
            treble,
            overall,
        }
    }
}

impl Default for BandAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_FLOOR)
    }
}

/// Mean of the region after subtracting the noise floor (negatives become 0)
fn gated_average(region: &[u8], noise_floor: f32) -> f32 {
    if region.is_empty() {
        return 0.0;
    }
    let sum: f32 = region
        .iter()
        .map(|&v| (v as f32 - noise_floor).max(0.0))
        .sum();
    sum / region.len() as f32
}
