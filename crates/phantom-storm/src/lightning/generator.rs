//! Procedural lightning generation.
//!
//! A strike spawns up to eight bolts. Everything about a bolt (where it
//! appears, how long it lives, its branch geometry and color) is drawn from
//! the profile of the band that dominated the onset:
//! - Bass: low on screen, long-lived, few wide branches, dark colors
//! - Treble: high on screen, short-lived, many thin jagged branches, bright colors
//! - Mid: in between, violet shades

use phantom_storm_api::{DominantBand, Point, Polyline, Rect, Rgba};
use rand::Rng;

use super::flash::{BandRatios, LightningFlash};
use crate::audio::BandEnergies;

/// Maximum bolts per strike
pub const MAX_BOLTS: usize = 8;

/// Minimum downward distance per branch step
const MIN_VERTICAL_STEP: f32 = 10.0;

/// Palette entry: base color and the lowest alpha it may be drawn with
#[derive(Clone, Copy, Debug)]
struct Swatch {
    color: Rgba,
    min_alpha: f32,
}

const fn swatch(r: u8, g: u8, b: u8, min_alpha: f32) -> Swatch {
    Swatch {
        color: Rgba::rgb(r, g, b),
        min_alpha,
    }
}

/// Band-specific generation parameters
#[derive(Debug)]
struct BoltProfile {
    /// Vertical band as (start, span) fractions of canvas height
    y_start: f32,
    y_span: f32,
    /// Divides overall + dominant level into intensity
    intensity_divisor: f32,
    /// Lifetime in frames (inclusive)
    lifetime: (u32, u32),
    /// Polylines per bolt (inclusive)
    branches: (usize, usize),
    /// Points per polyline (inclusive)
    points: (usize, usize),
    /// Full width of the horizontal jitter per step
    spread: f32,
    /// Maximum random part of each downward step
    vertical_step: f32,
    palette: [Swatch; 4],
}

const BASS_PROFILE: BoltProfile = BoltProfile {
    y_start: 0.4,
    y_span: 0.3,
    intensity_divisor: 400.0,
    lifetime: (20, 35),
    branches: (2, 4),
    points: (12, 19),
    spread: 60.0,
    vertical_step: 35.0,
    palette: [
        swatch(75, 0, 130, 0.8),   // Deep purple
        swatch(139, 0, 0, 0.8),    // Dark red
        swatch(25, 25, 112, 0.8),  // Midnight blue
        swatch(72, 61, 139, 0.8),  // Dark slate blue
    ],
};

const TREBLE_PROFILE: BoltProfile = BoltProfile {
    y_start: 0.0,
    y_span: 0.4,
    intensity_divisor: 350.0,
    lifetime: (8, 16),
    branches: (4, 8),
    points: (6, 13),
    spread: 25.0,
    vertical_step: 15.0,
    palette: [
        swatch(255, 255, 255, 0.9), // Bright white
        swatch(135, 206, 250, 0.8), // Light sky blue
        swatch(0, 255, 255, 0.8),   // Electric cyan
        swatch(173, 216, 230, 0.8), // Light blue
    ],
};

const MID_PROFILE: BoltProfile = BoltProfile {
    y_start: 0.2,
    y_span: 0.4,
    intensity_divisor: 380.0,
    lifetime: (15, 25),
    branches: (3, 6),
    points: (8, 17),
    spread: 40.0,
    vertical_step: 25.0,
    palette: [
        swatch(138, 43, 226, 0.8),  // Blue violet
        swatch(147, 0, 211, 0.8),   // Dark violet
        swatch(123, 104, 238, 0.8), // Medium slate blue
        swatch(106, 90, 205, 0.8),  // Slate blue
    ],
};

fn profile(band: DominantBand) -> &'static BoltProfile {
    match band {
        DominantBand::Bass => &BASS_PROFILE,
        DominantBand::Treble => &TREBLE_PROFILE,
        DominantBand::Mid => &MID_PROFILE,
    }
}

/// Bolts for a strike: louder bands contribute more, capped at [`MAX_BOLTS`]
pub fn bolt_count(energies: &BandEnergies) -> usize {
    let bass = (energies.bass / 255.0 * 2.0).ceil().max(0.0);
    let mid = (energies.mid / 255.0 * 1.5).ceil().max(0.0);
    let treble = (energies.treble / 255.0 * 2.0).ceil().max(0.0);
    ((bass + mid + treble) as usize).min(MAX_BOLTS)
}

/// Random-walk branches shaped by the band profile
pub fn generate_branches<R: Rng + ?Sized>(rng: &mut R, band: DominantBand) -> Vec<Polyline> {
    let p = profile(band);
    let count = rng.random_range(p.branches.0..=p.branches.1);

    (0..count)
        .map(|_| {
            let points = rng.random_range(p.points.0..=p.points.1);
            let mut line = Vec::with_capacity(points);
            let mut x = 0.0;
            let mut y = 0.0;
            for _ in 0..points {
                line.push(Point::new(x, y));
                x += (rng.random::<f32>() - 0.5) * p.spread;
                y += rng.random::<f32>() * p.vertical_step + MIN_VERTICAL_STEP;
            }
            line
        })
        .collect()
}

/// Pick a palette color for the band with a randomized alpha
pub fn lightning_color<R: Rng + ?Sized>(rng: &mut R, band: DominantBand) -> Rgba {
    let palette = &profile(band).palette;
    let swatch = palette[rng.random_range(0..palette.len())];
    let alpha = swatch.min_alpha + rng.random::<f32>() * (1.0 - swatch.min_alpha);
    swatch.color.with_alpha(alpha)
}

/// Turns detected peaks into flashes and numbers them in creation order
#[derive(Clone, Debug, Default)]
pub struct FlashGenerator {
    next_id: u64,
}

impl FlashGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate the bolts of one strike inside `canvas`.
    ///
    /// Returns nothing when all three bands are silent.
    pub fn strike<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        energies: &BandEnergies,
        canvas: Rect,
    ) -> Vec<LightningFlash> {
        let Some(ratios) = BandRatios::from_energies(energies) else {
            return Vec::new();
        };
        let band = ratios.dominant();
        let p = profile(band);
        let dominant_level = match band {
            DominantBand::Bass => energies.bass,
            DominantBand::Mid => energies.mid,
            DominantBand::Treble => energies.treble,
        };
        let intensity = ((energies.overall + dominant_level) / p.intensity_divisor).clamp(0.0, 1.0);

        (0..bolt_count(energies))
            .map(|_| {
                let y = canvas.y + canvas.h * (p.y_start + rng.random::<f32>() * p.y_span);
                let max_age = rng.random_range(p.lifetime.0..=p.lifetime.1);
                let x = canvas.x + rng.random::<f32>() * canvas.w;
                let branches = generate_branches(rng, band);
                let color = lightning_color(rng, band);

                let id = self.next_id;
                self.next_id += 1;

                LightningFlash {
                    id,
                    position: Point::new(x, y),
                    intensity,
                    age: 0,
                    max_age,
                    branches,
                    color,
                    band,
                }
            })
            .collect()
    }

    /// Restart numbering
    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    const CANVAS: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 1200.0,
        h: 800.0,
    };

    /// Every draw lands on the low end of its range
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn energies(bass: f32, mid: f32, treble: f32) -> BandEnergies {
        BandEnergies {
            bass,
            mid,
            treble,
            overall: (bass + mid + treble) / 3.0,
        }
    }

    #[test]
    fn test_bolt_count() {
        assert_eq!(bolt_count(&energies(0.0, 0.0, 0.0)), 0);
        assert_eq!(bolt_count(&energies(10.0, 0.0, 0.0)), 1);
        // ceil(2) + ceil(1.5) + ceil(2) = 2 + 2 + 2
        assert_eq!(bolt_count(&energies(255.0, 255.0, 255.0)), 6);
        assert_eq!(bolt_count(&energies(200.0, 100.0, 50.0)), 5);
    }

    #[test]
    fn test_silence_spawns_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut generator = FlashGenerator::new();
        assert!(generator
            .strike(&mut rng, &BandEnergies::default(), CANVAS)
            .is_empty());
    }

    #[test]
    fn test_bass_strike_properties() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut generator = FlashGenerator::new();
        let e = energies(150.0, 30.0, 20.0);

        let flashes = generator.strike(&mut rng, &e, CANVAS);
        assert_eq!(flashes.len(), bolt_count(&e));

        let expected_intensity = ((e.overall + e.bass) / 400.0).min(1.0);
        for flash in &flashes {
            assert_eq!(flash.band, DominantBand::Bass);
            assert!((flash.intensity - expected_intensity).abs() < 1e-6);
            assert!((20..=35).contains(&flash.max_age));
            assert!(flash.position.y >= 320.0 && flash.position.y <= 560.0);
            assert!(flash.position.x >= 0.0 && flash.position.x <= 1200.0);
            assert!((2..=4).contains(&flash.branches.len()));
            assert!(flash.color.a >= 0.8 && flash.color.a <= 1.0);
        }
    }

    #[test]
    fn test_treble_strike_properties() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut generator = FlashGenerator::new();
        let flashes = generator.strike(&mut rng, &energies(20.0, 30.0, 120.0), CANVAS);

        assert!(!flashes.is_empty());
        for flash in &flashes {
            assert_eq!(flash.band, DominantBand::Treble);
            assert!((8..=16).contains(&flash.max_age));
            assert!(flash.position.y <= 320.0);
            assert!((4..=8).contains(&flash.branches.len()));
        }
    }

    #[test]
    fn test_intensity_is_capped() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut generator = FlashGenerator::new();
        let flashes = generator.strike(&mut rng, &energies(0.0, 0.0, 255.0), CANVAS);
        assert!(flashes.iter().all(|f| f.intensity == (255.0 / 3.0 + 255.0) / 350.0));

        let loud = BandEnergies {
            bass: 255.0,
            mid: 10.0,
            treble: 10.0,
            overall: 400.0,
        };
        let flashes = generator.strike(&mut rng, &loud, CANVAS);
        assert!(flashes.iter().all(|f| f.intensity == 1.0));
    }

    #[test]
    fn test_branches_walk_downwards() {
        let mut rng = StdRng::seed_from_u64(42);
        for band in [DominantBand::Bass, DominantBand::Mid, DominantBand::Treble] {
            let p = profile(band);
            for line in generate_branches(&mut rng, band) {
                assert!(line.len() >= p.points.0 && line.len() <= p.points.1);
                assert_eq!(line[0], Point::ORIGIN);
                for pair in line.windows(2) {
                    let dy = pair[1].y - pair[0].y;
                    let dx = (pair[1].x - pair[0].x).abs();
                    assert!(dy >= MIN_VERTICAL_STEP - 1e-3);
                    assert!(dy <= MIN_VERTICAL_STEP + p.vertical_step + 1e-3);
                    assert!(dx <= p.spread / 2.0 + 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_colors_come_from_band_palette() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let color = lightning_color(&mut rng, DominantBand::Mid);
            assert!(MID_PROFILE
                .palette
                .iter()
                .any(|s| (s.color.r, s.color.g, s.color.b) == (color.r, color.g, color.b)));

            let white = lightning_color(&mut rng, DominantBand::Treble);
            if (white.r, white.g, white.b) == (255, 255, 255) {
                assert!(white.a >= 0.9);
            }
        }
    }

    #[test]
    fn test_same_seed_same_strike() {
        let e = energies(90.0, 60.0, 40.0);
        let a = FlashGenerator::new().strike(&mut StdRng::seed_from_u64(99), &e, CANVAS);
        let b = FlashGenerator::new().strike(&mut StdRng::seed_from_u64(99), &e, CANVAS);
        assert_eq!(a, b);
    }

    #[test]
    fn test_strike_with_lowest_draws() {
        let e = energies(150.0, 30.0, 20.0);
        let flashes = FlashGenerator::new().strike(&mut ZeroRng, &e, CANVAS);

        // ceil(1.18) + ceil(0.18) + ceil(0.16)
        assert_eq!(flashes.len(), 4);
        let walk: Vec<Point> = (0..12)
            .map(|i| Point::new(-30.0 * i as f32, 10.0 * i as f32))
            .collect();
        for (i, flash) in flashes.iter().enumerate() {
            assert_eq!(flash.id, i as u64);
            assert_eq!(flash.band, DominantBand::Bass);
            assert_eq!(flash.max_age, 20);
            assert_eq!(flash.age, 0);
            assert_eq!(flash.position.x, 0.0);
            assert!((flash.position.y - 320.0).abs() < 1e-3);
            assert!((flash.intensity - (200.0 / 3.0 + 150.0) / 400.0).abs() < 1e-6);
            assert_eq!(flash.color, Rgba::rgba(75, 0, 130, 0.8));
            assert_eq!(flash.branches.len(), 2);
            assert_eq!(flash.branches[0], walk);
            assert_eq!(flash.branches[1], walk);
        }
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut generator = FlashGenerator::new();
        let e = energies(255.0, 255.0, 255.0);
        let mut ids: Vec<u64> = generator.strike(&mut rng, &e, CANVAS).iter().map(|f| f.id).collect();
        ids.extend(generator.strike(&mut rng, &e, CANVAS).iter().map(|f| f.id));
        assert_eq!(ids, (0..12).collect::<Vec<_>>());

        generator.reset();
        assert_eq!(generator.strike(&mut rng, &e, CANVAS)[0].id, 0);
    }
}
