//! The storm engine: one value owning every piece of per-run state.
//!
//! The driver calls [`StormEngine::advance`] once per display frame with
//! whatever the spectrum source produced. Each call runs, in order:
//! 1. Band aggregation and onset detection (skipped without a snapshot)
//! 2. Lightning generation when the frame is a musical peak
//! 3. Subject illumination from the live flashes
//! 4. Scene description for the external painter
//! 5. Aging of flashes and ambient decay

use phantom_storm_api::{Rect, Scene};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::{
    is_musical_peak, Band, BandAggregator, BandEnergies, BandHistory, FrequencySnapshot,
    OnsetDetector, OnsetIncreases, ThresholdEngine,
};
use crate::lightning::{
    end_frame, portrait_bounds, AmbientLight, FlashGenerator, FlashSet, Illumination,
    IlluminationCompositor,
};
use crate::render::SceneBuilder;
use crate::utils::LightningConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// What the analysis stage saw this frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameAnalysis {
    pub energies: BandEnergies,
    pub increases: OnsetIncreases,
    /// Weighted average of overall values, this frame included
    pub recent_average: f32,
    /// Reported for tuning; peaks are decided by the band gates alone
    pub dynamic_threshold: f32,
    pub triggered: bool,
}

/// Everything one frame produced
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub frame: u64,
    /// `None` when no snapshot was available
    pub analysis: Option<FrameAnalysis>,
    /// Flashes created this frame
    pub spawned: usize,
    pub illumination: Illumination,
    /// Ambient level the scene was built with (before this frame's decay)
    pub ambient: f32,
    /// Live flashes the scene was built with (before this frame's aging)
    pub live_flashes: usize,
    pub scene: Scene,
}

pub struct StormEngine {
    rng: StdRng,
    aggregator: BandAggregator,
    detector: OnsetDetector,
    threshold: ThresholdEngine,
    generator: FlashGenerator,
    flashes: FlashSet,
    ambient: AmbientLight,
    compositor: IlluminationCompositor,
    scenes: SceneBuilder,
    state: PlayState,
    frame: u64,
}

impl StormEngine {
    /// Engine seeded from the config, or from the OS when no seed is set
    pub fn new(config: &LightningConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    /// Reproducible engine regardless of the config's seed
    pub fn with_seed(config: &LightningConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &LightningConfig, rng: StdRng) -> Self {
        let canvas = Rect::from_w_h(config.canvas_width(), config.canvas_height());
        let subject = portrait_bounds(canvas, config.subject_aspect());

        Self {
            rng,
            aggregator: BandAggregator::new(config.noise_floor()),
            detector: OnsetDetector::new(),
            threshold: ThresholdEngine::new(config.min_threshold(), config.sensitivity()),
            generator: FlashGenerator::new(),
            flashes: FlashSet::new(),
            ambient: AmbientLight::new(),
            compositor: IlluminationCompositor::new(
                config.smoothing_factor(),
                config.illumination_radius(),
            ),
            scenes: SceneBuilder::new(canvas, subject, config.device_pixel_ratio()),
            state: PlayState::Stopped,
            frame: 0,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn start(&mut self) {
        if self.state != PlayState::Playing {
            tracing::info!(frame = self.frame, "storm started");
            self.state = PlayState::Playing;
        }
    }

    /// Stop advancing; live flashes and histories are kept
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            tracing::info!(frame = self.frame, live = self.flashes.len(), "storm paused");
            self.state = PlayState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlayState::Paused {
            tracing::info!(frame = self.frame, "storm resumed");
            self.state = PlayState::Playing;
        }
    }

    /// Pause when playing, resume when paused, start when stopped
    pub fn toggle_pause(&mut self) {
        match self.state {
            PlayState::Playing => self.pause(),
            PlayState::Paused => self.resume(),
            PlayState::Stopped => self.start(),
        }
    }

    /// Clear all per-run state and stop
    pub fn reset(&mut self) {
        self.detector.reset();
        self.flashes.clear();
        self.ambient.reset();
        self.compositor.reset();
        self.generator.reset();
        self.frame = 0;
        self.state = PlayState::Stopped;
        tracing::info!("storm reset");
    }

    pub fn set_sensitivity(&mut self, percent: u32) {
        self.threshold.set_sensitivity(percent);
        tracing::debug!(percent, "sensitivity changed");
    }

    pub fn sensitivity(&self) -> u32 {
        self.threshold.sensitivity()
    }

    /// Place the subject explicitly instead of the default portrait layout
    pub fn set_subject(&mut self, bounds: Rect) {
        self.scenes = SceneBuilder::new(
            self.scenes.canvas(),
            bounds,
            self.scenes.device_pixel_ratio(),
        );
    }

    pub fn canvas(&self) -> Rect {
        self.scenes.canvas()
    }

    pub fn subject(&self) -> Rect {
        self.scenes.subject()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn flashes(&self) -> &FlashSet {
        &self.flashes
    }

    pub fn ambient(&self) -> f32 {
        self.ambient.level()
    }

    pub fn illumination(&self) -> f32 {
        self.compositor.smoothed()
    }

    pub fn history(&self, band: Band) -> &BandHistory {
        self.detector.history(band)
    }

    /// Run one frame. Returns `None` (and changes nothing) unless playing.
    pub fn advance(&mut self, snapshot: Option<&FrequencySnapshot>) -> Option<FrameReport> {
        if !self.is_playing() {
            return None;
        }

        let analysis = snapshot
            .filter(|s| !s.is_empty())
            .map(|s| self.analyze(s));

        let mut spawned = 0;
        if let Some(analysis) = &analysis {
            if analysis.triggered {
                let canvas = self.scenes.canvas();
                let strike = self
                    .generator
                    .strike(&mut self.rng, &analysis.energies, canvas);
                spawned = strike.len();
                if let Some(first) = strike.first() {
                    tracing::debug!(
                        frame = self.frame,
                        bolts = spawned,
                        band = first.band.name(),
                        intensity = first.intensity,
                        "lightning"
                    );
                }
                self.flashes.extend(strike);
            }
            self.ambient.set_from_energy(analysis.energies.overall);
        }

        let illumination = self
            .compositor
            .composite(&self.flashes, self.scenes.subject());
        let ambient = self.ambient.level();
        let live_flashes = self.flashes.len();
        let scene = self
            .scenes
            .build(self.frame, &self.flashes, ambient, &illumination);

        tracing::trace!(
            frame = self.frame,
            live = live_flashes,
            ambient,
            illumination = illumination.smoothed,
            "frame"
        );

        let report = FrameReport {
            frame: self.frame,
            analysis,
            spawned,
            illumination,
            ambient,
            live_flashes,
            scene,
        };

        end_frame(&mut self.flashes, &mut self.ambient);
        self.frame += 1;

        Some(report)
    }

    fn analyze(&mut self, snapshot: &FrequencySnapshot) -> FrameAnalysis {
        let energies = self.aggregator.aggregate(snapshot);
        let increases = self.detector.observe(&energies);
        let recent_average = self.detector.recent_average(Band::Overall);
        let dynamic_threshold = self.threshold.dynamic_threshold(recent_average);
        let triggered = is_musical_peak(&energies, &increases);

        FrameAnalysis {
            energies,
            increases,
            recent_average,
            dynamic_threshold,
            triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> StormEngine {
        StormEngine::with_seed(&LightningConfig::default(), 1)
    }

    fn snapshot(level: u8) -> FrequencySnapshot {
        FrequencySnapshot::new(vec![level; 128])
    }

    #[test]
    fn test_idle_engine_does_nothing() {
        let mut e = engine();
        assert_eq!(e.state(), PlayState::Stopped);
        assert!(e.advance(Some(&snapshot(200))).is_none());
        assert!(e.history(Band::Bass).is_empty());
        assert_eq!(e.frame(), 0);
    }

    #[test]
    fn test_no_trigger_during_warmup() {
        let mut e = engine();
        e.start();
        for _ in 0..3 {
            let report = e.advance(Some(&snapshot(200))).unwrap();
            assert!(!report.analysis.unwrap().triggered);
        }
        assert!(e.flashes().is_empty());
    }

    #[test]
    fn test_jump_triggers_lightning() {
        let mut e = engine();
        e.start();
        for _ in 0..3 {
            e.advance(Some(&snapshot(20)));
        }
        let report = e.advance(Some(&snapshot(180))).unwrap();
        let analysis = report.analysis.unwrap();
        assert!(analysis.triggered);
        assert!(report.spawned > 0);
        assert_eq!(report.scene.bolts.len(), report.live_flashes);
        assert!(!e.flashes().is_empty());
    }

    #[test]
    fn test_missing_snapshot_only_ages() {
        let mut e = engine();
        e.start();
        for _ in 0..3 {
            e.advance(Some(&snapshot(20)));
        }
        e.advance(Some(&snapshot(180)));
        let ages: Vec<u32> = e.flashes().iter().map(|f| f.age).collect();
        let history_len = e.history(Band::Overall).len();

        let report = e.advance(None).unwrap();
        assert!(report.analysis.is_none());
        assert_eq!(report.spawned, 0);
        assert_eq!(e.history(Band::Overall).len(), history_len);
        for (before, after) in ages.iter().zip(e.flashes().iter()) {
            assert_eq!(after.age, before + 1);
        }
    }

    #[test]
    fn test_dynamic_threshold_is_reported() {
        let mut e = engine();
        e.start();
        let report = e.advance(Some(&snapshot(0))).unwrap();
        let analysis = report.analysis.unwrap();
        assert_eq!(analysis.recent_average, 0.0);
        assert_eq!(analysis.dynamic_threshold, 100.0);

        e.set_sensitivity(50);
        let report = e.advance(Some(&snapshot(0))).unwrap();
        assert_eq!(report.analysis.unwrap().dynamic_threshold, 50.0);
    }

    #[test]
    fn test_recent_average_includes_current_frame() {
        let mut e = engine();
        e.start();
        let report = e.advance(Some(&snapshot(255))).unwrap();
        let analysis = report.analysis.unwrap();
        // 255 minus the noise floor in every region
        assert_eq!(analysis.energies.overall, 247.0);
        assert_eq!(analysis.recent_average, 247.0);
        assert_eq!(analysis.dynamic_threshold, 200.0);
    }

    #[test]
    fn test_toggle_pause_cycle() {
        let mut e = engine();
        e.toggle_pause();
        assert_eq!(e.state(), PlayState::Playing);
        e.toggle_pause();
        assert_eq!(e.state(), PlayState::Paused);
        e.toggle_pause();
        assert_eq!(e.state(), PlayState::Playing);
    }

    #[test]
    fn test_set_subject_moves_lighting() {
        let mut e = engine();
        let bounds = Rect::new(10.0, 10.0, 50.0, 50.0);
        e.set_subject(bounds);
        e.start();
        let report = e.advance(None).unwrap();
        assert_eq!(report.scene.subject.bounds, bounds);
    }
}
