//! Lightning flashes: generation, aging and the light they cast.

pub mod flash;
pub mod generator;
pub mod illumination;
pub mod lifecycle;

pub use flash::{BandRatios, FlashSet, LightningFlash, MAX_LIVE_FLASHES};
pub use generator::{bolt_count, generate_branches, lightning_color, FlashGenerator, MAX_BOLTS};
pub use illumination::{
    portrait_bounds, Illumination, IlluminationCompositor, DEFAULT_MAX_DISTANCE,
    DEFAULT_SMOOTHING_FACTOR,
};
pub use lifecycle::{end_frame, AmbientLight, AMBIENT_DECAY, MAX_AMBIENT};
