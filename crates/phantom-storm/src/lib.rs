//! Audio-reactive lightning.
//!
//! Listens to a spectrum frame by frame, picks out musical peaks band by band
//! and answers them with procedurally generated lightning whose shape, color
//! and lifetime follow the band that hit. The live flashes light up a subject
//! image, and every frame is summarised as a [`Scene`](phantom_storm_api::Scene)
//! for an external painter.

pub mod audio;
pub mod engine;
pub mod error;
pub mod lightning;
pub mod render;
pub mod utils;

pub use engine::{FrameAnalysis, FrameReport, PlayState, StormEngine};
pub use error::{Result, StormError};
