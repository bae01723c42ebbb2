//! Render-facing types for phantom-storm
//!
//! Everything the engine hands to an external painter lives here: colors,
//! canvas geometry and the per-frame scene description. Painting itself is
//! the job of a [`SceneRenderer`] implementation outside the engine.

pub mod color;
pub mod geometry;
pub mod scene;

pub use color::Rgba;
pub use geometry::{Point, Polyline, Rect};
pub use scene::{
    Atmosphere, BackgroundGlow, BoltStroke, DominantBand, GradientStop, Scene, SceneRenderer,
    SubjectGlow, SubjectLighting,
};
