//! Per-frame scene description and the renderer boundary

use serde::{Deserialize, Serialize};

use crate::{Point, Polyline, Rect, Rgba};

/// Perceptual band that dominated the onset a flash was born from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DominantBand {
    Bass,   // Drums, bass guitar
    Mid,    // Horns, vocals, guitars
    Treble, // Keys, cymbals, strings
}

impl DominantBand {
    pub fn name(&self) -> &'static str {
        match self {
            DominantBand::Bass => "bass",
            DominantBand::Mid => "mid",
            DominantBand::Treble => "treble",
        }
    }
}

/// One lightning bolt ready to be stroked
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoltStroke {
    /// Canvas position every polyline is relative to
    pub origin: Point,
    pub polylines: Vec<Polyline>,
    pub color: Rgba,
    pub band: DominantBand,
    /// Opacity of the core stroke (fade x intensity)
    pub alpha: f32,
    pub line_width: f32,
    /// Second, wider pass drawn over the same path
    pub glow_width: f32,
    pub glow_alpha: f32,
    pub shadow_blur: f32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient (0-1)
    pub offset: f32,
    pub color: Rgba,
}

/// Radial ambient glow behind everything else
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BackgroundGlow {
    pub center: Point,
    pub radius: f32,
    pub stops: Vec<GradientStop>,
}

/// Halo drawn around the subject while a bright flash is nearby
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SubjectGlow {
    pub color: Rgba,
    pub blur: f32,
}

/// How the subject image should be lit this frame
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SubjectLighting {
    pub bounds: Rect,
    /// Smoothed illumination (0-1); 0 means the subject is invisible
    pub brightness: f32,
    /// Alpha of the black overlay painted over the subject's own pixels
    pub darkness: f32,
    /// CSS-style contrast percentage (100-180)
    pub contrast: f32,
    pub glow: Option<SubjectGlow>,
}

/// Low fog band along the bottom edge
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Atmosphere {
    pub height: f32,
    pub color: Rgba,
}

/// Everything needed to paint one frame, back to front
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Scene {
    pub frame: u64,
    pub canvas: Rect,
    pub background: Option<BackgroundGlow>,
    pub bolts: Vec<BoltStroke>,
    pub subject: SubjectLighting,
    pub atmosphere: Atmosphere,
}

/// Implemented by whatever paints scenes (canvas, GPU, file sink...)
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene);
}
