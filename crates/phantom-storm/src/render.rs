//! Turn engine state into a paintable [`Scene`].
//!
//! Nothing here draws; it only decides stroke widths, alphas, gradients and
//! the subject's lighting so that any [`SceneRenderer`](phantom_storm_api::SceneRenderer)
//! can paint the frame with plain canvas primitives.

use phantom_storm_api::{
    Atmosphere, BackgroundGlow, BoltStroke, DominantBand, GradientStop, Rect, Rgba, Scene,
    SubjectGlow, SubjectLighting,
};

use crate::lightning::{FlashSet, Illumination, LightningFlash};

/// Ambient level below which no background glow is drawn
const AMBIENT_VISIBLE: f32 = 0.05;
/// Max illumination needed before the subject gets a halo
const GLOW_THRESHOLD: f32 = 0.2;
const FOG_HEIGHT: f32 = 200.0;
const FOG_COLOR: Rgba = Rgba::rgba(70, 70, 70, 0.1);

/// Stroke sizes for one band: `base + per_intensity * intensity`
struct StrokeStyle {
    line: (f32, f32),
    glow: (f32, f32),
    shadow_blur: f32,
    glow_alpha: f32,
}

fn stroke_style(band: DominantBand) -> StrokeStyle {
    match band {
        // Thick, heavy strokes
        DominantBand::Bass => StrokeStyle {
            line: (3.0, 5.0),
            glow: (10.0, 12.0),
            shadow_blur: 25.0,
            glow_alpha: 0.4,
        },
        // Thin, sharp strokes
        DominantBand::Treble => StrokeStyle {
            line: (1.0, 2.0),
            glow: (4.0, 6.0),
            shadow_blur: 10.0,
            glow_alpha: 0.3,
        },
        DominantBand::Mid => StrokeStyle {
            line: (2.0, 3.0),
            glow: (6.0, 8.0),
            shadow_blur: 15.0,
            glow_alpha: 0.3,
        },
    }
}

/// Builds scenes for a fixed canvas and subject placement
#[derive(Clone, Debug)]
pub struct SceneBuilder {
    canvas: Rect,
    subject: Rect,
    device_pixel_ratio: f32,
}

impl SceneBuilder {
    pub fn new(canvas: Rect, subject: Rect, device_pixel_ratio: f32) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            canvas,
            subject,
            device_pixel_ratio,
        }
    }

    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    pub fn subject(&self) -> Rect {
        self.subject
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn bolt(&self, flash: &LightningFlash) -> BoltStroke {
        let style = stroke_style(flash.band);
        let alpha = flash.fade() * flash.intensity;
        let scale = 1.0 / self.device_pixel_ratio;

        BoltStroke {
            origin: flash.position,
            polylines: flash.branches.clone(),
            color: flash.color,
            band: flash.band,
            alpha,
            line_width: (style.line.0 + flash.intensity * style.line.1) * scale,
            glow_width: (style.glow.0 + flash.intensity * style.glow.1) * scale,
            glow_alpha: alpha * style.glow_alpha,
            shadow_blur: style.shadow_blur * scale,
        }
    }

    /// Radial glow from the canvas center, `None` while the ambient is too dim
    pub fn background(&self, ambient: f32) -> Option<BackgroundGlow> {
        if ambient <= AMBIENT_VISIBLE {
            return None;
        }
        Some(BackgroundGlow {
            center: self.canvas.center(),
            radius: self.canvas.w / 2.0,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: Rgba::rgba(75, 0, 130, ambient * 0.3),
                },
                GradientStop {
                    offset: 0.7,
                    color: Rgba::rgba(25, 25, 112, ambient * 0.15),
                },
                GradientStop {
                    offset: 1.0,
                    color: Rgba::TRANSPARENT,
                },
            ],
        })
    }

    pub fn subject_lighting(&self, illumination: &Illumination, has_flashes: bool) -> SubjectLighting {
        let brightness = illumination.smoothed.clamp(0.0, 1.0);
        let peak = illumination.max_illumination;

        let glow = (has_flashes && peak > GLOW_THRESHOLD).then(|| SubjectGlow {
            color: illumination.tint.with_alpha(peak * 0.7),
            blur: 25.0 * peak,
        });

        SubjectLighting {
            bounds: self.subject,
            brightness,
            darkness: 1.0 - brightness,
            contrast: (100.0 + brightness * 80.0).min(180.0),
            glow,
        }
    }

    pub fn atmosphere(&self) -> Atmosphere {
        Atmosphere {
            height: FOG_HEIGHT.min(self.canvas.h),
            color: FOG_COLOR,
        }
    }

    /// Full scene for one frame, back to front
    pub fn build(
        &self,
        frame: u64,
        flashes: &FlashSet,
        ambient: f32,
        illumination: &Illumination,
    ) -> Scene {
        Scene {
            frame,
            canvas: self.canvas,
            background: self.background(ambient),
            bolts: flashes.iter().map(|f| self.bolt(f)).collect(),
            subject: self.subject_lighting(illumination, !flashes.is_empty()),
            atmosphere: self.atmosphere(),
        }
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        let canvas = Rect::from_w_h(1200.0, 800.0);
        Self::new(canvas, canvas, 1.0)
    }
}
