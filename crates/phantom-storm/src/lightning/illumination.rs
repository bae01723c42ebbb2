//! How much the live flashes light up the subject.
//!
//! Each flash lights the subject in proportion to how close it strikes, how
//! bright it is and how much of its life remains. The strongest flash wins and
//! its color tints the subject glow. The result is smoothed slowly so the
//! subject breathes with the storm instead of flickering.

use phantom_storm_api::{Point, Rect, Rgba};

use super::flash::FlashSet;

/// Fraction of the gap to the target closed each frame (~25 frame time constant)
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.04;

/// Flashes further than this from the subject center do not light it
pub const DEFAULT_MAX_DISTANCE: f32 = 400.0;

/// Share of the canvas the subject may occupy in either direction
const PORTRAIT_FILL: f32 = 0.95;

/// Illumination for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Illumination {
    /// Smoothed brightness of the subject (0-1)
    pub smoothed: f32,
    /// Unsmoothed strongest contribution this frame
    pub max_illumination: f32,
    /// Color of the flash behind `max_illumination` (white when none)
    pub tint: Rgba,
}

impl Default for Illumination {
    fn default() -> Self {
        Self {
            smoothed: 0.0,
            max_illumination: 0.0,
            tint: Rgba::WHITE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IlluminationCompositor {
    smoothed: f32,
    smoothing_factor: f32,
    max_distance: f32,
}

impl IlluminationCompositor {
    pub fn new(smoothing_factor: f32, max_distance: f32) -> Self {
        Self {
            smoothed: 0.0,
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
            max_distance: max_distance.max(f32::EPSILON),
        }
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Strongest single-flash contribution at `center`, with its color
    pub fn peak(&self, flashes: &FlashSet, center: Point) -> (f32, Rgba) {
        let mut max_illumination = 0.0;
        let mut tint = Rgba::WHITE;

        for flash in flashes.iter() {
            let distance = flash.position.distance(center);
            if distance >= self.max_distance {
                continue;
            }
            let proximity = 1.0 - distance / self.max_distance;
            let illumination = proximity * flash.intensity * flash.fade();
            if illumination > max_illumination {
                max_illumination = illumination;
                tint = flash.color.with_alpha(1.0);
            }
        }

        (max_illumination, tint)
    }

    /// Move the smoothed value toward `target` (clamped to 0-1)
    pub fn step(&mut self, target: f32) -> f32 {
        let target = target.clamp(0.0, 1.0);
        self.smoothed += (target - self.smoothed) * self.smoothing_factor;
        self.smoothed
    }

    /// Light the subject occupying `subject` with the live flashes
    pub fn composite(&mut self, flashes: &FlashSet, subject: Rect) -> Illumination {
        let (max_illumination, tint) = self.peak(flashes, subject.center());
        let smoothed = self.step(max_illumination);
        Illumination {
            smoothed,
            max_illumination,
            tint,
        }
    }

    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}

impl Default for IlluminationCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_FACTOR, DEFAULT_MAX_DISTANCE)
    }
}

/// Place a portrait of the given aspect (width / height) on the canvas:
/// 95% of the canvas height, narrowed to fit 95% of the width, centered
/// horizontally and resting on the bottom edge.
pub fn portrait_bounds(canvas: Rect, image_aspect: f32) -> Rect {
    let aspect = if image_aspect.is_finite() && image_aspect > 0.0 {
        image_aspect
    } else {
        1.0
    };

    let mut h = canvas.h * PORTRAIT_FILL;
    let mut w = h * aspect;
    let max_w = canvas.w * PORTRAIT_FILL;
    if w > max_w {
        w = max_w;
        h = w / aspect;
    }

    Rect::new(
        canvas.x + (canvas.w - w) / 2.0,
        canvas.y + canvas.h - h,
        w,
        h,
    )
}
