//! Canvas geometry
//!
//! Coordinates are logical canvas pixels with the origin at the top-left
//! corner and y growing downwards.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Connected points, each relative to the owning bolt's origin
pub type Polyline = Vec<Point>;

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_w_h(w: f32, h: f32) -> Self {
        Self { x: 0.0, y: 0.0, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges_and_center() {
        let r = Rect::new(100.0, 50.0, 200.0, 400.0);
        assert_eq!(r.right(), 300.0);
        assert_eq!(r.bottom(), 450.0);
        assert_eq!(r.center(), Point::new(200.0, 250.0));
    }

    #[test]
    fn test_distance() {
        assert_eq!(Point::ORIGIN.distance(Point::new(3.0, 4.0)), 5.0);
    }
}
