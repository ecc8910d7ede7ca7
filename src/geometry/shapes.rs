//! Collision shapes

use serde::{Deserialize, Serialize};

use super::Vector2;

/// Axis-aligned box in world space (y grows downward, so `top < bottom`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Aabb {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Box from its top-left corner and size
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Box centered on `center`
    pub fn from_center(center: Vector2, width: f64, height: f64) -> Self {
        Self::from_xywh(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn translate(&self, offset: Vector2) -> Self {
        Self::new(
            self.left + offset.x,
            self.top + offset.y,
            self.right + offset.x,
            self.bottom + offset.y,
        )
    }

    /// Non-inverted: left ≤ right and top ≤ bottom
    pub fn is_well_formed(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    /// The four edges, clockwise from the top edge
    pub fn edges(&self) -> [Segment; 4] {
        let tl = Vector2::new(self.left, self.top);
        let tr = Vector2::new(self.right, self.top);
        let br = Vector2::new(self.right, self.bottom);
        let bl = Vector2::new(self.left, self.bottom);
        [
            Segment::new(tl, tr),
            Segment::new(tr, br),
            Segment::new(br, bl),
            Segment::new(bl, tl),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vector2,
    pub radius: f64,
}

impl Circle {
    pub const fn new(center: Vector2, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vector2,
    pub end: Vector2,
}

impl Segment {
    pub const fn new(start: Vector2, end: Vector2) -> Self {
        Self { start, end }
    }
}

/// Anything with a world-space bounding box and a reference position
pub trait Bounded {
    fn bounds(&self) -> Aabb;
    fn position(&self) -> Vector2;
}

/// A moving circle with mass, used by the bounce and de-penetration solvers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleBody {
    pub position: Vector2,
    pub velocity: Vector2,
    pub radius: f64,
    pub mass: f64,
    /// Restitution coefficient in [0, 1]
    pub bounce: f64,
}

impl CircleBody {
    pub fn new(position: Vector2, velocity: Vector2, radius: f64, mass: f64, bounce: f64) -> Self {
        Self {
            position,
            velocity,
            radius,
            mass,
            bounce,
        }
    }
}
