#![warn(missing_docs)]
//! Tile-grid physics: bounding boxes, collision resolution and movement.

mod collision;
mod movement;

use glam::Vec2;

pub use collision::*;
pub use movement::*;

/// Axis-aligned bounding box on the tile plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y).
    pub min: Vec2,
    /// Maximum corner (x, y).
    pub max: Vec2,
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y);
        Self { min, max }
    }

    /// Square box of side `size` centred on `center`.
    pub fn from_center_size(center: Vec2, size: f32) -> Self {
        let half = Vec2::splat(size.max(0.0) * 0.5);
        Self::new(center - half, center + half)
    }

    /// Corners in the order (min, min), (max, min), (min, max), (max, max).
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            Vec2::new(self.min.x, self.max.y),
            self.max,
        ]
    }

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}
