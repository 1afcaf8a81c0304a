//! Box-corner collision against a walkability map.
//!
//! A body is a square of side `size` centred on its position. Only the four
//! corners are sampled, so a blocked cell narrower than the box can slip
//! between corners; bodies are always smaller than a tile, which keeps that
//! case out of reach.

use crate::Aabb;
use glam::Vec2;
use wayfarer_core::{Body, Walkability};

/// Probe size for line-of-sight samples.
const RAY_PROBE_SIZE: f32 = 0.1;
/// Line-of-sight samples per world unit.
const RAY_SAMPLES_PER_UNIT: f32 = 10.0;

/// How a proposed move was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The full move was free.
    Full,
    /// Only the X component was applied.
    SlideX,
    /// Only the Y component was applied.
    SlideY,
    /// Nothing could be applied.
    Blocked,
}

/// Collision queries over anything that answers walkability.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver<'w, W: Walkability + ?Sized> {
    world: &'w W,
}

impl<'w, W: Walkability + ?Sized> CollisionResolver<'w, W> {
    /// Resolver backed by `world`.
    pub fn new(world: &'w W) -> Self {
        Self { world }
    }

    /// True if any corner of the box of side `size` at `position` is not walkable.
    pub fn is_blocked(&self, position: Vec2, size: f32) -> bool {
        Aabb::from_center_size(position, size)
            .corners()
            .iter()
            .any(|&corner| !self.world.is_walkable(corner))
    }

    /// Position `body` may move to when it wants to reach `proposed`.
    ///
    /// Tries the full move, then X alone, then Y alone; falls back to the
    /// current position. This is what makes bodies slide along walls.
    pub fn resolve(&self, body: &Body, proposed: Vec2) -> Vec2 {
        self.resolve_with(body, proposed).0
    }

    /// [`resolve`](Self::resolve) plus which candidate won.
    ///
    /// Every candidate other than [`Resolution::Blocked`] is returned only
    /// after `is_blocked` rejected it, so a body that moves always lands on a
    /// valid position. `Blocked` returns the start position untouched, even
    /// if the world has since changed under it.
    pub fn resolve_with(&self, body: &Body, proposed: Vec2) -> (Vec2, Resolution) {
        if !self.is_blocked(proposed, body.size) {
            return (proposed, Resolution::Full);
        }

        let x_only = Vec2::new(proposed.x, body.position.y);
        if !self.is_blocked(x_only, body.size) {
            return (x_only, Resolution::SlideX);
        }

        let y_only = Vec2::new(body.position.x, proposed.y);
        if !self.is_blocked(y_only, body.size) {
            return (y_only, Resolution::SlideY);
        }

        (body.position, Resolution::Blocked)
    }

    /// True if anything blocks the straight line from `from` to `to`.
    ///
    /// Samples `ceil(distance * 10)` evenly spaced points, both ends included.
    pub fn raycast_blocked(&self, from: Vec2, to: Vec2) -> bool {
        let distance = from.distance(to);
        let steps = (distance * RAY_SAMPLES_PER_UNIT).ceil() as u32;
        if steps == 0 {
            return self.is_blocked(from, RAY_PROBE_SIZE);
        }
        (0..=steps).any(|i| {
            let t = i as f32 / steps as f32;
            self.is_blocked(from.lerp(to, t), RAY_PROBE_SIZE)
        })
    }

    /// True if a body of side `size` fits at `position`.
    pub fn is_position_valid(&self, position: Vec2, size: f32) -> bool {
        !self.is_blocked(position, size)
    }
}

/// Circle overlap on the mean of both sizes.
pub fn entities_overlap(a: &Body, b: &Body) -> bool {
    a.position.distance(b.position) < (a.size + b.size) * 0.5
}

/// Items whose body lies within `radius` of `center`, in input order.
pub fn entities_in_radius<'a, T, I, F>(items: I, center: Vec2, radius: f32, body_of: F) -> Vec<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &Body,
    T: 'a,
{
    items
        .into_iter()
        .filter(|item| body_of(item).position.distance(center) <= radius)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::WalkableFn;

    /// Open plane with a wall filling the cells where y >= 5.
    fn wall_north() -> WalkableFn<impl Fn(Vec2) -> bool> {
        WalkableFn(|p: Vec2| p.y < 5.0)
    }

    #[test]
    fn corners_decide_blocking() {
        let world = wall_north();
        let resolver = CollisionResolver::new(&world);
        assert!(!resolver.is_blocked(Vec2::new(0.0, 4.5), 0.8));
        assert!(resolver.is_blocked(Vec2::new(0.0, 4.7), 0.8));
    }

    #[test]
    fn diagonal_into_wall_slides_along_x() {
        let world = wall_north();
        let resolver = CollisionResolver::new(&world);
        let body = Body::new(Vec2::new(0.0, 4.5), 0.8);
        let (pos, how) = resolver.resolve_with(&body, Vec2::new(0.3, 4.8));
        assert_eq!(how, Resolution::SlideX);
        assert_eq!(pos, Vec2::new(0.3, 4.5));
    }

    #[test]
    fn falls_back_to_y_then_stays() {
        let east_wall = WalkableFn(|p: Vec2| p.x < 1.0);
        let resolver = CollisionResolver::new(&east_wall);
        let body = Body::new(Vec2::new(0.5, 0.0), 0.8);
        let (pos, how) = resolver.resolve_with(&body, Vec2::new(0.8, 1.0));
        assert_eq!(how, Resolution::SlideY);
        assert_eq!(pos, Vec2::new(0.5, 1.0));

        let nothing = WalkableFn(|_: Vec2| false);
        let resolver = CollisionResolver::new(&nothing);
        assert_eq!(
            resolver.resolve_with(&body, Vec2::new(1.0, 1.0)),
            (body.position, Resolution::Blocked)
        );
    }

    #[test]
    fn free_move_is_taken_whole() {
        let open = WalkableFn(|_: Vec2| true);
        let resolver = CollisionResolver::new(&open);
        let body = Body::new(Vec2::ZERO, 0.8);
        assert_eq!(resolver.resolve(&body, Vec2::new(3.0, -2.0)), Vec2::new(3.0, -2.0));
    }

    #[test]
    fn raycast_hits_thin_wall() {
        let pillar = WalkableFn(|p: Vec2| !(2.0..2.2).contains(&p.x));
        let resolver = CollisionResolver::new(&pillar);
        assert!(resolver.raycast_blocked(Vec2::ZERO, Vec2::new(4.0, 0.0)));
        assert!(!resolver.raycast_blocked(Vec2::ZERO, Vec2::new(0.0, 4.0)));
    }

    #[test]
    fn zero_length_ray_checks_origin() {
        let west_open = WalkableFn(|p: Vec2| p.x < 0.0);
        let resolver = CollisionResolver::new(&west_open);
        assert!(!resolver.raycast_blocked(Vec2::new(-1.0, 0.0), Vec2::new(-1.0, 0.0)));
        assert!(resolver.raycast_blocked(Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn overlap_uses_mean_size() {
        let a = Body::new(Vec2::ZERO, 0.8);
        let b = Body::new(Vec2::new(0.85, 0.0), 1.0);
        let c = Body::new(Vec2::new(0.95, 0.0), 1.0);
        assert!(entities_overlap(&a, &b));
        assert!(!entities_overlap(&a, &c));
    }

    #[test]
    fn radius_query_keeps_input_order() {
        let bodies = [
            Body::new(Vec2::new(3.0, 0.0), 1.0),
            Body::new(Vec2::new(0.5, 0.0), 1.0),
            Body::new(Vec2::new(1.0, 1.0), 1.0),
        ];
        let near = entities_in_radius(&bodies, Vec2::ZERO, 1.5, |b| b);
        assert_eq!(near.len(), 2);
        assert_eq!(near[0].position, Vec2::new(0.5, 0.0));
    }
}
