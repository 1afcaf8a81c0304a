//! Velocity integration with collision.

use crate::collision::{CollisionResolver, Resolution};
use glam::Vec2;
use tracing::debug;
use wayfarer_core::{Body, Walkability};

/// Distance under which `move_towards` counts the target as reached.
pub const ARRIVAL_DISTANCE: f32 = 0.1;
/// Velocity components below this snap to zero under friction.
const REST_THRESHOLD: f32 = 0.01;

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    /// Position before the step.
    pub from: Vec2,
    /// Position after the step.
    pub to: Vec2,
    /// How the proposed move was resolved; `None` for a stationary body.
    pub resolution: Option<Resolution>,
}

impl MoveOutcome {
    fn stationary(position: Vec2) -> Self {
        Self {
            from: position,
            to: position,
            resolution: None,
        }
    }

    /// True if the body's position changed.
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Stateless integrator for [`Body`] kinematics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementIntegrator;

impl MovementIntegrator {
    /// Advance `body` by `velocity * dt`, resolved against `resolver`.
    ///
    /// `dt` must already be capped by the caller. Rotation follows the
    /// velocity whenever the body is moving, even if the move was blocked.
    /// The body only ever moves onto a position that is not blocked; when
    /// every candidate is blocked it stays where it is.
    pub fn integrate<W: Walkability + ?Sized>(
        &self,
        body: &mut Body,
        dt: f32,
        resolver: &CollisionResolver<'_, W>,
    ) -> MoveOutcome {
        if body.is_stationary() {
            return MoveOutcome::stationary(body.position);
        }

        let from = body.position;
        let proposed = from + body.velocity * dt;
        let (to, resolution) = resolver.resolve_with(body, proposed);
        if resolution == Resolution::Blocked {
            debug!(?from, ?proposed, "Move blocked");
        }
        body.position = to;
        body.rotation = body.velocity.y.atan2(body.velocity.x);
        MoveOutcome {
            from,
            to,
            resolution: Some(resolution),
        }
    }

    /// Set velocity to `speed` along `direction`; a zero direction stops the body.
    pub fn set_velocity_from_direction(&self, body: &mut Body, direction: Vec2, speed: f32) {
        body.velocity = direction.normalize_or_zero() * speed;
    }

    /// Steer toward `target` and integrate one step.
    ///
    /// Returns true (and stops the body) once it is within
    /// [`ARRIVAL_DISTANCE`] of the target.
    pub fn move_towards<W: Walkability + ?Sized>(
        &self,
        body: &mut Body,
        target: Vec2,
        speed: f32,
        dt: f32,
        resolver: &CollisionResolver<'_, W>,
    ) -> bool {
        if body.position.distance(target) < ARRIVAL_DISTANCE {
            self.stop(body);
            return true;
        }
        self.set_velocity_from_direction(body, target - body.position, speed);
        self.integrate(body, dt, resolver);
        false
    }

    /// Zero the velocity.
    pub fn stop(&self, body: &mut Body) {
        body.velocity = Vec2::ZERO;
    }

    /// Add `force * dt` to the velocity (unit mass).
    pub fn apply_force(&self, body: &mut Body, force: Vec2, dt: f32) {
        body.velocity += force * dt;
    }

    /// Damp velocity by `max(0, 1 - friction * dt)`, snapping near-zero components.
    pub fn apply_friction(&self, body: &mut Body, friction: f32, dt: f32) {
        body.velocity *= (1.0 - friction * dt).max(0.0);
        if body.velocity.x.abs() < REST_THRESHOLD {
            body.velocity.x = 0.0;
        }
        if body.velocity.y.abs() < REST_THRESHOLD {
            body.velocity.y = 0.0;
        }
    }
}
