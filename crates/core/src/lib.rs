#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod config;

use glam::Vec2;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

pub use config::{CombatConfig, MovementConfig, SimConfig, SyncConfig, WorldConfig};

/// Fixed tick counter for the simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks, saturating at `u64::MAX`.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

/// Helper to derive a reproducible RNG seeded by world + entity/chunk + tick domains.
pub fn scoped_rng(world_seed: u64, domain_hash: u64, tick: SimTick) -> StdRng {
    let seed = world_seed ^ domain_hash ^ tick.0;
    StdRng::seed_from_u64(seed)
}

/// Stable entity identifier assigned by the owning simulation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinematic state shared by every entity that moves across the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// World position in tile units.
    pub position: Vec2,
    /// Velocity in tiles per second.
    pub velocity: Vec2,
    /// Facing angle in radians (`atan2(vy, vx)` of the last non-zero velocity).
    pub rotation: f32,
    /// Side length of the collision box.
    pub size: f32,
}

impl Body {
    /// Create a stationary body at `position`.
    pub fn new(position: Vec2, size: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            size,
        }
    }

    /// True when the body has no velocity.
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.velocity == Vec2::ZERO
    }
}

/// Walkability queries answered by whatever owns the tile data.
///
/// The collision layer only ever sees the world through this trait, so an
/// unknown or unexplored cell must answer `false`.
pub trait Walkability {
    /// Whether the tile under `position` can be stood on.
    fn is_walkable(&self, position: Vec2) -> bool;
}

/// Adapter that lets a plain closure stand in for a tile map (tests, tools).
#[derive(Debug, Clone, Copy)]
pub struct WalkableFn<F>(pub F);

impl<F> Walkability for WalkableFn<F>
where
    F: Fn(Vec2) -> bool,
{
    fn is_walkable(&self, position: Vec2) -> bool {
        (self.0)(position)
    }
}
