//! Tunable simulation constants.
//!
//! Every section uses `#[serde(default)]` so a partial TOML file only needs to
//! name the values it overrides.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level tunables for a simulation instance.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Terrain, chunk geometry and streaming.
    pub world: WorldConfig,
    /// Entity sizes, speeds and the frame-time cap.
    pub movement: MovementConfig,
    /// Enemy AI ranges, cooldowns and flee behaviour.
    pub combat: CombatConfig,
    /// Timers for the asynchronous collaborators.
    pub sync: SyncConfig,
}

impl SimConfig {
    /// Replace values the simulation cannot run with, logging each correction.
    pub fn sanitized(self) -> Self {
        Self {
            world: self.world.sanitized(),
            movement: self.movement.sanitized(),
            ..self
        }
    }
}

/// Terrain and streaming tunables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Terrain seed.
    pub seed: u64,
    /// World units per tile.
    pub tile_size: f32,
    /// Tiles per chunk side.
    pub chunk_size: i32,
    /// Chebyshev radius (in chunks) of the streamed square.
    pub render_distance: i32,
    /// Chebyshev radius (in chunks) marked explored per movement event.
    pub exploration_radius: i32,
    /// Extra chunks beyond `render_distance` before a resident chunk is evicted.
    pub eviction_margin: i32,
    /// Side (in chunks) of the pre-revealed square anchored at chunk (0, 0).
    pub initial_area_chunks: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            tile_size: 1.0,
            chunk_size: 20,
            render_distance: 3,
            exploration_radius: 1,
            eviction_margin: 2,
            initial_area_chunks: 50,
        }
    }
}

impl WorldConfig {
    /// Clamp geometry and streaming radii into their valid ranges.
    ///
    /// `chunk_size >= 1`, finite `tile_size > 0`, and non-negative
    /// `render_distance`, `exploration_radius`, `eviction_margin` and
    /// `initial_area_chunks`. Each correction is logged with `warn!`.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.chunk_size < 1 {
            warn!(chunk_size = self.chunk_size, "chunk_size must be at least 1, using 1");
            self.chunk_size = 1;
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            warn!(
                tile_size = self.tile_size,
                "tile_size must be positive, using {}", defaults.tile_size
            );
            self.tile_size = defaults.tile_size;
        }
        for (name, value) in [
            ("render_distance", &mut self.render_distance),
            ("exploration_radius", &mut self.exploration_radius),
            ("eviction_margin", &mut self.eviction_margin),
            ("initial_area_chunks", &mut self.initial_area_chunks),
        ] {
            if *value < 0 {
                warn!(value = *value, "{name} must not be negative, using 0");
                *value = 0;
            }
        }
        self
    }

    /// World-space side length of the pre-revealed origin region.
    pub fn initial_area_extent(&self) -> f32 {
        self.initial_area_chunks as f32 * self.chunk_size as f32 * self.tile_size
    }
}

/// Movement and body tunables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Base player speed in tiles per second.
    pub base_speed: f32,
    /// Collision box side for embodied players.
    pub player_size: f32,
    /// Scale applied to `player_size` for formless players.
    pub formless_size_factor: f32,
    /// Collision box side for enemies.
    pub enemy_size: f32,
    /// Collision box side for NPCs.
    pub npc_size: f32,
    /// Upper bound on a single tick's delta time, in seconds.
    pub frame_time_cap: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 3.0,
            player_size: 0.8,
            formless_size_factor: 0.8,
            enemy_size: 0.9,
            npc_size: 0.9,
            frame_time_cap: 0.1,
        }
    }
}

impl MovementConfig {
    /// Replace a non-positive or non-finite `frame_time_cap` with the default.
    pub fn sanitized(mut self) -> Self {
        if !(self.frame_time_cap.is_finite() && self.frame_time_cap > 0.0) {
            let fallback = Self::default().frame_time_cap;
            warn!(
                frame_time_cap = self.frame_time_cap,
                "frame_time_cap must be positive, using {fallback}"
            );
            self.frame_time_cap = fallback;
        }
        self
    }
}

/// Combat and AI tunables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Distance under which an idle/patrolling enemy engages.
    pub detection_range: f32,
    /// Distance under which a chasing enemy starts attacking.
    pub attack_range: f32,
    /// `detection_range` multiplier past which a chase is abandoned.
    pub chase_disengage_multiplier: f32,
    /// `attack_range` multiplier past which an attack falls back to chasing.
    pub attack_disengage_multiplier: f32,
    /// `detection_range` multiplier past which a fleeing enemy calms down.
    pub flee_disengage_multiplier: f32,
    /// Seconds between enemy hits.
    pub attack_cooldown: f32,
    /// Health fraction under which an enemy flees.
    pub flee_health_fraction: f32,
    /// Speed multiplier while fleeing.
    pub flee_speed_multiplier: f32,
    /// Seconds spent idle before starting a patrol.
    pub idle_patrol_delay: f32,
    /// Speed multiplier while patrolling.
    pub patrol_speed_multiplier: f32,
    /// Distance at which a patrol waypoint counts as reached.
    pub waypoint_tolerance: f32,
    /// Enemy speed as a fraction of `MovementConfig::base_speed`.
    pub enemy_speed_factor: f32,
    /// Reach of a player's melee attack.
    pub player_attack_range: f32,
    /// Seconds between player attacks.
    pub player_attack_cooldown: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            detection_range: 5.0,
            attack_range: 1.5,
            chase_disengage_multiplier: 1.5,
            attack_disengage_multiplier: 1.2,
            flee_disengage_multiplier: 2.0,
            attack_cooldown: 1.5,
            flee_health_fraction: 0.2,
            flee_speed_multiplier: 1.2,
            idle_patrol_delay: 2.0,
            patrol_speed_multiplier: 0.5,
            waypoint_tolerance: 0.5,
            enemy_speed_factor: 0.8,
            player_attack_range: 1.5,
            player_attack_cooldown: 0.5,
        }
    }
}

impl CombatConfig {
    /// Distance beyond which a chase is abandoned.
    pub fn chase_disengage_range(&self) -> f32 {
        self.detection_range * self.chase_disengage_multiplier
    }

    /// Distance beyond which an attack falls back to a chase.
    pub fn attack_disengage_range(&self) -> f32 {
        self.attack_range * self.attack_disengage_multiplier
    }

    /// Distance beyond which a fleeing enemy returns to idle.
    pub fn flee_disengage_range(&self) -> f32 {
        self.detection_range * self.flee_disengage_multiplier
    }
}

/// Timers for the persistence and network collaborators.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between exploration uploads.
    pub exploration_sync_secs: u64,
    /// Outbound movement updates per second.
    pub network_update_rate: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            exploration_sync_secs: 10,
            network_update_rate: 20,
        }
    }
}
