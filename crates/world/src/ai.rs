//! Enemy behaviour state machine.
//!
//! Transitions are decided by the pure [`transition`] function from distance
//! to the target, health fraction and idle time; [`EnemyBrain`] then runs the
//! behaviour of the resulting state. Disengage thresholds are wider than the
//! matching engage thresholds, so an enemy sitting on a boundary never
//! oscillates.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::debug;
use wayfarer_core::{Body, CombatConfig};

/// Behaviour state of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    /// Standing still, counting towards a patrol.
    Idle,
    /// Walking the patrol loop.
    Patrol,
    /// Running at the target.
    Chase,
    /// In reach, swinging on cooldown.
    Attack,
    /// Running away from the target.
    Flee,
}

/// Next state for an enemy in `state`.
///
/// `distance` is the distance to the target (`f32::INFINITY` without one).
/// Low health overrides every state with `Flee`, but only while the threat is
/// inside the flee-disengage distance.
pub fn transition(
    state: AiState,
    distance: f32,
    health_fraction: f32,
    idle_elapsed: f32,
    combat: &CombatConfig,
) -> AiState {
    if state != AiState::Flee
        && health_fraction < combat.flee_health_fraction
        && distance <= combat.flee_disengage_range()
    {
        return AiState::Flee;
    }

    match state {
        AiState::Idle if distance < combat.detection_range => AiState::Chase,
        AiState::Idle if idle_elapsed > combat.idle_patrol_delay => AiState::Patrol,
        AiState::Patrol if distance < combat.detection_range => AiState::Chase,
        AiState::Chase if distance > combat.chase_disengage_range() => AiState::Idle,
        AiState::Chase if distance < combat.attack_range => AiState::Attack,
        AiState::Attack if distance > combat.attack_disengage_range() => AiState::Chase,
        AiState::Flee if distance > combat.flee_disengage_range() => AiState::Idle,
        unchanged => unchanged,
    }
}

const MIN_PATROL_POINTS: usize = 3;
const MAX_PATROL_POINTS: usize = 5;
const MIN_PATROL_RADIUS: f32 = 3.0;
const MAX_PATROL_RADIUS: f32 = 6.0;

/// Radial patrol loop around `origin`: 3 to 5 points at evenly spaced angles
/// and random radii in `[3, 6)`.
pub fn patrol_points<R: Rng>(origin: Vec2, rng: &mut R) -> Vec<Vec2> {
    let count = rng.gen_range(MIN_PATROL_POINTS..=MAX_PATROL_POINTS);
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * TAU;
            let radius = rng.gen_range(MIN_PATROL_RADIUS..MAX_PATROL_RADIUS);
            origin + Vec2::from_angle(angle) * radius
        })
        .collect()
}

/// Per-enemy AI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyBrain {
    state: AiState,
    patrol: Vec<Vec2>,
    patrol_index: usize,
    idle_elapsed: f32,
    attack_cooldown: f32,
}

impl EnemyBrain {
    /// Brain with a fixed patrol loop.
    pub fn new(patrol: Vec<Vec2>) -> Self {
        Self {
            state: AiState::Idle,
            patrol,
            patrol_index: 0,
            idle_elapsed: 0.0,
            attack_cooldown: 0.0,
        }
    }

    /// Brain whose patrol loop is drawn from `rng` around `spawn`.
    pub fn spawned_at<R: Rng>(spawn: Vec2, rng: &mut R) -> Self {
        Self::new(patrol_points(spawn, rng))
    }

    pub fn state(&self) -> AiState {
        self.state
    }

    pub fn patrol(&self) -> &[Vec2] {
        &self.patrol
    }

    pub fn patrol_index(&self) -> usize {
        self.patrol_index
    }

    pub fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    /// Switch to `Flee` immediately (called when damage drops health under the
    /// flee threshold).
    pub fn force_flee(&mut self) {
        self.enter(AiState::Flee);
    }

    fn enter(&mut self, next: AiState) {
        if next == self.state {
            return;
        }
        debug!(from = ?self.state, to = ?next, "AI transition");
        self.state = next;
        self.idle_elapsed = 0.0;
    }

    /// Advance one tick: pick the next state, then set `body.velocity` for it.
    ///
    /// `speed` is the enemy's full chase speed. Returns true if the enemy
    /// lands a hit this tick.
    pub fn update(
        &mut self,
        body: &mut Body,
        target: Option<Vec2>,
        health_fraction: f32,
        speed: f32,
        dt: f32,
        combat: &CombatConfig,
    ) -> bool {
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        if self.state == AiState::Idle {
            self.idle_elapsed += dt;
        }

        let distance = target.map_or(f32::INFINITY, |t| body.position.distance(t));
        let next = transition(self.state, distance, health_fraction, self.idle_elapsed, combat);
        self.enter(next);

        match self.state {
            AiState::Idle => {
                body.velocity = Vec2::ZERO;
                false
            }
            AiState::Patrol => {
                self.patrol_step(body, speed * combat.patrol_speed_multiplier, combat);
                false
            }
            AiState::Chase => {
                body.velocity = target
                    .map(|t| steer(body.position, t, speed))
                    .unwrap_or(Vec2::ZERO);
                false
            }
            AiState::Attack => {
                body.velocity = Vec2::ZERO;
                if self.attack_cooldown <= 0.0 {
                    self.attack_cooldown = combat.attack_cooldown;
                    true
                } else {
                    false
                }
            }
            AiState::Flee => {
                let flee_speed = speed * combat.flee_speed_multiplier;
                body.velocity = target
                    .map(|t| steer(t, body.position, flee_speed))
                    .unwrap_or(Vec2::ZERO);
                false
            }
        }
    }

    fn patrol_step(&mut self, body: &mut Body, speed: f32, combat: &CombatConfig) {
        let Some(&waypoint) = self.patrol.get(self.patrol_index) else {
            body.velocity = Vec2::ZERO;
            self.enter(AiState::Idle);
            return;
        };

        if body.position.distance(waypoint) < combat.waypoint_tolerance {
            self.patrol_index = (self.patrol_index + 1) % self.patrol.len();
            body.velocity = Vec2::ZERO;
        } else {
            body.velocity = steer(body.position, waypoint, speed);
        }
    }
}

/// Velocity of magnitude `speed` pointing from `from` to `to`; zero if they coincide.
fn steer(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    (to - from).normalize_or_zero() * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn combat() -> CombatConfig {
        CombatConfig::default()
    }

    #[test]
    fn idle_engages_inside_detection_range() {
        let c = combat();
        assert_eq!(transition(AiState::Idle, 4.0, 1.0, 0.0, &c), AiState::Chase);
        assert_eq!(transition(AiState::Idle, 5.0, 1.0, 0.0, &c), AiState::Idle);
        assert_eq!(transition(AiState::Idle, 6.0, 1.0, 2.5, &c), AiState::Patrol);
        assert_eq!(transition(AiState::Patrol, 4.9, 1.0, 0.0, &c), AiState::Chase);
    }

    #[test]
    fn chase_holds_inside_hysteresis_band() {
        let c = combat();
        for d in [1.6, 3.0, 5.0, 6.0, 7.5] {
            assert_eq!(transition(AiState::Chase, d, 1.0, 0.0, &c), AiState::Chase, "d={d}");
        }
        assert_eq!(transition(AiState::Chase, 7.51, 1.0, 0.0, &c), AiState::Idle);
        assert_eq!(transition(AiState::Chase, 1.4, 1.0, 0.0, &c), AiState::Attack);
    }

    #[test]
    fn attack_falls_back_past_widened_reach() {
        let c = combat();
        assert_eq!(transition(AiState::Attack, 1.7, 1.0, 0.0, &c), AiState::Attack);
        assert_eq!(transition(AiState::Attack, 1.81, 1.0, 0.0, &c), AiState::Chase);
    }

    #[test]
    fn low_health_flees_only_near_threat() {
        let c = combat();
        assert_eq!(transition(AiState::Chase, 3.0, 0.1, 0.0, &c), AiState::Flee);
        assert_eq!(transition(AiState::Idle, 12.0, 0.1, 0.0, &c), AiState::Idle);
        assert_eq!(transition(AiState::Flee, 9.0, 0.1, 0.0, &c), AiState::Flee);
        assert_eq!(transition(AiState::Flee, 10.5, 0.1, 0.0, &c), AiState::Idle);
        assert_eq!(transition(AiState::Flee, f32::INFINITY, 1.0, 0.0, &c), AiState::Idle);
    }

    #[test]
    fn no_target_means_infinite_distance() {
        let c = combat();
        let mut brain = EnemyBrain::new(vec![Vec2::new(3.0, 0.0)]);
        brain.state = AiState::Chase;
        let mut body = Body::new(Vec2::ZERO, 0.9);
        assert!(!brain.update(&mut body, None, 1.0, 2.4, 0.05, &c));
        assert_eq!(brain.state(), AiState::Idle);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn idle_timer_starts_patrol_and_resets() {
        let c = combat();
        let mut brain = EnemyBrain::new(vec![Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)]);
        let mut body = Body::new(Vec2::ZERO, 0.9);
        for _ in 0..8 {
            brain.update(&mut body, None, 1.0, 2.4, 0.25, &c);
        }
        // Exactly 2 s idle is not yet past the delay.
        assert_eq!(brain.state(), AiState::Idle);
        brain.update(&mut body, None, 1.0, 2.4, 0.25, &c);
        assert_eq!(brain.state(), AiState::Patrol);
        assert!((body.velocity - Vec2::new(1.2, 0.0)).length() < 1e-5);
        assert_eq!(brain.idle_elapsed, 0.0);
    }

    #[test]
    fn patrol_advances_cyclically() {
        let c = combat();
        let mut brain = EnemyBrain::new(vec![Vec2::new(0.2, 0.0), Vec2::new(5.0, 0.0)]);
        brain.state = AiState::Patrol;
        let mut body = Body::new(Vec2::ZERO, 0.9);
        brain.update(&mut body, None, 1.0, 2.4, 0.1, &c);
        assert_eq!(brain.patrol_index(), 1);
        assert_eq!(body.velocity, Vec2::ZERO);
        body.position = Vec2::new(4.8, 0.0);
        brain.update(&mut body, None, 1.0, 2.4, 0.1, &c);
        assert_eq!(brain.patrol_index(), 0);
    }

    #[test]
    fn empty_patrol_falls_back_to_idle() {
        let c = combat();
        let mut brain = EnemyBrain::new(Vec::new());
        brain.state = AiState::Patrol;
        let mut body = Body::new(Vec2::ZERO, 0.9);
        brain.update(&mut body, None, 1.0, 2.4, 0.1, &c);
        assert_eq!(brain.state(), AiState::Idle);
    }

    #[test]
    fn attack_respects_cooldown() {
        let c = combat();
        let mut brain = EnemyBrain::new(Vec::new());
        brain.state = AiState::Attack;
        let mut body = Body::new(Vec2::ZERO, 0.9);
        let target = Some(Vec2::new(1.0, 0.0));
        assert!(brain.update(&mut body, target, 1.0, 2.4, 0.1, &c));
        let mut hits = 0;
        // 1.4 s of further ticks: still cooling down.
        for _ in 0..14 {
            if brain.update(&mut body, target, 1.0, 2.4, 0.1, &c) {
                hits += 1;
            }
        }
        assert_eq!(hits, 0);
        let mut landed = false;
        for _ in 0..2 {
            landed |= brain.update(&mut body, target, 1.0, 2.4, 0.1, &c);
        }
        assert!(landed);
    }

    #[test]
    fn flee_runs_away_faster() {
        let c = combat();
        let mut brain = EnemyBrain::new(Vec::new());
        let mut body = Body::new(Vec2::ZERO, 0.9);
        brain.force_flee();
        brain.update(&mut body, Some(Vec2::new(2.0, 0.0)), 0.1, 2.4, 0.1, &c);
        assert_eq!(brain.state(), AiState::Flee);
        assert!((body.velocity - Vec2::new(-2.88, 0.0)).length() < 1e-5);
    }

    #[test]
    fn patrol_points_are_radial_and_seeded() {
        let origin = Vec2::new(10.0, -4.0);
        let a = patrol_points(origin, &mut StdRng::seed_from_u64(9));
        let b = patrol_points(origin, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
        assert!((3..=5).contains(&a.len()));
        for p in &a {
            let r = p.distance(origin);
            assert!((3.0 - 1e-4..6.0 + 1e-4).contains(&r), "radius {r}");
        }
        // First point sits on the +x axis.
        assert!((a[0].y - origin.y).abs() < 1e-4);
        assert!(a[0].x > origin.x);
    }
}
