//! Entities that live on the tile grid: players, enemies and NPCs.

use crate::ai::{AiState, EnemyBrain};
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use wayfarer_core::{Body, CombatConfig, EntityId, MovementConfig};

/// Hit points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// `current / max`, 0 for a zero-max pool.
    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Subtract `amount`, clamped to `[0, max]`.
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).clamp(0.0, self.max);
    }
}

/// Already-computed combat numbers of an embodied character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub attack_damage: f32,
    pub defense: f32,
    /// Probability in `[0, 1]`.
    pub crit_chance: f32,
    /// Damage multiplier on a critical hit.
    pub crit_damage: f32,
    pub vitality: f32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack_damage: 15.0,
            defense: 5.0,
            crit_chance: 0.05,
            crit_damage: 1.5,
            vitality: 10.0,
        }
    }
}

/// Experience needed to reach `level`.
pub fn experience_for_level(level: u32) -> u64 {
    (100.0 * f64::from(level).powf(1.5)).floor() as u64
}

/// An embodied player's progression and stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub level: u32,
    pub experience: u64,
    pub stats: CombatStats,
}

impl Character {
    pub fn new(level: u32, stats: CombatStats) -> Self {
        Self {
            level: level.max(1),
            experience: 0,
            stats,
        }
    }

    pub fn max_health(&self) -> f32 {
        100.0 + self.stats.vitality * 10.0
    }

    pub fn experience_to_level(&self) -> u64 {
        experience_for_level(self.level + 1)
    }

    /// Add experience and level up as often as it allows. Returns levels gained.
    pub fn gain_experience(&mut self, amount: u64) -> u32 {
        self.experience += amount;
        let mut gained = 0;
        while self.experience >= self.experience_to_level() {
            self.experience -= self.experience_to_level();
            self.level += 1;
            gained += 1;
        }
        gained
    }
}

/// Whether a player has a body yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerForm {
    /// No character chosen: one hit point, smaller box, cannot attack.
    Formless,
    Embodied(Box<Character>),
}

/// Player-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub name: String,
    pub form: PlayerForm,
    pub is_local: bool,
    pub attack_cooldown: f32,
}

impl PlayerData {
    pub fn character(&self) -> Option<&Character> {
        match &self.form {
            PlayerForm::Embodied(character) => Some(&**character),
            PlayerForm::Formless => None,
        }
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        match &mut self.form {
            PlayerForm::Embodied(character) => Some(&mut **character),
            PlayerForm::Formless => None,
        }
    }

    pub fn can_attack(&self) -> bool {
        self.character().is_some() && self.attack_cooldown <= 0.0
    }

    /// Damage actually taken from a raw hit: `max(1, amount - defense)`.
    pub fn mitigate(&self, amount: f32) -> f32 {
        let defense = self.character().map_or(0.0, |c| c.stats.defense);
        (amount - defense).max(1.0)
    }

    /// Outgoing damage of one swing, rolling for a critical hit.
    pub fn roll_damage<R: Rng>(&self, rng: &mut R) -> Option<f32> {
        let stats = self.character()?.stats;
        let crit = rng.gen::<f32>() < stats.crit_chance;
        Some(if crit {
            stats.attack_damage * stats.crit_damage
        } else {
            stats.attack_damage
        })
    }
}

/// Level-derived enemy stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub level: u32,
    pub damage: f32,
    pub experience_reward: u64,
    /// Full chase speed in tiles per second.
    pub speed: f32,
    pub brain: EnemyBrain,
}

impl Enemy {
    pub fn max_health_for_level(level: u32) -> f32 {
        50.0 + 20.0 * level as f32
    }

    pub fn new(name: impl Into<String>, level: u32, speed: f32, brain: EnemyBrain) -> Self {
        Self {
            name: name.into(),
            level,
            damage: 10.0 + 5.0 * level as f32,
            experience_reward: 25 * u64::from(level),
            speed,
            brain,
        }
    }
}

/// Static dialogue-only character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub dialogue: Vec<String>,
}

/// Entity variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Player(PlayerData),
    Enemy(Enemy),
    Npc(Npc),
}

/// Discriminant exposed to render and network collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTag {
    Player,
    Enemy,
    Npc,
}

/// Anything with a body on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub body: Body,
    pub health: Health,
    pub kind: EntityKind,
}

/// Outcome of damaging an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub dealt: f32,
    pub killed: bool,
}

impl Entity {
    /// Formless player: one hit point, box scaled by `formless_size_factor`.
    pub fn formless_player(
        id: EntityId,
        name: impl Into<String>,
        position: Vec2,
        is_local: bool,
        movement: &MovementConfig,
    ) -> Self {
        Self {
            id,
            body: Body::new(position, movement.player_size * movement.formless_size_factor),
            health: Health::full(1.0),
            kind: EntityKind::Player(PlayerData {
                name: name.into(),
                form: PlayerForm::Formless,
                is_local,
                attack_cooldown: 0.0,
            }),
        }
    }

    pub fn embodied_player(
        id: EntityId,
        name: impl Into<String>,
        position: Vec2,
        is_local: bool,
        character: Character,
        movement: &MovementConfig,
    ) -> Self {
        Self {
            id,
            body: Body::new(position, movement.player_size),
            health: Health::full(character.max_health()),
            kind: EntityKind::Player(PlayerData {
                name: name.into(),
                form: PlayerForm::Embodied(Box::new(character)),
                is_local,
                attack_cooldown: 0.0,
            }),
        }
    }

    /// Enemy at `position` whose patrol loop is drawn from `rng`.
    pub fn enemy<R: Rng>(
        id: EntityId,
        name: impl Into<String>,
        position: Vec2,
        level: u32,
        movement: &MovementConfig,
        combat: &CombatConfig,
        rng: &mut R,
    ) -> Self {
        let speed = movement.base_speed * combat.enemy_speed_factor;
        Self {
            id,
            body: Body::new(position, movement.enemy_size),
            health: Health::full(Enemy::max_health_for_level(level)),
            kind: EntityKind::Enemy(Enemy::new(
                name,
                level,
                speed,
                EnemyBrain::spawned_at(position, rng),
            )),
        }
    }

    pub fn npc(
        id: EntityId,
        name: impl Into<String>,
        position: Vec2,
        dialogue: Vec<String>,
        movement: &MovementConfig,
    ) -> Self {
        Self {
            id,
            body: Body::new(position, movement.npc_size),
            health: Health::full(100.0),
            kind: EntityKind::Npc(Npc {
                name: name.into(),
                dialogue,
            }),
        }
    }

    pub fn tag(&self) -> EntityTag {
        match self.kind {
            EntityKind::Player(_) => EntityTag::Player,
            EntityKind::Enemy(_) => EntityTag::Enemy,
            EntityKind::Npc(_) => EntityTag::Npc,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            EntityKind::Player(p) => &p.name,
            EntityKind::Enemy(e) => &e.name,
            EntityKind::Npc(n) => &n.name,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerData> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_enemy(&self) -> Option<&Enemy> {
        match &self.kind {
            EntityKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    /// Apply a raw hit. Players mitigate by defense; enemies switch to flee
    /// once health drops under `flee_health_fraction`. NPCs are invulnerable.
    pub fn take_damage(&mut self, amount: f32, combat: &CombatConfig) -> DamageOutcome {
        let dealt = match &self.kind {
            EntityKind::Npc(_) => 0.0,
            EntityKind::Player(player) => player.mitigate(amount),
            EntityKind::Enemy(_) => amount.max(0.0),
        };
        let before = self.health.current;
        self.health.damage(dealt);
        let killed = before > 0.0 && self.health.is_dead();

        if let EntityKind::Enemy(enemy) = &mut self.kind {
            if !self.health.is_dead()
                && self.health.fraction() < combat.flee_health_fraction
                && enemy.brain.state() != AiState::Flee
            {
                enemy.brain.force_flee();
            }
        }

        DamageOutcome {
            dealt: before - self.health.current,
            killed,
        }
    }
}
