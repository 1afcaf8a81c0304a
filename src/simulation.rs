//! Single-threaded simulation tick.
//!
//! Owns the world manager and every entity. One [`Simulation::update`] call
//! runs, in order: local player movement and exploration, chunk streaming,
//! enemy AI and movement, the local player's attack, then dead-enemy cleanup.

use crate::input::TickInput;
use glam::Vec2;
use rand::{rngs::StdRng, Rng};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use wayfarer_core::{scoped_rng, EntityId, SimConfig, SimTick};
use wayfarer_net::{
    AttackRoll, ChatLine, ClientMessage, Outbox, PlayerAttack, PlayerMove, RemoteSnapshot,
    ServerMessage,
};
use wayfarer_physics::{CollisionResolver, MovementIntegrator};
use wayfarer_world::{
    Character, Entity, EntityKind, EntityTag, LoadReport, PersistedChunk, StreamReport,
    WorldManager,
};

const SPAWN_DOMAIN: u64 = 0x5350_4157_4E00_0001;
const COMBAT_DOMAIN: u64 = 0x434F_4D42_4154_0002;
const NPC_COUNT: i32 = 3;
const ENEMY_COUNT: usize = 5;
/// Enemies spawn within this distance of the player on each axis.
const ENEMY_SCATTER: f32 = 10.0;

/// Render-facing summary of one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityTag,
    pub position: Vec2,
    pub rotation: f32,
    pub health_fraction: f32,
}

/// Notable things that happened during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// An enemy hit the local player.
    PlayerDamaged {
        by: EntityId,
        dealt: f32,
        killed: bool,
    },
    /// The local player hit an enemy.
    EnemyDamaged {
        target: EntityId,
        dealt: f32,
        critical: bool,
    },
    /// An enemy died and was removed.
    EnemyDefeated { id: EntityId, experience: u64 },
    LevelUp { level: u32 },
    RemoteJoined { id: EntityId, remote: String },
    Chat {
        player: Option<String>,
        message: String,
    },
}

/// The simulation state and its per-tick driver.
pub struct Simulation {
    config: SimConfig,
    world: WorldManager,
    entities: BTreeMap<EntityId, Entity>,
    local_player: EntityId,
    remotes: BTreeMap<String, EntityId>,
    next_id: u64,
    tick: SimTick,
    rng: StdRng,
    integrator: MovementIntegrator,
    outbox: Outbox,
    events: Vec<SimEvent>,
    last_stream: StreamReport,
}

impl Simulation {
    /// Fresh world for `config.world`. `character` of `None` spawns a
    /// formless player.
    pub fn new(config: SimConfig, player_name: &str, character: Option<Character>) -> Self {
        let config = config.sanitized();
        let world = WorldManager::new(config.world.clone());
        Self::with_world(config, world, player_name, character)
    }

    /// Start on an existing world. Chunks already cached in `world` are kept
    /// when the initial area is revealed.
    #[instrument(skip_all, fields(seed = config.world.seed))]
    pub fn with_world(
        config: SimConfig,
        mut world: WorldManager,
        player_name: &str,
        character: Option<Character>,
    ) -> Self {
        let config = config.sanitized();
        world.reveal_initial_area();

        let mut sim = Self {
            outbox: Outbox::new(config.sync.network_update_rate),
            rng: scoped_rng(config.world.seed, COMBAT_DOMAIN, SimTick::ZERO),
            world,
            entities: BTreeMap::new(),
            local_player: EntityId(0),
            remotes: BTreeMap::new(),
            next_id: 1,
            tick: SimTick::ZERO,
            integrator: MovementIntegrator,
            events: Vec::new(),
            last_stream: StreamReport::default(),
            config,
        };
        sim.spawn_initial_entities(player_name, character);

        let spawn = sim.player_position();
        sim.world.explore_around(spawn);
        sim.last_stream = sim
            .world
            .update_streamed_chunks(spawn, sim.config.world.render_distance);
        info!(
            entities = sim.entities.len(),
            resident = sim.last_stream.resident,
            "Simulation ready"
        );
        sim
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn spawn_initial_entities(&mut self, player_name: &str, character: Option<Character>) {
        let spawn = Vec2::splat(self.config.world.initial_area_extent() / 2.0);
        let movement = self.config.movement.clone();
        let combat = self.config.combat.clone();

        let id = self.allocate_id();
        let player = match character {
            Some(character) => {
                Entity::embodied_player(id, player_name, spawn, true, character, &movement)
            }
            None => Entity::formless_player(id, player_name, spawn, true, &movement),
        };
        self.local_player = id;
        self.entities.insert(id, player);

        for i in 0..NPC_COUNT {
            let id = self.allocate_id();
            let name = format!("NPC {}", i + 1);
            let position = spawn + Vec2::new((i * 5 - 5) as f32, (i * 3 - 3) as f32);
            let dialogue = vec![
                format!("Hello, traveler! I am {name}."),
                "Welcome to the world!".to_string(),
            ];
            self.entities
                .insert(id, Entity::npc(id, name, position, dialogue, &movement));
        }

        let mut spawn_rng = scoped_rng(self.config.world.seed, SPAWN_DOMAIN, SimTick::ZERO);
        for i in 0..ENEMY_COUNT {
            let id = self.allocate_id();
            let offset = Vec2::new(
                spawn_rng.gen_range(-ENEMY_SCATTER..ENEMY_SCATTER),
                spawn_rng.gen_range(-ENEMY_SCATTER..ENEMY_SCATTER),
            );
            let enemy = Entity::enemy(
                id,
                format!("Goblin {}", i + 1),
                spawn + offset,
                1,
                &movement,
                &combat,
                &mut spawn_rng,
            );
            self.entities.insert(id, enemy);
        }
        debug!(%spawn, entities = self.entities.len(), "Spawned initial entities");
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldManager {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldManager {
        &mut self.world
    }

    pub fn tick(&self) -> SimTick {
        self.tick
    }

    pub fn local_player_id(&self) -> EntityId {
        self.local_player
    }

    pub fn local_player(&self) -> Option<&Entity> {
        self.entities.get(&self.local_player)
    }

    pub fn player_position(&self) -> Vec2 {
        self.local_player()
            .map_or(Vec2::ZERO, |player| player.body.position)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Every entity in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Streaming report of the latest tick.
    pub fn last_stream(&self) -> StreamReport {
        self.last_stream
    }

    /// Render-facing views in id order.
    pub fn entity_views(&self) -> Vec<EntityView> {
        self.entities
            .values()
            .map(|e| EntityView {
                id: e.id,
                kind: e.tag(),
                position: e.body.position,
                rotation: e.body.rotation,
                health_fraction: e.health.fraction(),
            })
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Outbound relay messages released so far.
    pub fn drain_outbound(&mut self) -> Vec<ClientMessage> {
        self.outbox.drain()
    }

    pub fn send_chat(&mut self, message: impl Into<String>) {
        self.outbox.push(ClientMessage::Chat(ChatLine {
            message: message.into(),
            player: None,
        }));
    }

    /// Apply chunks delivered by persistence.
    pub fn load_persisted(&mut self, records: Vec<PersistedChunk>) -> LoadReport {
        let report = self.world.load_persisted(records);
        info!(?report, "Applied persisted exploration");
        report
    }

    /// Momentary copy of everything worth persisting.
    pub fn export_persisted(&self) -> Vec<PersistedChunk> {
        self.world.export_persisted()
    }

    /// Advance one tick. `dt` is capped at `frame_time_cap`.
    #[instrument(skip(self, input), fields(tick = self.tick.0))]
    pub fn update(&mut self, dt: f32, input: &TickInput) {
        let dt = dt.clamp(0.0, self.config.movement.frame_time_cap);
        self.tick = self.tick.advance(1);

        self.update_local_player(dt, input);
        let observer = self.player_position();
        self.last_stream = self
            .world
            .update_streamed_chunks(observer, self.config.world.render_distance);

        self.update_enemies(dt);

        if let Some(target) = input.attack_at {
            self.player_attack(target);
        }

        self.remove_dead_enemies();
        self.outbox.tick(f64::from(dt));
    }

    fn update_local_player(&mut self, dt: f32, input: &TickInput) {
        let speed = self.config.movement.base_speed;
        let resolver = CollisionResolver::new(&self.world);
        let Some(player) = self.entities.get_mut(&self.local_player) else {
            return;
        };
        if let Some(data) = player.as_player_mut() {
            data.attack_cooldown = (data.attack_cooldown - dt).max(0.0);
        }
        if player.is_dead() {
            self.integrator.stop(&mut player.body);
            return;
        }

        self.integrator.set_velocity_from_direction(
            &mut player.body,
            input.movement.direction(),
            speed,
        );
        let outcome = self.integrator.integrate(&mut player.body, dt, &resolver);
        if !outcome.moved() {
            return;
        }

        let body = player.body;
        self.world.explore_around(body.position);
        self.outbox.push_move(PlayerMove {
            position: body.position.into(),
            velocity: body.velocity.into(),
            rotation: body.rotation,
        });
    }

    fn update_enemies(&mut self, dt: f32) {
        let combat = &self.config.combat;
        let target = self
            .entities
            .get(&self.local_player)
            .filter(|p| !p.is_dead())
            .map(|p| p.body.position);
        let resolver = CollisionResolver::new(&self.world);

        let mut hits = Vec::new();
        for entity in self.entities.values_mut() {
            if entity.health.is_dead() {
                continue;
            }
            let health_fraction = entity.health.fraction();
            let EntityKind::Enemy(enemy) = &mut entity.kind else {
                continue;
            };
            let landed = enemy.brain.update(
                &mut entity.body,
                target,
                health_fraction,
                enemy.speed,
                dt,
                combat,
            );
            if landed {
                hits.push((entity.id, enemy.damage));
            }
            self.integrator.integrate(&mut entity.body, dt, &resolver);
        }

        for (by, damage) in hits {
            let Some(player) = self.entities.get_mut(&self.local_player) else {
                break;
            };
            if player.is_dead() {
                break;
            }
            let outcome = player.take_damage(damage, combat);
            debug!(enemy = %by, dealt = outcome.dealt, "Enemy hit player");
            if outcome.killed {
                warn!(player = %self.local_player, "Local player died");
            }
            self.events.push(SimEvent::PlayerDamaged {
                by,
                dealt: outcome.dealt,
                killed: outcome.killed,
            });
        }
    }

    /// Swing at `target`, hitting every living enemy within
    /// `player_attack_range` of the player. Each hit rolls its own critical.
    ///
    /// Returns the number of enemies hit. A swing that is not allowed (dead,
    /// formless or cooling down) returns 0 and leaves the cooldown alone.
    pub fn player_attack(&mut self, target: Vec2) -> usize {
        let range = self.config.combat.player_attack_range;
        let cooldown = self.config.combat.player_attack_cooldown;
        let Some(player) = self.entities.get_mut(&self.local_player) else {
            return 0;
        };
        if player.is_dead() {
            return 0;
        }
        let origin = player.body.position;
        let Some(data) = player.as_player_mut().filter(|p| p.can_attack()) else {
            return 0;
        };
        data.attack_cooldown = cooldown;
        let base_damage = data.character().map_or(0.0, |c| c.stats.attack_damage);
        let aim = target - origin;
        if aim != Vec2::ZERO {
            player.body.rotation = aim.y.atan2(aim.x);
        }

        let in_reach: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.tag() == EntityTag::Enemy && !e.is_dead())
            .filter(|e| e.body.position.distance(origin) <= range)
            .map(|e| e.id)
            .collect();

        let mut experience = 0;
        let mut hits = 0;
        for id in in_reach {
            let roll = self
                .entities
                .get(&self.local_player)
                .and_then(Entity::as_player)
                .and_then(|p| p.roll_damage(&mut self.rng));
            let Some(damage) = roll else {
                break;
            };
            let critical = damage > base_damage;
            let Some(enemy) = self.entities.get_mut(&id) else {
                continue;
            };
            let outcome = enemy.take_damage(damage, &self.config.combat);
            if outcome.killed {
                experience += enemy.as_enemy().map_or(0, |e| e.experience_reward);
            }
            hits += 1;
            self.events.push(SimEvent::EnemyDamaged {
                target: id,
                dealt: outcome.dealt,
                critical,
            });
            self.outbox.push(ClientMessage::PlayerAttack(PlayerAttack {
                attack: AttackRoll {
                    damage,
                    is_critical: critical,
                },
                target: id.to_string(),
            }));
        }

        if experience > 0 {
            self.award_experience(experience);
        }
        hits
    }

    fn award_experience(&mut self, amount: u64) {
        let Some(character) = self
            .entities
            .get_mut(&self.local_player)
            .and_then(Entity::as_player_mut)
            .and_then(|p| p.character_mut())
        else {
            return;
        };
        if character.gain_experience(amount) > 0 {
            info!(level = character.level, "Level up");
            self.events.push(SimEvent::LevelUp {
                level: character.level,
            });
        }
    }

    fn remove_dead_enemies(&mut self) {
        let dead: Vec<(EntityId, u64)> = self
            .entities
            .values()
            .filter(|e| e.is_dead())
            .filter_map(|e| e.as_enemy().map(|enemy| (e.id, enemy.experience_reward)))
            .collect();
        for (id, experience) in dead {
            self.entities.remove(&id);
            debug!(enemy = %id, "Removed dead enemy");
            self.events.push(SimEvent::EnemyDefeated { id, experience });
        }
    }

    /// Apply one inbound relay message.
    pub fn apply_remote(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::PlayerUpdate(snapshot) => {
                let id = self.remote_player(&snapshot.id);
                self.write_snapshot(id, &snapshot);
            }
            ServerMessage::EntityUpdate(snapshot) => match self.remotes.get(&snapshot.id) {
                Some(&id) => self.write_snapshot(id, &snapshot),
                None => debug!(remote = %snapshot.id, "Update for unknown remote entity"),
            },
            ServerMessage::Chat(line) => self.events.push(SimEvent::Chat {
                player: line.player,
                message: line.message,
            }),
            ServerMessage::Pong => {}
            ServerMessage::Opaque(envelope) => {
                debug!(kind = ?envelope.kind, "Ignoring relay message");
            }
        }
    }

    fn remote_player(&mut self, remote: &str) -> EntityId {
        if let Some(&id) = self.remotes.get(remote) {
            return id;
        }
        let id = self.allocate_id();
        let entity = Entity::formless_player(id, remote, Vec2::ZERO, false, &self.config.movement);
        self.entities.insert(id, entity);
        self.remotes.insert(remote.to_string(), id);
        info!(%id, remote, "Remote player joined");
        self.events.push(SimEvent::RemoteJoined {
            id,
            remote: remote.to_string(),
        });
        id
    }

    /// Remote kinematics are authoritative; no collision is applied.
    fn write_snapshot(&mut self, id: EntityId, snapshot: &RemoteSnapshot) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.body.position = snapshot.position.into();
            entity.body.velocity = snapshot.velocity.into();
            entity.body.rotation = snapshot.rotation;
        }
    }
}
