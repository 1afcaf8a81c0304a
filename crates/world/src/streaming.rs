//! Observer-driven chunk residency and visibility.
//!
//! Each pass makes explored chunks in range resident and visible, hides
//! resident chunks that fell out of range, and evicts those beyond the
//! eviction margin. Exploration gates visibility before distance does.

use crate::chunk::Chunk;
use crate::coords::{ChunkGeometry, ChunkKey, ChunkPos};
use crate::exploration::{ExplorationLedger, LoadReport};
use crate::persist::PersistedChunk;
use crate::terrain::TerrainGenerator;
use crate::tile::{tile_is_walkable, TileId, TILE_UNEXPLORED};
use glam::Vec2;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};
use wayfarer_core::{Walkability, WorldConfig};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Per-resident-chunk state bits.
    pub struct ResidentFlags: u8 {
        const VISIBLE = 0b0000_0001;
        /// Visibility flipped since the last event flush.
        const VISIBILITY_CHANGED = 0b0000_0010;
    }
}

impl Default for ResidentFlags {
    fn default() -> Self {
        ResidentFlags::empty()
    }
}

/// Residency change reported to the rendering collaborator.
///
/// `Unloaded` implies hidden; no separate `Hidden` is emitted for an evicted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEvent {
    Loaded(ChunkPos),
    Unloaded(ChunkPos),
    Shown(ChunkPos),
    Hidden(ChunkPos),
}

/// Summary of one streaming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub observer: ChunkPos,
    pub loaded: usize,
    pub unloaded: usize,
    pub visible: usize,
    pub resident: usize,
}

#[derive(Debug, Default)]
struct ResidentChunk {
    flags: ResidentFlags,
}

impl ResidentChunk {
    fn set_visible(&mut self, visible: bool) {
        if self.flags.contains(ResidentFlags::VISIBLE) != visible {
            self.flags.set(ResidentFlags::VISIBLE, visible);
            self.flags.toggle(ResidentFlags::VISIBILITY_CHANGED);
        }
    }

    fn take_visibility_change(&mut self) -> Option<bool> {
        if !self.flags.contains(ResidentFlags::VISIBILITY_CHANGED) {
            return None;
        }
        self.flags.remove(ResidentFlags::VISIBILITY_CHANGED);
        Some(self.flags.contains(ResidentFlags::VISIBLE))
    }
}

/// Borrowed view of one resident chunk.
#[derive(Debug, Clone, Copy)]
pub struct ResidentChunkView<'a> {
    pub chunk: &'a Chunk,
    pub visible: bool,
}

/// Spatial world manager.
pub struct WorldManager {
    config: WorldConfig,
    geometry: ChunkGeometry,
    ledger: ExplorationLedger,
    resident: BTreeMap<ChunkKey, ResidentChunk>,
    events: Vec<ChunkEvent>,
}

impl WorldManager {
    pub fn new(config: WorldConfig) -> Self {
        let config = config.sanitized();
        let generator = TerrainGenerator::from_config(&config);
        Self {
            geometry: generator.geometry(),
            ledger: ExplorationLedger::new(generator),
            resident: BTreeMap::new(),
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn geometry(&self) -> ChunkGeometry {
        self.geometry
    }

    pub fn ledger(&self) -> &ExplorationLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ExplorationLedger {
        &mut self.ledger
    }

    /// Generate and mark explored the pre-revealed origin square.
    #[instrument(skip(self), fields(chunks = self.config.initial_area_chunks))]
    pub fn reveal_initial_area(&mut self) {
        let side = self.config.initial_area_chunks.max(0);
        for y in 0..side {
            for x in 0..side {
                let pos = ChunkPos::new(x, y);
                self.ledger.get_chunk(pos);
                self.ledger.mark_explored(pos);
            }
        }
        info!(
            explored = self.ledger.explored_count(),
            "Revealed initial area"
        );
    }

    /// Movement event: mark `exploration_radius` chunks around `position`.
    pub fn explore_around(&mut self, position: Vec2) -> usize {
        self.ledger
            .mark_chunks_around_position(position, self.config.exploration_radius)
    }

    /// Stream chunks around `observer`.
    #[instrument(skip(self))]
    pub fn update_streamed_chunks(&mut self, observer: Vec2, render_distance: i32) -> StreamReport {
        let center = self.geometry.chunk_of(observer);
        let mut report = StreamReport {
            observer: center,
            ..StreamReport::default()
        };

        let mut in_range = BTreeSet::new();
        let mut loaded_this_pass = BTreeSet::new();
        for pos in center.square(render_distance) {
            let key = ChunkKey::from_pos(pos);
            in_range.insert(key);
            if !self.ledger.is_explored(pos) {
                continue;
            }
            self.ledger.get_chunk(pos);
            let resident = self.resident.entry(key).or_insert_with(|| {
                loaded_this_pass.insert(key);
                ResidentChunk::default()
            });
            resident.set_visible(true);
        }
        for key in &loaded_this_pass {
            let pos = key.pos();
            debug!(chunk = %pos, "Chunk loaded");
            self.events.push(ChunkEvent::Loaded(pos));
        }
        report.loaded = loaded_this_pass.len();

        let keep_within = render_distance.saturating_add(self.config.eviction_margin);
        report.unloaded = self.refresh_residency(center, keep_within, &in_range, &loaded_this_pass);

        self.flush_visibility_events();
        report.resident = self.resident.len();
        report.visible = self
            .resident
            .values()
            .filter(|r| r.flags.contains(ResidentFlags::VISIBLE))
            .count();
        report
    }

    /// Hide out-of-range residents and evict those beyond `keep_within`.
    ///
    /// Linear in the resident set; the only place that walks every resident chunk.
    fn refresh_residency(
        &mut self,
        center: ChunkPos,
        keep_within: i32,
        in_range: &BTreeSet<ChunkKey>,
        loaded_this_pass: &BTreeSet<ChunkKey>,
    ) -> usize {
        let mut evicted = Vec::new();
        for (key, resident) in self.resident.iter_mut() {
            if !in_range.contains(key) {
                resident.set_visible(false);
            }
            if i64::from(key.pos().chebyshev(center)) > i64::from(keep_within) {
                evicted.push(*key);
            }
        }

        for key in &evicted {
            debug_assert!(
                !loaded_this_pass.contains(key),
                "chunk loaded and evicted in the same pass"
            );
            self.resident.remove(key);
            let pos = key.pos();
            debug!(chunk = %pos, "Chunk unloaded");
            self.events.push(ChunkEvent::Unloaded(pos));
        }
        evicted.len()
    }

    fn flush_visibility_events(&mut self) {
        for (key, resident) in self.resident.iter_mut() {
            match resident.take_visibility_change() {
                Some(true) => self.events.push(ChunkEvent::Shown(key.pos())),
                Some(false) => self.events.push(ChunkEvent::Hidden(key.pos())),
                None => {}
            }
        }
    }

    /// Drain pending residency events.
    pub fn take_events(&mut self) -> Vec<ChunkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resident chunks with their visibility, in coordinate order.
    pub fn resident_chunks(&self) -> impl Iterator<Item = ResidentChunkView<'_>> + '_ {
        self.resident.iter().filter_map(|(key, resident)| {
            self.ledger
                .cached_chunk(key.pos())
                .map(|chunk| ResidentChunkView {
                    chunk,
                    visible: resident.flags.contains(ResidentFlags::VISIBLE),
                })
        })
    }

    pub fn is_resident(&self, pos: ChunkPos) -> bool {
        self.resident.contains_key(&ChunkKey::from_pos(pos))
    }

    pub fn is_visible(&self, pos: ChunkPos) -> bool {
        self.resident
            .get(&ChunkKey::from_pos(pos))
            .is_some_and(|r| r.flags.contains(ResidentFlags::VISIBLE))
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// Tile under `position`. Unexplored or never-generated chunks read as the
    /// sentinel; this never generates.
    pub fn tile_at(&self, position: Vec2) -> TileId {
        let (pos, local) = self.geometry.locate(position);
        if !self.ledger.is_explored(pos) {
            return TILE_UNEXPLORED;
        }
        self.ledger
            .cached_chunk(pos)
            .map_or(TILE_UNEXPLORED, |chunk| chunk.tile_local(local))
    }

    pub fn is_walkable(&self, position: Vec2) -> bool {
        tile_is_walkable(self.tile_at(position))
    }

    pub fn load_persisted<I>(&mut self, records: I) -> LoadReport
    where
        I: IntoIterator<Item = PersistedChunk>,
    {
        self.ledger.load_persisted(records)
    }

    pub fn export_persisted(&self) -> Vec<PersistedChunk> {
        self.ledger.export_persisted()
    }
}

impl Walkability for WorldManager {
    fn is_walkable(&self, position: Vec2) -> bool {
        WorldManager::is_walkable(self, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::tile_descriptor;

    fn manager() -> WorldManager {
        WorldManager::new(WorldConfig::default())
    }

    #[test]
    fn unusable_geometry_is_clamped_instead_of_panicking() {
        let mut world = WorldManager::new(WorldConfig {
            chunk_size: 0,
            eviction_margin: -2,
            ..WorldConfig::default()
        });
        assert_eq!(world.geometry().chunk_size, 1);
        assert_eq!(world.config().eviction_margin, 0);

        world.ledger_mut().mark_explored(ChunkPos::new(1, 1));
        let report = world.update_streamed_chunks(Vec2::new(1.5, 1.5), 0);
        assert_eq!(report.loaded, 1);
        assert!(world.is_visible(ChunkPos::new(1, 1)));
        assert_eq!(report.unloaded, 0);
    }

    #[test]
    fn unexplored_chunks_are_never_streamed() {
        let mut world = manager();
        let report = world.update_streamed_chunks(Vec2::new(-30.0, -30.0), 3);
        assert_eq!(report.loaded, 0);
        assert_eq!(world.resident_count(), 0);
        assert!(world.take_events().is_empty());
        assert_eq!(world.ledger().generated_count(), 0);
    }

    #[test]
    fn explored_chunks_in_range_become_visible() {
        let mut world = manager();
        world.ledger_mut().mark_explored(ChunkPos::new(0, 0));
        world.ledger_mut().mark_explored(ChunkPos::new(-1, 2));
        world.ledger_mut().mark_explored(ChunkPos::new(10, 10));

        let report = world.update_streamed_chunks(Vec2::new(1.0, 1.0), 3);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.visible, 2);
        assert!(world.is_visible(ChunkPos::new(0, 0)));
        assert!(world.is_visible(ChunkPos::new(-1, 2)));
        assert!(!world.is_resident(ChunkPos::new(10, 10)));

        let events = world.take_events();
        assert_eq!(
            events,
            vec![
                ChunkEvent::Loaded(ChunkPos::new(-1, 2)),
                ChunkEvent::Loaded(ChunkPos::new(0, 0)),
                ChunkEvent::Shown(ChunkPos::new(-1, 2)),
                ChunkEvent::Shown(ChunkPos::new(0, 0)),
            ]
        );
    }

    #[test]
    fn out_of_range_chunks_hide_before_eviction() {
        let mut world = manager();
        world.ledger_mut().mark_explored(ChunkPos::new(0, 0));
        world.update_streamed_chunks(Vec2::new(10.0, 10.0), 3);
        world.take_events();

        // Four chunks away: hidden but still resident (margin 2).
        let report = world.update_streamed_chunks(Vec2::new(90.0, 10.0), 3);
        assert_eq!(report.unloaded, 0);
        assert!(world.is_resident(ChunkPos::new(0, 0)));
        assert!(!world.is_visible(ChunkPos::new(0, 0)));
        assert_eq!(world.take_events(), vec![ChunkEvent::Hidden(ChunkPos::new(0, 0))]);

        // Stepping back into range shows it again without a reload.
        world.update_streamed_chunks(Vec2::new(70.0, 10.0), 3);
        assert_eq!(world.take_events(), vec![ChunkEvent::Shown(ChunkPos::new(0, 0))]);

        // Six chunks away: evicted.
        let report = world.update_streamed_chunks(Vec2::new(130.0, 10.0), 3);
        assert_eq!(report.unloaded, 1);
        assert!(!world.is_resident(ChunkPos::new(0, 0)));
        assert_eq!(world.take_events(), vec![ChunkEvent::Unloaded(ChunkPos::new(0, 0))]);
        // The ledger keeps the tiles.
        assert!(world.ledger().is_generated(ChunkPos::new(0, 0)));
    }

    #[test]
    fn repeated_pass_is_quiet() {
        let mut world = manager();
        world.ledger_mut().mark_explored(ChunkPos::new(0, 0));
        world.update_streamed_chunks(Vec2::ZERO, 2);
        world.take_events();
        let report = world.update_streamed_chunks(Vec2::new(0.5, 0.5), 2);
        assert_eq!(report.loaded, 0);
        assert!(world.take_events().is_empty());
    }

    #[test]
    fn tile_queries_respect_exploration_gate() {
        let mut world = manager();
        let pos = ChunkPos::new(2, 2);
        let generated = world.ledger_mut().get_chunk(pos).clone();
        let probe = Vec2::new(45.5, 45.5);
        assert_eq!(world.tile_at(probe), TILE_UNEXPLORED);
        assert!(!world.is_walkable(probe));

        world.ledger_mut().mark_explored(pos);
        assert_eq!(world.tile_at(probe), generated.tile(5, 5));
    }

    #[test]
    fn ungenerated_explored_chunk_reads_as_sentinel() {
        let mut world = manager();
        world.ledger_mut().mark_explored(ChunkPos::new(-4, -4));
        assert_eq!(world.tile_at(Vec2::new(-70.0, -70.0)), TILE_UNEXPLORED);
        assert!(!Walkability::is_walkable(&world, Vec2::new(-70.0, -70.0)));
    }

    #[test]
    fn negative_tiles_map_to_last_cell_of_neighbour() {
        let mut world = manager();
        let pos = ChunkPos::new(-1, -1);
        world.ledger_mut().mark_explored(pos);
        let chunk = world.ledger_mut().get_chunk(pos).clone();
        assert_eq!(world.tile_at(Vec2::new(-0.5, -0.5)), chunk.tile(19, 19));
        assert_eq!(world.tile_at(Vec2::new(-19.5, -0.5)), chunk.tile(0, 19));
        assert!(tile_descriptor(world.tile_at(Vec2::new(-0.5, -0.5))).is_some());
    }

    #[test]
    fn resident_views_carry_tiles_and_visibility() {
        let mut world = manager();
        world.explore_around(Vec2::new(10.0, 10.0));
        world.update_streamed_chunks(Vec2::new(10.0, 10.0), 1);
        let views: Vec<_> = world.resident_chunks().collect();
        assert_eq!(views.len(), 9);
        assert!(views.iter().all(|v| v.visible));
        assert!(views.iter().all(|v| v.chunk.tiles().len() == 400));
    }

    #[test]
    fn small_initial_area_is_revealed_and_generated() {
        let mut world = WorldManager::new(WorldConfig {
            initial_area_chunks: 3,
            ..WorldConfig::default()
        });
        world.reveal_initial_area();
        assert_eq!(world.ledger().explored_count(), 9);
        assert_eq!(world.ledger().generated_count(), 9);
        assert_eq!(world.export_persisted().len(), 9);
    }
}
