//! Shared exploration ledger.
//!
//! Holds the growth-only explored set and the process-lifetime chunk cache.
//! Marking is a set union, so markings from any number of observers commute.

use crate::chunk::Chunk;
use crate::coords::{ChunkKey, ChunkPos};
use crate::persist::PersistedChunk;
use crate::terrain::TerrainGenerator;
use glam::Vec2;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Outcome of applying persisted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records whose tiles were cached.
    pub cached: usize,
    /// Records for coordinates already cached; left untouched.
    pub already_cached: usize,
    /// Records with malformed tile grids. Their coordinates stay explored.
    pub rejected: usize,
}

/// Explored set plus generated-chunk cache.
pub struct ExplorationLedger {
    generator: TerrainGenerator,
    explored: BTreeSet<ChunkKey>,
    chunks: BTreeMap<ChunkKey, Chunk>,
}

impl ExplorationLedger {
    pub fn new(generator: TerrainGenerator) -> Self {
        Self {
            generator,
            explored: BTreeSet::new(),
            chunks: BTreeMap::new(),
        }
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// Mark a chunk explored. Returns true if it was not explored before.
    pub fn mark_explored(&mut self, pos: ChunkPos) -> bool {
        self.explored.insert(ChunkKey::from_pos(pos))
    }

    /// Mark many chunks explored. Returns how many were new.
    pub fn mark_all<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = ChunkPos>,
    {
        positions
            .into_iter()
            .filter(|&pos| self.mark_explored(pos))
            .count()
    }

    pub fn is_explored(&self, pos: ChunkPos) -> bool {
        self.explored.contains(&ChunkKey::from_pos(pos))
    }

    /// Mark every chunk within Chebyshev `radius` of the chunk containing
    /// `position`. Returns how many were new.
    pub fn mark_chunks_around_position(&mut self, position: Vec2, radius: i32) -> usize {
        let center = self.generator.geometry().chunk_of(position);
        let newly = self.mark_all(center.square(radius));
        if newly > 0 {
            debug!(center = %center, radius, newly, "Explored chunks around position");
        }
        newly
    }

    /// Cached chunk, generating and caching it on a miss.
    pub fn get_chunk(&mut self, pos: ChunkPos) -> &Chunk {
        let generator = &self.generator;
        self.chunks
            .entry(ChunkKey::from_pos(pos))
            .or_insert_with(|| generator.generate_chunk(pos))
    }

    /// Cached chunk without generating.
    pub fn cached_chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&ChunkKey::from_pos(pos))
    }

    pub fn is_generated(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&ChunkKey::from_pos(pos))
    }

    /// Cache an externally produced chunk. An existing entry wins.
    /// Returns true if the chunk was inserted.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> bool {
        let key = ChunkKey::from_pos(chunk.position());
        if self.chunks.contains_key(&key) {
            return false;
        }
        self.chunks.insert(key, chunk);
        true
    }

    /// Apply persisted records: every coordinate becomes explored and valid
    /// grids are cached so they are never regenerated.
    pub fn load_persisted<I>(&mut self, records: I) -> LoadReport
    where
        I: IntoIterator<Item = PersistedChunk>,
    {
        let chunk_size = self.generator.geometry().chunk_size as usize;
        let mut report = LoadReport::default();
        for record in records {
            let pos = record.position();
            self.mark_explored(pos);
            if self.is_generated(pos) {
                report.already_cached += 1;
                continue;
            }
            match record.to_chunk(chunk_size) {
                Ok(chunk) => {
                    self.insert_chunk(chunk);
                    report.cached += 1;
                }
                Err(err) => {
                    warn!(%err, "Skipping malformed persisted chunk");
                    report.rejected += 1;
                }
            }
        }
        debug!(?report, explored = self.explored.len(), "Loaded persisted exploration");
        report
    }

    /// Records for every chunk that is both explored and generated, in
    /// coordinate order.
    pub fn export_persisted(&self) -> Vec<PersistedChunk> {
        self.explored
            .iter()
            .filter_map(|key| self.chunks.get(key))
            .map(PersistedChunk::from_chunk)
            .collect()
    }

    /// Copy of the explored set, in coordinate order.
    pub fn explored_snapshot(&self) -> Vec<ChunkPos> {
        self.explored.iter().map(|key| key.pos()).collect()
    }

    pub fn explored_count(&self) -> usize {
        self.explored.len()
    }

    pub fn generated_count(&self) -> usize {
        self.chunks.len()
    }
}
