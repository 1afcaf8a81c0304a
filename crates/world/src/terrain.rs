//! Deterministic chunk terrain generation.
//!
//! Every cell is classified from three hashed-noise samples keyed by chunk and
//! world coordinates, so any cell can be computed independently of the rest
//! and regeneration is bit-identical.

use crate::chunk::Chunk;
use crate::coords::{ChunkGeometry, ChunkPos};
use crate::tile::{TileId, TILE_DIRT, TILE_GRASS, TILE_STONE, TILE_UNEXPLORED, TILE_WALL, TILE_WATER};
use glam::Vec2;
use tracing::{debug, instrument};
use wayfarer_core::WorldConfig;

const PRIME_CHUNK_X: u64 = 73_856_093;
const PRIME_CHUNK_Y: u64 = 19_349_663;
const PRIME_SEED: u64 = 83_492_791;
const PRIME_SALT: u64 = 50_331_653;

/// Upper bounds (exclusive) of the combined noise value for each tile kind,
/// in increasing order. Anything above the last bound is stone.
const CLASSIFICATION: [(f64, TileId); 4] = [
    (0.10, TILE_WATER),
    (0.15, TILE_WALL),
    (0.60, TILE_GRASS),
    (0.80, TILE_DIRT),
];

/// Stateless terrain generator.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    world_seed: u64,
    geometry: ChunkGeometry,
    initial_area_chunks: i32,
}

impl TerrainGenerator {
    /// Generator with the default chunk geometry and initial area.
    pub fn new(world_seed: u64) -> Self {
        Self::from_config(&WorldConfig {
            seed: world_seed,
            ..WorldConfig::default()
        })
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        let config = config.clone().sanitized();
        Self {
            world_seed: config.seed,
            geometry: ChunkGeometry::new(config.tile_size, config.chunk_size),
            initial_area_chunks: config.initial_area_chunks,
        }
    }

    pub fn seed(&self) -> u64 {
        self.world_seed
    }

    pub fn geometry(&self) -> ChunkGeometry {
        self.geometry
    }

    /// Generate the tiles of one chunk. Pure in `(seed, chunk_pos)`.
    #[instrument(skip(self), fields(chunk_pos = %chunk_pos, world_seed = self.world_seed))]
    pub fn generate_chunk(&self, chunk_pos: ChunkPos) -> Chunk {
        let size = self.geometry.chunk_size;
        let fogged_edges = !self.is_initial_chunk(chunk_pos);
        let origin = (
            chunk_pos.x as i64 * size as i64,
            chunk_pos.y as i64 * size as i64,
        );

        let mut tiles = Vec::with_capacity(self.geometry.cells_per_chunk());
        for local_y in 0..size {
            for local_x in 0..size {
                let is_edge = local_x == 0 || local_y == 0 || local_x == size - 1 || local_y == size - 1;
                if fogged_edges && is_edge {
                    tiles.push(TILE_UNEXPLORED);
                    continue;
                }
                let world_x = origin.0 + local_x as i64;
                let world_y = origin.1 + local_y as i64;
                tiles.push(classify(self.combined_noise(chunk_pos, world_x, world_y)));
            }
        }

        debug!("Terrain generation complete");
        Chunk::from_tiles(chunk_pos, size as usize, tiles)
            .unwrap_or_else(|| Chunk::unexplored(chunk_pos, size as usize))
    }

    /// Weighted blend of three independent samples, in `[0, 1)`.
    fn combined_noise(&self, chunk_pos: ChunkPos, world_x: i64, world_y: i64) -> f64 {
        let (cx, cy) = (chunk_pos.x as i64, chunk_pos.y as i64);
        let n1 = self.sample(cx, cy, world_x.wrapping_add(world_y));
        let n2 = self.sample(cx.wrapping_add(1), cy, world_x.wrapping_sub(world_y));
        let n3 = self.sample(cx, cy.wrapping_add(1), world_x.wrapping_mul(world_y));
        (n1 + n2 * 0.5 + n3 * 0.25) / 1.75
    }

    fn sample(&self, chunk_x: i64, chunk_y: i64, salt: i64) -> f64 {
        let mixed = (chunk_x as u64).wrapping_mul(PRIME_CHUNK_X)
            ^ (chunk_y as u64).wrapping_mul(PRIME_CHUNK_Y)
            ^ self.world_seed.wrapping_mul(PRIME_SEED)
            ^ (salt as u64).wrapping_mul(PRIME_SALT);
        unit_interval(avalanche(mixed))
    }

    /// Whether `chunk_pos` lies in the pre-revealed origin square.
    pub fn is_initial_chunk(&self, chunk_pos: ChunkPos) -> bool {
        let range = 0..self.initial_area_chunks;
        range.contains(&chunk_pos.x) && range.contains(&chunk_pos.y)
    }

    /// Whether a world position lies in the pre-revealed origin square.
    pub fn is_in_initial_area(&self, position: Vec2) -> bool {
        let extent = self.initial_area_chunks as f32
            * self.geometry.chunk_size as f32
            * self.geometry.tile_size;
        (0.0..extent).contains(&position.x) && (0.0..extent).contains(&position.y)
    }

    /// Chunks within Chebyshev `distance` of the chunk containing `center`.
    pub fn chunks_in_range(&self, center: Vec2, distance: i32) -> Vec<ChunkPos> {
        self.geometry.chunk_of(center).square(distance).collect()
    }
}

/// Generate a chunk with the default geometry.
pub fn generate_chunk(world_seed: u64, chunk_x: i32, chunk_y: i32) -> Chunk {
    TerrainGenerator::new(world_seed).generate_chunk(ChunkPos::new(chunk_x, chunk_y))
}

/// Map a combined noise value to a tile kind.
pub fn classify(noise: f64) -> TileId {
    CLASSIFICATION
        .iter()
        .find(|(bound, _)| noise < *bound)
        .map_or(TILE_STONE, |(_, tile)| *tile)
}

/// splitmix64 finalizer.
fn avalanche(mut h: u64) -> u64 {
    h ^= h >> 30;
    h = h.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}

fn unit_interval(h: u64) -> f64 {
    (h >> 11) as f64 / (1u64 << 53) as f64
}
