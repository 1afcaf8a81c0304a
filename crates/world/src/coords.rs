//! World, tile and chunk coordinate mapping.
//!
//! All conversions use floored division so negative positions land in the
//! chunk to their lower-left, never in chunk zero.

use glam::{IVec2, Vec2};
use std::fmt;

/// Chunk coordinate in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then y).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `max(|dx|, |dy|)` between two chunk coordinates.
    pub fn chebyshev(self, other: ChunkPos) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }

    /// Offset by whole chunks.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }

    /// Every chunk within Chebyshev distance `radius`, row by row from the
    /// lowest y. Negative radii yield nothing.
    pub fn square(self, radius: i32) -> impl Iterator<Item = ChunkPos> {
        (-radius..=radius)
            .flat_map(move |dy| (-radius..=radius).map(move |dx| self.offset(dx, dy)))
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Map key for chunk-indexed tables.
///
/// Packs both coordinates into one `u64` (x in the high half). Callers only go
/// through `from_pos`/`pos`, so the encoding can change freely. The packing
/// keeps the signed ordering of `x` then `y`, matching `ChunkPos`'s `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(u64);

impl ChunkKey {
    const SIGN_FLIP: u32 = 0x8000_0000;

    pub fn from_pos(pos: ChunkPos) -> Self {
        let hi = (pos.x as u32 ^ Self::SIGN_FLIP) as u64;
        let lo = (pos.y as u32 ^ Self::SIGN_FLIP) as u64;
        Self((hi << 32) | lo)
    }

    pub fn pos(self) -> ChunkPos {
        let x = ((self.0 >> 32) as u32 ^ Self::SIGN_FLIP) as i32;
        let y = (self.0 as u32 ^ Self::SIGN_FLIP) as i32;
        ChunkPos::new(x, y)
    }
}

impl From<ChunkPos> for ChunkKey {
    fn from(pos: ChunkPos) -> Self {
        Self::from_pos(pos)
    }
}

/// Cell inside a chunk, both components in `[0, chunk_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalTile {
    pub x: usize,
    pub y: usize,
}

/// Tile and chunk dimensions used for every coordinate conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkGeometry {
    /// World units per tile.
    pub tile_size: f32,
    /// Tiles per chunk side.
    pub chunk_size: i32,
}

impl Default for ChunkGeometry {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            chunk_size: 20,
        }
    }
}

impl ChunkGeometry {
    pub fn new(tile_size: f32, chunk_size: i32) -> Self {
        debug_assert!(tile_size > 0.0, "tile size must be positive");
        debug_assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            tile_size,
            chunk_size,
        }
    }

    /// Number of cells in one chunk.
    pub fn cells_per_chunk(&self) -> usize {
        (self.chunk_size as usize) * (self.chunk_size as usize)
    }

    /// Global tile coordinate containing `position`.
    pub fn tile_of(&self, position: Vec2) -> IVec2 {
        let scaled = (position / self.tile_size).floor();
        IVec2::new(scaled.x as i32, scaled.y as i32)
    }

    /// Chunk owning a global tile coordinate.
    pub fn chunk_of_tile(&self, tile: IVec2) -> ChunkPos {
        ChunkPos::new(
            tile.x.div_euclid(self.chunk_size),
            tile.y.div_euclid(self.chunk_size),
        )
    }

    /// Chunk containing `position`.
    pub fn chunk_of(&self, position: Vec2) -> ChunkPos {
        self.chunk_of_tile(self.tile_of(position))
    }

    /// Chunk and in-chunk cell containing `position`.
    pub fn locate(&self, position: Vec2) -> (ChunkPos, LocalTile) {
        let tile = self.tile_of(position);
        let local = LocalTile {
            x: tile.x.rem_euclid(self.chunk_size) as usize,
            y: tile.y.rem_euclid(self.chunk_size) as usize,
        };
        (self.chunk_of_tile(tile), local)
    }

    /// Global tile coordinate of a chunk's (0, 0) cell.
    pub fn chunk_origin_tile(&self, pos: ChunkPos) -> IVec2 {
        IVec2::new(
            pos.x.wrapping_mul(self.chunk_size),
            pos.y.wrapping_mul(self.chunk_size),
        )
    }

    /// World position of a chunk's lower corner.
    pub fn chunk_origin(&self, pos: ChunkPos) -> Vec2 {
        let span = self.chunk_size as f32 * self.tile_size;
        Vec2::new(pos.x as f32 * span, pos.y as f32 * span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_positions_wrap_into_previous_chunk() {
        let geometry = ChunkGeometry::default();
        let (chunk, local) = geometry.locate(Vec2::new(-0.5, -0.5));
        assert_eq!(chunk, ChunkPos::new(-1, -1));
        assert_eq!(local, LocalTile { x: 19, y: 19 });

        let (chunk, local) = geometry.locate(Vec2::new(-20.0, 0.0));
        assert_eq!(chunk, ChunkPos::new(-1, 0));
        assert_eq!(local, LocalTile { x: 0, y: 0 });

        let (chunk, local) = geometry.locate(Vec2::new(-20.01, 19.99));
        assert_eq!(chunk, ChunkPos::new(-2, 0));
        assert_eq!(local, LocalTile { x: 19, y: 19 });
    }

    #[test]
    fn tile_size_scales_mapping() {
        let geometry = ChunkGeometry::new(2.0, 10);
        assert_eq!(geometry.tile_of(Vec2::new(3.9, -0.1)), IVec2::new(1, -1));
        assert_eq!(geometry.chunk_of(Vec2::new(20.0, -20.0)), ChunkPos::new(1, -1));
        assert_eq!(geometry.chunk_origin(ChunkPos::new(-1, 2)), Vec2::new(-20.0, 40.0));
    }

    #[test]
    fn chunk_key_roundtrips_extremes() {
        for pos in [
            ChunkPos::new(0, 0),
            ChunkPos::new(-1, -1),
            ChunkPos::new(i32::MIN, i32::MAX),
            ChunkPos::new(i32::MAX, i32::MIN),
        ] {
            assert_eq!(ChunkKey::from_pos(pos).pos(), pos);
        }
    }

    #[test]
    fn chunk_key_order_matches_chunk_pos_order() {
        let mut positions = vec![
            ChunkPos::new(3, -2),
            ChunkPos::new(-5, 7),
            ChunkPos::new(0, 0),
            ChunkPos::new(-5, -7),
            ChunkPos::new(3, 9),
        ];
        let mut keys: Vec<ChunkKey> = positions.iter().copied().map(ChunkKey::from).collect();
        positions.sort();
        keys.sort();
        let decoded: Vec<ChunkPos> = keys.into_iter().map(ChunkKey::pos).collect();
        assert_eq!(decoded, positions);
    }

    #[test]
    fn square_covers_chebyshev_neighbourhood() {
        let center = ChunkPos::new(-1, 4);
        let cells: Vec<_> = center.square(3).collect();
        assert_eq!(cells.len(), 49);
        assert!(cells.iter().all(|c| c.chebyshev(center) <= 3));
        assert_eq!(center.square(-1).count(), 0);
    }
}
