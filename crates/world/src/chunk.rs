use crate::coords::{ChunkPos, LocalTile};
use crate::tile::{TileId, TILE_UNEXPLORED};

/// Square grid of tile ids, stored row-major (`index = y * size + x`).
///
/// Chunks are immutable once built; the generator and persisted records are
/// the only producers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    position: ChunkPos,
    size: usize,
    tiles: Vec<TileId>,
}

impl Chunk {
    /// Build a chunk from a row-major tile buffer. Returns `None` if the buffer
    /// is not `size * size` long.
    pub fn from_tiles(position: ChunkPos, size: usize, tiles: Vec<TileId>) -> Option<Self> {
        if size == 0 || tiles.len() != size * size {
            return None;
        }
        Some(Self {
            position,
            size,
            tiles,
        })
    }

    /// Build a chunk from `tiles[y][x]` rows. Returns `None` unless the grid is
    /// square with side `size`.
    pub fn from_rows(position: ChunkPos, size: usize, rows: &[Vec<TileId>]) -> Option<Self> {
        if rows.len() != size || rows.iter().any(|row| row.len() != size) {
            return None;
        }
        Self::from_tiles(position, size, rows.concat())
    }

    /// A chunk filled with the fog sentinel.
    pub fn unexplored(position: ChunkPos, size: usize) -> Self {
        Self {
            position,
            size,
            tiles: vec![TILE_UNEXPLORED; size * size],
        }
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Tiles per side.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tile at a local cell.
    #[inline]
    pub fn tile(&self, x: usize, y: usize) -> TileId {
        debug_assert!(x < self.size && y < self.size);
        self.tiles[y * self.size + x]
    }

    /// Tile at a local cell produced by `ChunkGeometry::locate`.
    #[inline]
    pub fn tile_local(&self, local: LocalTile) -> TileId {
        self.tile(local.x, local.y)
    }

    /// Borrow the raw row-major tile buffer.
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Copy out as `tiles[y][x]` rows.
    pub fn rows(&self) -> Vec<Vec<TileId>> {
        self.tiles.chunks(self.size).map(<[TileId]>::to_vec).collect()
    }

    /// Hex blake3 digest of position and tile content.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.position.x.to_le_bytes());
        hasher.update(&self.position.y.to_le_bytes());
        hasher.update(&(self.size as u32).to_le_bytes());
        hasher.update(&self.tiles);
        hasher.finalize().to_hex().to_string()
    }
}
