//! Static tile descriptor table.

use serde::{Deserialize, Serialize};

/// Tile identifier stored in chunk grids.
pub type TileId = u8;

/// Grass (walkable).
pub const TILE_GRASS: TileId = 0;
/// Dirt (walkable).
pub const TILE_DIRT: TileId = 1;
/// Stone (walkable).
pub const TILE_STONE: TileId = 2;
/// Water (blocked).
pub const TILE_WATER: TileId = 3;
/// Wall rock (blocked).
pub const TILE_WALL: TileId = 4;
/// Sentinel for fog, unexplored or unknown cells. Never walkable.
pub const TILE_UNEXPLORED: TileId = 5;

/// Tile category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Open ground.
    Grass,
    /// Open ground.
    Dirt,
    /// Open rock floor.
    Stone,
    /// Impassable water.
    Water,
    /// Impassable rock wall.
    Wall,
    /// Fog of war.
    Unexplored,
}

/// Per-kind rendering and collision properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDescriptor {
    pub kind: TileKind,
    pub walkable: bool,
    /// Packed `0xRRGGBB` display colour.
    pub color: u32,
}

const DESCRIPTORS: [TileDescriptor; 6] = [
    TileDescriptor {
        kind: TileKind::Grass,
        walkable: true,
        color: 0x4a7c59,
    },
    TileDescriptor {
        kind: TileKind::Dirt,
        walkable: true,
        color: 0x8b7355,
    },
    TileDescriptor {
        kind: TileKind::Stone,
        walkable: true,
        color: 0x6b7280,
    },
    TileDescriptor {
        kind: TileKind::Water,
        walkable: false,
        color: 0x3b82f6,
    },
    TileDescriptor {
        kind: TileKind::Wall,
        walkable: false,
        color: 0x374151,
    },
    TileDescriptor {
        kind: TileKind::Unexplored,
        walkable: false,
        color: 0x1a1a1a,
    },
];

/// Look up the descriptor for `id`, `None` for ids outside the table.
pub fn tile_descriptor(id: TileId) -> Option<&'static TileDescriptor> {
    DESCRIPTORS.get(id as usize)
}

/// Whether a tile can be stood on. Unknown ids are blocked.
#[inline]
pub fn tile_is_walkable(id: TileId) -> bool {
    tile_descriptor(id).is_some_and(|desc| desc.walkable)
}
