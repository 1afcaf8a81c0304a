//! Tile world: deterministic terrain, the shared exploration ledger, chunk
//! streaming, entities and enemy AI.

mod ai;
mod chunk;
mod coords;
mod entity;
mod exploration;
mod persist;
mod streaming;
mod terrain;
mod tile;

pub use ai::*;
pub use chunk::*;
pub use coords::*;
pub use entity::*;
pub use exploration::*;
pub use persist::*;
pub use streaming::*;
pub use terrain::*;
pub use tile::*;
