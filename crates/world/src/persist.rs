//! Persisted exploration records and reference chunk stores.
//!
//! The wire shape is `{ "chunks": [{ "chunkX", "chunkY", "tiles": [[..]] }] }`.
//! `FileChunkStore` keeps the same payload in a single file guarded by a
//! magic/version/CRC32 header with a zstd-compressed bincode body.

use crate::chunk::Chunk;
use crate::coords::ChunkPos;
use crate::tile::{tile_descriptor, TileId};
use anyhow::{Context, Result};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Magic number for chunk store files ("WFCK").
const STORE_MAGIC: u32 = 0x5746_434B;

/// Current chunk store format version.
const STORE_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

/// One explored chunk as exchanged with persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedChunk {
    pub chunk_x: i32,
    pub chunk_y: i32,
    /// `tiles[y][x]`.
    pub tiles: Vec<Vec<TileId>>,
}

impl PersistedChunk {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let pos = chunk.position();
        Self {
            chunk_x: pos.x,
            chunk_y: pos.y,
            tiles: chunk.rows(),
        }
    }

    pub fn position(&self) -> ChunkPos {
        ChunkPos::new(self.chunk_x, self.chunk_y)
    }

    /// Check the grid shape and tile ids, then build the chunk.
    pub fn to_chunk(&self, chunk_size: usize) -> Result<Chunk, PayloadError> {
        let chunk = self.position();
        if self.tiles.len() != chunk_size {
            return Err(PayloadError::RowCount {
                chunk,
                expected: chunk_size,
                actual: self.tiles.len(),
            });
        }
        for (row, cells) in self.tiles.iter().enumerate() {
            if cells.len() != chunk_size {
                return Err(PayloadError::RowLength {
                    chunk,
                    row,
                    expected: chunk_size,
                    actual: cells.len(),
                });
            }
            if let Some(&tile) = cells.iter().find(|&&t| tile_descriptor(t).is_none()) {
                return Err(PayloadError::UnknownTile { chunk, tile });
            }
        }
        Chunk::from_rows(chunk, chunk_size, &self.tiles).ok_or(PayloadError::RowCount {
            chunk,
            expected: chunk_size,
            actual: self.tiles.len(),
        })
    }
}

/// Body of a load or sync exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub chunks: Vec<PersistedChunk>,
}

impl ChunkPayload {
    pub fn new(chunks: Vec<PersistedChunk>) -> Self {
        Self { chunks }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to encode chunk payload")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to decode chunk payload")
    }
}

/// Reasons a persisted chunk is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("chunk {chunk}: expected {expected} rows, got {actual}")]
    RowCount {
        chunk: ChunkPos,
        expected: usize,
        actual: usize,
    },
    #[error("chunk {chunk}: row {row} has {actual} cells, expected {expected}")]
    RowLength {
        chunk: ChunkPos,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("chunk {chunk}: unknown tile id {tile}")]
    UnknownTile { chunk: ChunkPos, tile: TileId },
}

/// External persistence for explored chunks.
///
/// Implementations are called from blocking worker tasks, never from the tick.
pub trait ChunkStore: Send + Sync {
    /// Every stored chunk.
    fn load(&self) -> Result<ChunkPayload>;

    /// Merge `payload` into the store, last write wins per coordinate.
    /// Returns the number of chunks stored afterwards.
    fn merge(&self, payload: ChunkPayload) -> Result<usize>;
}

fn merge_into(stored: &mut BTreeMap<ChunkPos, PersistedChunk>, payload: ChunkPayload) {
    for chunk in payload.chunks {
        stored.insert(chunk.position(), chunk);
    }
}

/// In-process store with the relay endpoint's merge semantics.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: Mutex<BTreeMap<ChunkPos, PersistedChunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<ChunkPos, PersistedChunk>>> {
        self.chunks
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory chunk store lock poisoned"))
    }
}

impl ChunkStore for MemoryChunkStore {
    fn load(&self) -> Result<ChunkPayload> {
        let chunks = self.guard()?;
        Ok(ChunkPayload::new(chunks.values().cloned().collect()))
    }

    fn merge(&self, payload: ChunkPayload) -> Result<usize> {
        let mut chunks = self.guard()?;
        merge_into(&mut chunks, payload);
        Ok(chunks.len())
    }
}

/// Store file header.
#[derive(Debug, Clone)]
struct StoreHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl StoreHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: STORE_MAGIC,
            version: STORE_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.crc32.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            anyhow::bail!("Chunk store header too short");
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != STORE_MAGIC {
            anyhow::bail!(
                "Invalid chunk store magic: expected 0x{:08X}, got 0x{:08X}",
                STORE_MAGIC,
                magic
            );
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != STORE_VERSION {
            anyhow::bail!("Unsupported chunk store version {}", version);
        }
        let crc32 = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        Ok(Self {
            magic,
            version,
            crc32,
            payload_len,
        })
    }
}

/// Single-file store on local disk.
pub struct FileChunkStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileChunkStore {
    /// Store backed by `path`. Parent directories are created on demand.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create chunk store directory")?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<ChunkPos, PersistedChunk>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let mut file = File::open(&self.path).context("Failed to open chunk store")?;

        let mut header_bytes = [0u8; HEADER_LEN];
        file.read_exact(&mut header_bytes)
            .context("Failed to read chunk store header")?;
        let header = StoreHeader::from_bytes(&header_bytes)?;

        let mut compressed = vec![0u8; header.payload_len as usize];
        file.read_exact(&mut compressed)
            .context("Failed to read chunk store payload")?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let computed_crc = hasher.finalize();
        if computed_crc != header.crc32 {
            anyhow::bail!(
                "CRC32 mismatch: expected {:08X}, got {:08X}",
                header.crc32,
                computed_crc
            );
        }

        let decompressed =
            zstd::decode_all(&compressed[..]).context("Failed to decompress chunk store")?;
        let payload: ChunkPayload =
            bincode::deserialize(&decompressed).context("Failed to deserialize chunk store")?;

        let mut stored = BTreeMap::new();
        merge_into(&mut stored, payload);
        Ok(stored)
    }

    fn write_all(&self, stored: &BTreeMap<ChunkPos, PersistedChunk>) -> Result<()> {
        let payload = ChunkPayload::new(stored.values().cloned().collect());
        let serialized = bincode::serialize(&payload).context("Failed to serialize chunk store")?;
        let compressed =
            zstd::encode_all(&serialized[..], 3).context("Failed to compress chunk store")?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let header = StoreHeader::new(hasher.finalize(), compressed.len() as u32);

        // Write beside the target and rename so a crash never leaves a torn file.
        let staging = self.path.with_extension("tmp");
        {
            let mut file = File::create(&staging).context("Failed to create chunk store")?;
            file.write_all(&header.to_bytes())
                .context("Failed to write header")?;
            file.write_all(&compressed)
                .context("Failed to write payload")?;
        }
        fs::rename(&staging, &self.path).context("Failed to replace chunk store")?;
        Ok(())
    }
}

impl ChunkStore for FileChunkStore {
    fn load(&self) -> Result<ChunkPayload> {
        let stored = self.read_all()?;
        debug!(chunks = stored.len(), path = %self.path.display(), "Loaded chunk store");
        Ok(ChunkPayload::new(stored.into_values().collect()))
    }

    fn merge(&self, payload: ChunkPayload) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Chunk store write lock poisoned"))?;
        let mut stored = self.read_all()?;
        merge_into(&mut stored, payload);
        self.write_all(&stored)?;
        debug!(chunks = stored.len(), path = %self.path.display(), "Merged chunk store");
        Ok(stored.len())
    }
}
