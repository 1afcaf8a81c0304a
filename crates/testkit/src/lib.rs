#![warn(missing_docs)]
//! Deterministic testing surfaces: event logs, chunk digests, snapshots and metrics.

mod metrics;
mod micro_worldtest;
mod snapshot;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use wayfarer_core::SimTick;

pub use metrics::*;
pub use micro_worldtest::*;
pub use snapshot::*;

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Free-form payload for smoke tests.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// Digest of one generated chunk, used to pin terrain output across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkDigest {
    /// Chunk coordinates [x, y].
    pub chunk: [i32; 2],
    /// Walkable cells in the chunk.
    pub walkable: usize,
    /// Content hash (hex string).
    pub hash: String,
}

/// Writes chunk digests to JSON for CI artifacts.
pub struct ChunkDigestSink {
    file: File,
}

impl ChunkDigestSink {
    /// Create a sink pointed at the supplied path, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Persist the provided digests as pretty JSON.
    pub fn write(&mut self, digests: &[ChunkDigest]) -> Result<()> {
        let json = serde_json::to_string_pretty(digests)?;
        self.file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target").join("chunk-digests.json");
        let digests = vec![ChunkDigest {
            chunk: [0, -1],
            walkable: 312,
            hash: "deadbeef".into(),
        }];
        let mut sink = ChunkDigestSink::create(&path).expect("sink create");
        sink.write(&digests).expect("write succeeds");
        let contents = fs::read_to_string(&path).expect("file readable");
        assert!(contents.contains("deadbeef"));
        assert!(contents.contains("walkable"));
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut sink = JsonlSink::create(&path).unwrap();
        for (tick, kind) in [(0, "spawn"), (3, "chunk_loaded")] {
            sink.write(&EventRecord {
                tick: SimTick(tick),
                kind,
                payload: "{}",
            })
            .unwrap();
        }
        drop(sink);
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"kind\":\"chunk_loaded\""));
    }
}
