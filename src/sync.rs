//! Background exploration persistence.
//!
//! A load task reads the store once at startup and hands the payload to the
//! tick through a channel. A timer task raises a flag every sync period; the
//! tick notices it, takes a momentary snapshot and queues it for the writer
//! task, which merges it into the store on a blocking worker. The tick never
//! waits on the store.

use crate::simulation::Simulation;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wayfarer_world::{ChunkPayload, ChunkStore, LoadReport};

/// Totals collected by the writer task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Snapshots merged into the store.
    pub uploads: usize,
    /// Snapshots the store rejected.
    pub failures: usize,
    /// Chunks sent across all successful uploads.
    pub chunks_sent: usize,
    /// Chunks held by the store after the last successful upload.
    pub stored: usize,
}

/// Handle to the load, timer and writer tasks.
pub struct ExplorationSync {
    uploads: mpsc::UnboundedSender<ChunkPayload>,
    loaded: mpsc::UnboundedReceiver<ChunkPayload>,
    due: Arc<AtomicBool>,
    loader: Option<JoinHandle<()>>,
    timer: JoinHandle<()>,
    writer: JoinHandle<SyncReport>,
}

impl ExplorationSync {
    /// Spawn the tasks on the current tokio runtime. Snapshots are due every
    /// `period`.
    pub fn start(store: Arc<dyn ChunkStore>, period: Duration) -> Self {
        let (loaded_tx, loaded) = mpsc::unbounded_channel();
        let load_store = Arc::clone(&store);
        let loader = tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || load_store.load()).await {
                Ok(Ok(payload)) => {
                    info!(chunks = payload.chunks.len(), "Loaded persisted exploration");
                    if loaded_tx.send(payload).is_err() {
                        debug!("Simulation gone before persisted exploration arrived");
                    }
                }
                Ok(Err(err)) => warn!("Failed to load persisted exploration: {err:#}"),
                Err(err) => warn!("Exploration load task failed: {err}"),
            }
        });

        let due = Arc::new(AtomicBool::new(false));
        let timer_due = Arc::clone(&due);
        let period = period.max(Duration::from_millis(1));
        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                timer_due.store(true, Ordering::Release);
            }
        });

        let (uploads, queue) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(store, queue));

        Self {
            uploads,
            loaded,
            due,
            loader: Some(loader),
            timer,
            writer,
        }
    }

    /// Wait until the startup load has finished (successfully or not).
    pub async fn wait_for_load(&mut self) {
        if let Some(loader) = self.loader.take() {
            if let Err(err) = loader.await {
                warn!("Exploration load task panicked: {err}");
            }
        }
    }

    /// Apply any persisted exploration that has arrived. Call at tick start.
    pub fn drain_loaded(&mut self, sim: &mut Simulation) -> Option<LoadReport> {
        let mut applied = None;
        while let Ok(payload) = self.loaded.try_recv() {
            applied = Some(sim.load_persisted(payload.chunks));
        }
        applied
    }

    /// Queue a snapshot if the timer has fired since the last call.
    /// Returns true if one was queued.
    pub fn poll_snapshot(&mut self, sim: &Simulation) -> bool {
        if !self.due.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.flush(sim)
    }

    /// Queue a snapshot now.
    pub fn flush(&self, sim: &Simulation) -> bool {
        let payload = ChunkPayload::new(sim.export_persisted());
        if payload.is_empty() {
            debug!("Nothing explored yet, skipping sync");
            return false;
        }
        debug!(chunks = payload.chunks.len(), "Queued exploration snapshot");
        if self.uploads.send(payload).is_err() {
            warn!("Exploration writer stopped, snapshot dropped");
            return false;
        }
        true
    }

    /// Stop the timer, let the writer drain its queue and collect its totals.
    pub async fn shutdown(self) -> Result<SyncReport> {
        let Self {
            uploads,
            loader,
            timer,
            writer,
            ..
        } = self;
        timer.abort();
        if let Some(loader) = loader {
            loader.abort();
        }
        drop(uploads);
        let report = writer.await.context("Exploration writer task failed")?;
        info!(?report, "Exploration sync stopped");
        Ok(report)
    }
}

async fn run_writer(
    store: Arc<dyn ChunkStore>,
    mut queue: mpsc::UnboundedReceiver<ChunkPayload>,
) -> SyncReport {
    let mut report = SyncReport::default();
    while let Some(payload) = queue.recv().await {
        let chunks = payload.chunks.len();
        let store = Arc::clone(&store);
        match tokio::task::spawn_blocking(move || store.merge(payload)).await {
            Ok(Ok(stored)) => {
                report.uploads += 1;
                report.chunks_sent += chunks;
                report.stored = stored;
                debug!(chunks, stored, "Synced exploration");
            }
            Ok(Err(err)) => {
                report.failures += 1;
                warn!("Exploration sync failed, retrying next period: {err:#}");
            }
            Err(err) => {
                report.failures += 1;
                warn!("Exploration sync task failed: {err}");
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::SimConfig;
    use wayfarer_world::{ChunkPos, MemoryChunkStore, PersistedChunk, TILE_STONE};

    const LONG: Duration = Duration::from_secs(3600);

    fn small_sim() -> Simulation {
        let mut config = SimConfig::default();
        config.world.initial_area_chunks = 3;
        Simulation::new(config, "Hero", None)
    }

    struct BrokenStore;

    impl ChunkStore for BrokenStore {
        fn load(&self) -> Result<ChunkPayload> {
            anyhow::bail!("store offline")
        }

        fn merge(&self, _payload: ChunkPayload) -> Result<usize> {
            anyhow::bail!("store offline")
        }
    }

    #[tokio::test]
    async fn persisted_chunks_reach_the_ledger() {
        let store = Arc::new(MemoryChunkStore::new());
        store
            .merge(ChunkPayload::new(vec![PersistedChunk {
                chunk_x: 70,
                chunk_y: -3,
                tiles: vec![vec![TILE_STONE; 20]; 20],
            }]))
            .unwrap();

        let mut sim = small_sim();
        let mut sync = ExplorationSync::start(store, LONG);
        sync.wait_for_load().await;
        let report = sync.drain_loaded(&mut sim).unwrap();
        assert_eq!(report.cached, 1);
        assert!(sim.world().ledger().is_explored(ChunkPos::new(70, -3)));
        assert!(sync.drain_loaded(&mut sim).is_none());
        sync.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn flush_merges_snapshot_on_shutdown() {
        let store = Arc::new(MemoryChunkStore::new());
        let sim = small_sim();
        let sync = ExplorationSync::start(store.clone(), LONG);
        assert!(sync.flush(&sim));
        assert!(sync.flush(&sim));

        let report = sync.shutdown().await.unwrap();
        assert_eq!(report.uploads, 2);
        assert_eq!(report.failures, 0);
        assert_eq!(report.stored, 9);
        assert_eq!(store.load().unwrap().chunks.len(), 9);
    }

    #[tokio::test]
    async fn timer_marks_snapshot_due() {
        let store = Arc::new(MemoryChunkStore::new());
        let sim = small_sim();
        let mut sync = ExplorationSync::start(store, Duration::from_millis(20));
        assert!(!sync.poll_snapshot(&sim));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(sync.poll_snapshot(&sim));
        assert!(!sync.poll_snapshot(&sim));

        let report = sync.shutdown().await.unwrap();
        assert_eq!(report.uploads, 1);
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_fatal() {
        let mut sim = small_sim();
        let mut sync = ExplorationSync::start(Arc::new(BrokenStore), LONG);
        sync.wait_for_load().await;
        assert!(sync.drain_loaded(&mut sim).is_none());
        assert!(sync.flush(&sim));

        let report = sync.shutdown().await.unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.uploads, 0);
    }
}
