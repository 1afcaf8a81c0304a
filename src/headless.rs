//! Windowless fixed-step runner.
//!
//! Drives a [`Simulation`] from an optional input script, keeps exploration
//! synced to a chunk store in the background, and can log outbound relay
//! traffic or replay inbound relay frames from disk.

use crate::input::TickInput;
use crate::scripted_input::ScriptedInputPlayer;
use crate::simulation::{SimEvent, Simulation};
use crate::sync::{ExplorationSync, SyncReport};
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wayfarer_core::SimConfig;
use wayfarer_net::{
    decode_envelope, encode_client_message, server_message_from_envelope, ClientMessage,
    ServerMessage,
};
use wayfarer_world::{Character, ChunkStore, CombatStats, FileChunkStore, MemoryChunkStore};

/// Fixed simulation step in seconds.
pub const TICK_DT: f32 = 0.05;
const TICK_MS: u64 = 50;
/// Ticks run when neither a tick limit nor a script bounds the run.
pub const DEFAULT_MAX_TICKS: u64 = 600;

pub struct HeadlessConfig {
    pub sim: SimConfig,
    pub player_name: String,
    /// Spawn without a character.
    pub formless: bool,
    pub scripted_input: Option<PathBuf>,
    /// Chunk store file; an in-memory store is used when absent.
    pub store: Option<PathBuf>,
    /// Append every outbound relay frame to this file.
    pub net_log: Option<PathBuf>,
    /// Inbound relay frames, one envelope per line, applied once the run
    /// clock reaches their timestamp (milliseconds since start).
    pub net_replay: Option<PathBuf>,
    pub max_ticks: Option<u64>,
    pub exit_when_script_finished: bool,
    /// Pace ticks at wall-clock speed instead of running flat out.
    pub realtime: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            player_name: "Wayfarer".to_string(),
            formless: false,
            scripted_input: None,
            store: None,
            net_log: None,
            net_replay: None,
            max_ticks: None,
            exit_when_script_finished: false,
            realtime: false,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSummary {
    pub ticks: u64,
    pub explored: usize,
    pub resident: usize,
    pub enemies_defeated: usize,
    pub player_alive: bool,
    pub messages_sent: usize,
    pub messages_applied: usize,
    pub sync: SyncReport,
}

pub async fn run(cfg: HeadlessConfig) -> Result<HeadlessSummary> {
    let store = open_store(cfg.store.as_deref())?;
    let mut script = cfg
        .scripted_input
        .as_deref()
        .map(ScriptedInputPlayer::from_path)
        .transpose()?;
    let mut replay = match cfg.net_replay.as_deref() {
        Some(path) => InboundReplay::from_path(path)?,
        None => InboundReplay::default(),
    };
    let mut net_log = cfg.net_log.as_deref().map(NetLog::create).transpose()?;

    let max_ticks = match (cfg.max_ticks, &script) {
        (Some(limit), _) => limit,
        (None, Some(_)) if cfg.exit_when_script_finished => u64::MAX,
        (None, _) => DEFAULT_MAX_TICKS,
    };

    let period = Duration::from_secs(cfg.sim.sync.exploration_sync_secs);
    let mut sync = ExplorationSync::start(store, period);
    sync.wait_for_load().await;

    let character = (!cfg.formless).then(|| Character::new(1, CombatStats::default()));
    let mut sim = Simulation::new(cfg.sim, &cfg.player_name, character);
    info!(max_ticks, realtime = cfg.realtime, "Headless run starting");

    let mut pacing = cfg.realtime.then(|| {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    let mut enemies_defeated = 0;
    let mut messages_sent = 0;
    let mut messages_applied = 0;
    let mut ticks = 0;
    while ticks < max_ticks {
        sync.drain_loaded(&mut sim);
        for msg in replay.due(ticks * TICK_MS) {
            sim.apply_remote(msg);
            messages_applied += 1;
        }

        let input = match script.as_mut() {
            Some(player) => player.advance(TICK_DT, sim.player_position()),
            None => TickInput::default(),
        };
        sim.update(TICK_DT, &input);
        ticks += 1;

        for event in sim.take_events() {
            match &event {
                SimEvent::EnemyDefeated { .. } => enemies_defeated += 1,
                SimEvent::PlayerDamaged { killed: true, .. } => {
                    info!(tick = ticks, "Player died");
                }
                _ => {}
            }
            debug!(tick = ticks, ?event, "Simulation event");
        }

        for msg in sim.drain_outbound() {
            messages_sent += 1;
            if let Some(log) = net_log.as_mut() {
                log.write(&msg, ticks * TICK_MS)?;
            }
        }

        sync.poll_snapshot(&sim);

        if cfg.exit_when_script_finished && script.as_ref().is_some_and(|s| s.is_finished()) {
            info!(tick = ticks, "Input script finished");
            break;
        }

        match pacing.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }

    if let Some(log) = net_log.as_mut() {
        log.flush()?;
    }
    sync.flush(&sim);
    let sync_report = sync.shutdown().await?;

    let summary = HeadlessSummary {
        ticks,
        explored: sim.world().ledger().explored_count(),
        resident: sim.world().resident_count(),
        enemies_defeated,
        player_alive: sim.local_player().is_some_and(|p| !p.is_dead()),
        messages_sent,
        messages_applied,
        sync: sync_report,
    };
    info!(?summary, "Headless run complete");
    Ok(summary)
}

fn open_store(path: Option<&Path>) -> Result<Arc<dyn ChunkStore>> {
    let store: Arc<dyn ChunkStore> = match path {
        Some(path) => {
            info!(path = %path.display(), "Using file chunk store");
            Arc::new(FileChunkStore::new(path)?)
        }
        None => Arc::new(MemoryChunkStore::new()),
    };
    Ok(store)
}

/// Outbound frames written one per line.
struct NetLog {
    out: BufWriter<File>,
}

impl NetLog {
    fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create net log {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    fn write(&mut self, msg: &ClientMessage, timestamp: u64) -> Result<()> {
        match encode_client_message(msg, timestamp, None) {
            Ok(frame) => {
                self.out.write_all(frame.as_bytes())?;
                self.out.write_all(b"\n")?;
            }
            Err(err) => warn!(%err, kind = ?msg.kind(), "Dropping unencodable message"),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush net log")
    }
}

/// Inbound frames ordered by timestamp.
#[derive(Default)]
struct InboundReplay {
    frames: VecDeque<(u64, ServerMessage)>,
}

impl InboundReplay {
    fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read net replay {}", path.display()))?;
        Ok(Self::from_lines(&contents))
    }

    /// Undecodable lines are skipped with a warning.
    fn from_lines(contents: &str) -> Self {
        let mut frames = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let decoded = decode_envelope(line).and_then(|envelope| {
                let timestamp = envelope.timestamp;
                server_message_from_envelope(envelope).map(|msg| (timestamp, msg))
            });
            match decoded {
                Ok(frame) => frames.push(frame),
                Err(err) => warn!(line = index + 1, %err, "Skipping relay frame"),
            }
        }
        frames.sort_by_key(|(timestamp, _)| *timestamp);
        Self {
            frames: frames.into(),
        }
    }

    /// Frames whose timestamp is at or before `now_ms`.
    fn due(&mut self, now_ms: u64) -> Vec<ServerMessage> {
        let mut due = Vec::new();
        while self.frames.front().is_some_and(|(t, _)| *t <= now_ms) {
            if let Some((_, msg)) = self.frames.pop_front() {
                due.push(msg);
            }
        }
        due
    }
}
