//! Micro-worldtest harness for deterministic, tick-based tests.
//!
//! A micro-worldtest steps a tiny simulation for a fixed number of ticks and
//! captures selected state each tick. The frames are returned for direct
//! assertions and, when a path is configured, compared against a golden JSON
//! snapshot.

use crate::snapshot::assert_json_snapshot;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use wayfarer_core::SimTick;

/// Configuration for a micro-worldtest.
#[derive(Debug, Clone)]
pub struct MicroWorldtestConfig {
    /// Human-readable name (written into the report).
    pub name: String,
    /// Number of ticks to step (the report includes the initial frame at tick 0).
    pub ticks: u64,
    /// Golden JSON file, if the run should be snapshotted.
    pub snapshot_path: Option<PathBuf>,
}

impl MicroWorldtestConfig {
    /// Unsnapshotted run of `ticks` ticks.
    pub fn new(name: impl Into<String>, ticks: u64) -> Self {
        Self {
            name: name.into(),
            ticks,
            snapshot_path: None,
        }
    }

    /// Compare the report against `path`.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

/// Single frame captured at a given tick.
#[derive(Debug, Clone, Serialize)]
pub struct MicroWorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Captured state.
    pub snapshot: S,
}

/// Every frame of a run.
#[derive(Debug, Clone, Serialize)]
pub struct MicroWorldtestReport<S> {
    /// Run name.
    pub name: String,
    /// `ticks + 1` frames, starting at tick 0.
    pub frames: Vec<MicroWorldtestFrame<S>>,
}

impl<S> MicroWorldtestReport<S> {
    /// Captured state of the last frame.
    pub fn last(&self) -> Option<&S> {
        self.frames.last().map(|f| &f.snapshot)
    }

    /// First tick whose state satisfies `pred`.
    pub fn first_tick_where<F: Fn(&S) -> bool>(&self, pred: F) -> Option<u64> {
        self.frames
            .iter()
            .find(|f| pred(&f.snapshot))
            .map(|f| f.tick)
    }
}

/// Run a micro-worldtest.
///
/// Captures the initial frame at tick 0, then steps `config.ticks` times,
/// capturing a frame after each step.
pub fn run_micro_worldtest<State, Snapshot, StepFn, SnapFn>(
    config: MicroWorldtestConfig,
    mut state: State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Result<MicroWorldtestReport<Snapshot>>
where
    Snapshot: Serialize,
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(config.ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(MicroWorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, &state),
    });

    for _ in 0..config.ticks {
        step(tick, &mut state);
        tick = tick.advance(1);
        frames.push(MicroWorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, &state),
        });
    }

    let report = MicroWorldtestReport {
        name: config.name,
        frames,
    };
    if let Some(path) = config.snapshot_path {
        assert_json_snapshot(path, &report)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cover_every_tick() {
        let report = run_micro_worldtest(
            MicroWorldtestConfig::new("counter", 5),
            0u32,
            |_, n| *n += 2,
            |_, n| *n,
        )
        .unwrap();
        assert_eq!(report.frames.len(), 6);
        assert_eq!(report.last(), Some(&10));
        assert_eq!(report.first_tick_where(|n| *n >= 6), Some(3));
    }
}
