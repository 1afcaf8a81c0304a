use crate::input::{MoveInput, TickInput};
use anyhow::Context;
use glam::Vec2;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ScriptedStep {
    duration: f32,
    #[serde(flatten)]
    movement: MoveInput,
    /// Swing at this offset from the player every tick of the step.
    #[serde(default)]
    attack: Option<[f32; 2]>,
}

/// Replays a JSON list of timed input steps; the last step repeats forever.
pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    time_in_step: f32,
    finished: bool,
}

impl ScriptedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input script {}", path.display()))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let file: ScriptedInputFile =
            serde_json::from_str(contents).context("Failed to parse input script")?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        Ok(Self {
            steps: file.steps,
            index: 0,
            time_in_step: 0.0,
            finished: false,
        })
    }

    /// Input for the next `dt` seconds. Attack offsets are resolved against
    /// `player_position`.
    pub fn advance(&mut self, dt: f32, player_position: Vec2) -> TickInput {
        self.time_in_step += dt;
        while self.index < self.steps.len() && self.time_in_step >= self.steps[self.index].duration
        {
            self.time_in_step -= self.steps[self.index].duration;
            if self.index + 1 < self.steps.len() {
                self.index += 1;
            } else {
                self.time_in_step = 0.0;
                self.finished = true;
                break;
            }
        }

        let step = self.steps.get(self.index).cloned().unwrap_or_default();
        TickInput {
            movement: step.movement,
            attack_at: step
                .attack
                .map(|[dx, dy]| player_position + Vec2::new(dx, dy)),
        }
    }

    /// True once the last step has run its full duration.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
