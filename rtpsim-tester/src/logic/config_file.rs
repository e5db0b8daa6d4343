use anyhow::{Context, Result};
use rtpsim_engine::{GameConfigDoc, SimulationConfigDoc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A game document paired with its run parameters, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBundle {
    #[serde(alias = "game_rules")]
    pub game_config: GameConfigDoc,
    pub simulation_config: SimulationConfigDoc,
}

impl ConfigBundle {
    /// Same bundle with the round count replaced when an override is given.
    #[must_use]
    pub fn with_rounds(mut self, rounds: Option<u64>) -> Self {
        if let Some(rounds) = rounds {
            self.simulation_config.rounds = i64::try_from(rounds).unwrap_or(i64::MAX);
        }
        self
    }

    /// Run parameters for one seed.
    #[must_use]
    pub fn simulation_for_seed(&self, seed: u64) -> SimulationConfigDoc {
        SimulationConfigDoc {
            seed: Some(seed),
            ..self.simulation_config.clone()
        }
    }
}

pub fn load_bundle(path: &Path) -> Result<ConfigBundle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}
