//! Simulation run parameters and engine-wide settings.
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_CONCURRENT_RUNS, MAX_SIMULATION_ROUNDS};
use crate::rules::{ValidationError, ViolationReport};

/// Run parameters as written in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfigDoc {
    pub rounds: i64,
    pub players_range: (i64, i64),
    pub bets_range: (i64, i64),
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfigDoc {
    /// Validate the document against the engine settings.
    ///
    /// # Errors
    ///
    /// Returns every violation found in the document.
    pub fn validate(&self, settings: &EngineSettings) -> Result<RunParams, ValidationError> {
        RunParams::from_doc(self, settings)
    }
}

/// Validated parameters for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    pub rounds: u64,
    pub players_range: (u32, u32),
    pub bets_range: (u32, u32),
    pub seed: Option<u64>,
}

impl RunParams {
    /// Validate a run document.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing each offending field.
    pub fn from_doc(
        doc: &SimulationConfigDoc,
        settings: &EngineSettings,
    ) -> Result<Self, ValidationError> {
        let mut report = ViolationReport::default();

        let rounds = match u64::try_from(doc.rounds) {
            Ok(rounds) if rounds >= 1 && rounds <= settings.max_rounds => Some(rounds),
            _ => {
                report.push(
                    "simulation_config.rounds",
                    format!(
                        "must be between 1 and {} (got {})",
                        settings.max_rounds, doc.rounds
                    ),
                );
                None
            }
        };
        let players_range =
            validate_count_range("simulation_config.players_range", doc.players_range, &mut report);
        let bets_range =
            validate_count_range("simulation_config.bets_range", doc.bets_range, &mut report);

        report.finish()?;
        match (rounds, players_range, bets_range) {
            (Some(rounds), Some(players_range), Some(bets_range)) => Ok(Self {
                rounds,
                players_range,
                bets_range,
                seed: doc.seed,
            }),
            _ => Err(ValidationError::single(
                "simulation_config",
                "document could not be validated",
            )),
        }
    }

    /// Same parameters with an explicit seed.
    #[must_use]
    pub const fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }
}

fn validate_count_range(
    field: &'static str,
    range: (i64, i64),
    report: &mut ViolationReport,
) -> Option<(u32, u32)> {
    let (min, max) = range;
    if min < 1 {
        report.push(field, format!("minimum must be at least 1 (got {min})"));
        return None;
    }
    if min > max {
        report.push(
            field,
            format!("minimum cannot exceed maximum (got {min}..{max})"),
        );
        return None;
    }
    match (u32::try_from(min), u32::try_from(max)) {
        (Ok(min), Ok(max)) => Some((min, max)),
        _ => {
            report.push(field, "bounds must fit in 32 bits".to_string());
            None
        }
    }
}

/// Engine-wide limits applied when runs are started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "EngineSettings::default_max_rounds")]
    pub max_rounds: u64,
    #[serde(default = "EngineSettings::default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

impl EngineSettings {
    #[must_use]
    pub const fn default_max_rounds() -> u64 {
        MAX_SIMULATION_ROUNDS
    }

    #[must_use]
    pub const fn default_max_concurrent_runs() -> usize {
        DEFAULT_MAX_CONCURRENT_RUNS
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_rounds: Self::default_max_rounds(),
            max_concurrent_runs: Self::default_max_concurrent_runs(),
        }
    }
}
