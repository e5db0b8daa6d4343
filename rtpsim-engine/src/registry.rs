//! Concurrent registry of simulation runs keyed by [`SimulationId`].
//!
//! Each run executes on its own named worker thread and owns its jackpot and
//! statistics. The registry only maps ids to run handles; per-run state is
//! locked per entry, never through the map.
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{EngineSettings, RunParams, SimulationConfigDoc};
use crate::constants::WORKER_THREAD_PREFIX;
use crate::rules::{GameConfigDoc, GameRules, ValidationError};
use crate::runner::{RunHandle, RunProgress, RunStatus, SimulationId, SimulationRunner};
use crate::stats::{ChartData, SummaryView};

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("simulation {0} not found")]
    NotFound(SimulationId),
    #[error("simulation {id} has no result yet (status: {status})")]
    NotReady { id: SimulationId, status: RunStatus },
    #[error("simulation {id} is still {status}; stop it before removing")]
    StillRunning { id: SimulationId, status: RunStatus },
    #[error("{running} simulations already running (limit {limit})")]
    Capacity { running: usize, limit: usize },
    #[error("failed to spawn worker for simulation {id}: {source}")]
    Spawn {
        id: SimulationId,
        #[source]
        source: std::io::Error,
    },
    #[error("worker for simulation {0} panicked")]
    WorkerPanicked(SimulationId),
}

/// Acknowledgement returned when a run is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAck {
    pub simulation_id: SimulationId,
    pub status: RunStatus,
    pub seed: u64,
}

/// One line of [`SimulationRegistry::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListing {
    pub simulation_id: SimulationId,
    pub game_name: String,
    pub status: RunStatus,
    pub current_round: u64,
    pub total_rounds: u64,
    pub seed: u64,
}

#[derive(Debug)]
struct RunEntry {
    handle: RunHandle,
    sequence: u64,
    worker: Mutex<Option<JoinHandle<RunStatus>>>,
}

/// Starts runs on worker threads and answers queries about them.
#[derive(Debug)]
pub struct SimulationRegistry {
    settings: EngineSettings,
    runs: RwLock<HashMap<SimulationId, Arc<RunEntry>>>,
    next_sequence: AtomicU64,
}

impl Default for SimulationRegistry {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl SimulationRegistry {
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            runs: RwLock::new(HashMap::new()),
            next_sequence: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Validate a game document without starting anything.
    ///
    /// # Errors
    ///
    /// Returns every violation found in the document.
    pub fn validate_config(&self, game: &GameConfigDoc) -> Result<GameRules, ValidationError> {
        GameRules::from_doc(game)
    }

    /// Validate both documents and start a run.
    ///
    /// Violations from the game and simulation documents are reported together.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when either document is invalid, `Capacity` when
    /// the concurrent run limit is reached, and `Spawn` when no worker thread
    /// could be created.
    pub fn start(
        &self,
        game: &GameConfigDoc,
        simulation: &SimulationConfigDoc,
    ) -> Result<StartAck, RegistryError> {
        let rules = GameRules::from_doc(game);
        let params = simulation.validate(&self.settings);
        match (rules, params) {
            (Ok(rules), Ok(params)) => self.start_validated(Arc::new(rules), params),
            (Err(game_err), Err(sim_err)) => Err(game_err.merge(sim_err).into()),
            (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err.into()),
        }
    }

    /// Start a run from already validated rules and parameters.
    ///
    /// # Errors
    ///
    /// Returns `Capacity` when the concurrent run limit is reached and `Spawn`
    /// when no worker thread could be created.
    pub fn start_validated(
        &self,
        rules: Arc<GameRules>,
        params: RunParams,
    ) -> Result<StartAck, RegistryError> {
        let mut runs = self.runs.write();
        let running = runs
            .values()
            .filter(|entry| !entry.handle.status().is_terminal())
            .count();
        if running >= self.settings.max_concurrent_runs {
            return Err(RegistryError::Capacity {
                running,
                limit: self.settings.max_concurrent_runs,
            });
        }

        let id = SimulationId::new();
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let runner = SimulationRunner::new(id, rules, params);
        let handle = runner.handle();
        let worker = thread::Builder::new()
            .name(format!("{WORKER_THREAD_PREFIX}-{sequence}"))
            .spawn(move || runner.run())
            .map_err(|source| RegistryError::Spawn { id, source })?;

        let ack = StartAck {
            simulation_id: id,
            status: handle.status(),
            seed: handle.seed(),
        };
        runs.insert(
            id,
            Arc::new(RunEntry {
                handle,
                sequence,
                worker: Mutex::new(Some(worker)),
            }),
        );
        Ok(ack)
    }

    fn entry(&self, id: SimulationId) -> Result<Arc<RunEntry>, RegistryError> {
        self.runs
            .read()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Shared handle of a run, for callers that poll it directly.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn handle(&self, id: SimulationId) -> Result<RunHandle, RegistryError> {
        Ok(self.entry(id)?.handle.clone())
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn progress(&self, id: SimulationId) -> Result<RunProgress, RegistryError> {
        Ok(self.entry(id)?.handle.progress())
    }

    /// Request a stop. Idempotent; terminal runs are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn stop(&self, id: SimulationId) -> Result<RunStatus, RegistryError> {
        Ok(self.entry(id)?.handle.stop())
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `NotReady` while the run is
    /// created or running.
    pub fn result(&self, id: SimulationId) -> Result<SummaryView, RegistryError> {
        let entry = self.entry(id)?;
        entry.handle.result().ok_or_else(|| RegistryError::NotReady {
            id,
            status: entry.handle.status(),
        })
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn chart_data(&self, id: SimulationId) -> Result<ChartData, RegistryError> {
        Ok(self.entry(id)?.handle.chart_data())
    }

    /// Every known run, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<RunListing> {
        let mut entries: Vec<Arc<RunEntry>> = self.runs.read().values().cloned().collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries
            .iter()
            .map(|entry| {
                let progress = entry.handle.progress();
                RunListing {
                    simulation_id: entry.handle.id(),
                    game_name: entry.handle.game_name().to_string(),
                    status: progress.status,
                    current_round: progress.progress.current_round,
                    total_rounds: progress.progress.total_rounds,
                    seed: entry.handle.seed(),
                }
            })
            .collect()
    }

    /// Number of runs that are created or running.
    #[must_use]
    pub fn active_runs(&self) -> usize {
        self.runs
            .read()
            .values()
            .filter(|entry| !entry.handle.status().is_terminal())
            .count()
    }

    /// Block until the run's worker has finished.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `WorkerPanicked` when the
    /// worker thread panicked.
    pub fn wait(&self, id: SimulationId) -> Result<RunStatus, RegistryError> {
        let entry = self.entry(id)?;
        let worker = entry.worker.lock().take();
        match worker {
            Some(worker) => worker
                .join()
                .map_err(|_| RegistryError::WorkerPanicked(id)),
            None => Ok(entry.handle.status()),
        }
    }

    /// Forget a finished run and hand back its summary.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `StillRunning` when the run
    /// has not reached a terminal state.
    pub fn remove(&self, id: SimulationId) -> Result<SummaryView, RegistryError> {
        let mut runs = self.runs.write();
        let entry = runs.get(&id).cloned().ok_or(RegistryError::NotFound(id))?;
        let Some(summary) = entry.handle.result() else {
            return Err(RegistryError::StillRunning {
                id,
                status: entry.handle.status(),
            });
        };
        runs.remove(&id);
        drop(runs);
        if let Some(worker) = entry.worker.lock().take()
            && worker.join().is_err()
        {
            log::warn!("worker for removed simulation {id} panicked");
        }
        Ok(summary)
    }
}
