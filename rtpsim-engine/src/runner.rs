//! Run lifecycle: plays a run's rounds in order and publishes its state
//! through a shared, cheaply cloned [`RunHandle`].
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RunParams;
use crate::round::RoundSimulator;
use crate::rules::{ConfigurationError, GameRules};
use crate::seed::fresh_seed;
use crate::stats::{ChartData, ProgressView, StatsAggregator, SummaryView};

/// Lifecycle of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Stopped,
    Error,
}

impl RunStatus {
    /// Whether the run can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationId(Uuid);

impl SimulationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SimulationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SimulationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Progress snapshot tagged with the run's identity and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub simulation_id: SimulationId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub progress: ProgressView,
}

#[derive(Debug)]
struct RunRecord {
    status: RunStatus,
    error: Option<ConfigurationError>,
    aggregator: StatsAggregator,
}

#[derive(Debug)]
struct RunShared {
    record: RwLock<RunRecord>,
    stop_requested: AtomicBool,
}

/// Read and signal side of a run, shared with the worker executing it.
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: SimulationId,
    game_name: Arc<str>,
    shared: Arc<RunShared>,
}

impl RunHandle {
    #[must_use]
    pub const fn id(&self) -> SimulationId {
        self.id
    }

    #[must_use]
    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.shared.record.read().status
    }

    /// The error that ended the run, if any.
    #[must_use]
    pub fn error(&self) -> Option<ConfigurationError> {
        self.shared.record.read().error.clone()
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.shared.record.read().aggregator.seed()
    }

    #[must_use]
    pub fn progress(&self) -> RunProgress {
        let record = self.shared.record.read();
        RunProgress {
            simulation_id: self.id,
            status: record.status,
            error: record.error.as_ref().map(ToString::to_string),
            progress: record.aggregator.snapshot(),
        }
    }

    /// Final summary, or `None` while the run is created or running.
    #[must_use]
    pub fn result(&self) -> Option<SummaryView> {
        let record = self.shared.record.read();
        record.status.is_terminal().then(|| {
            record
                .aggregator
                .finalize(record.status, record.error.as_ref().map(ToString::to_string))
        })
    }

    /// Per-round history for charting. The run lock is held only while the
    /// shared trend chunks are captured.
    #[must_use]
    pub fn chart_data(&self) -> ChartData {
        let source = self.shared.record.read().aggregator.chart_source();
        source.into_chart_data()
    }

    /// Ask the run to stop at the next round boundary.
    ///
    /// A run that has not started yet stops immediately. Terminal runs are
    /// left untouched. Returns the status after the request.
    pub fn stop(&self) -> RunStatus {
        let mut record = self.shared.record.write();
        if record.status.is_terminal() {
            return record.status;
        }
        self.shared.stop_requested.store(true, Ordering::Release);
        if record.status == RunStatus::Created {
            record.status = RunStatus::Stopped;
            record.aggregator.freeze_clock();
            log::info!("simulation {} stopped before starting", self.id);
        }
        record.status
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::Acquire)
    }
}

/// Executes one run's rounds strictly in order.
#[derive(Debug)]
pub struct SimulationRunner {
    handle: RunHandle,
    simulator: RoundSimulator,
    rounds: u64,
}

impl SimulationRunner {
    /// Prepare a run. Without a seed in `params` a fresh one is drawn and
    /// recorded so the run can be replayed.
    #[must_use]
    pub fn new(id: SimulationId, rules: Arc<GameRules>, params: RunParams) -> Self {
        let seed = params.seed.unwrap_or_else(fresh_seed);
        let params = params.with_seed(seed);
        let aggregator = StatsAggregator::new(Arc::clone(&rules), params.rounds, seed);
        let handle = RunHandle {
            id,
            game_name: Arc::from(rules.name()),
            shared: Arc::new(RunShared {
                record: RwLock::new(RunRecord {
                    status: RunStatus::Created,
                    error: None,
                    aggregator,
                }),
                stop_requested: AtomicBool::new(false),
            }),
        };
        Self {
            handle,
            simulator: RoundSimulator::new(rules, params, seed),
            rounds: params.rounds,
        }
    }

    #[must_use]
    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    /// Move from created to running. Returns `false` if the run was already
    /// stopped or finished.
    pub fn start(&mut self) -> bool {
        let mut record = self.handle.shared.record.write();
        match record.status {
            RunStatus::Created => {
                record.status = RunStatus::Running;
                record.aggregator.start_clock();
                log::info!(
                    "simulation {} started: {} rounds of '{}' with seed {}",
                    self.handle.id,
                    self.rounds,
                    self.handle.game_name,
                    self.simulator.seed()
                );
                true
            }
            RunStatus::Running => true,
            _ => false,
        }
    }

    /// Advance the run by one round and report its status afterwards.
    ///
    /// Once every round has been played, or a stop has been requested, the
    /// next call moves the run to its terminal state.
    pub fn step(&mut self) -> RunStatus {
        let status = self.handle.status();
        if status.is_terminal() {
            return status;
        }
        if status == RunStatus::Created && !self.start() {
            return self.handle.status();
        }
        if self.simulator.rounds_played() >= self.rounds {
            return self.finish(RunStatus::Completed, None);
        }
        if self.handle.stop_requested() {
            return self.finish(RunStatus::Stopped, None);
        }
        let absorbed = self
            .simulator
            .play_round()
            .and_then(|round| self.handle.shared.record.write().aggregator.absorb(&round));
        match absorbed {
            Ok(()) => RunStatus::Running,
            Err(err) => self.finish(RunStatus::Error, Some(err)),
        }
    }

    /// Play every remaining round, honoring stop requests between rounds.
    pub fn run(mut self) -> RunStatus {
        loop {
            let status = self.step();
            if status.is_terminal() {
                return status;
            }
        }
    }

    fn finish(&mut self, status: RunStatus, error: Option<ConfigurationError>) -> RunStatus {
        let mut record = self.handle.shared.record.write();
        record.aggregator.freeze_clock();
        let played = self.simulator.rounds_played();
        match &error {
            Some(err) => log::warn!(
                "simulation {} failed after {played} rounds: {err}",
                self.handle.id
            ),
            None => log::info!(
                "simulation {} {status} after {played} of {} rounds ({} rng draws)",
                self.handle.id,
                self.rounds,
                self.simulator.rng_draws()
            ),
        }
        record.status = status;
        record.error = error;
        status
    }
}
