//! rtpsim Engine
//!
//! Platform-agnostic simulation engine for validating the return-to-player
//! of lottery-style games. This crate provides rule validation, jackpot
//! funding, round simulation, and statistics without any UI or storage
//! dependencies.

pub mod config;
pub mod constants;
pub mod jackpot;
pub mod numbers;
pub mod odds;
pub mod registry;
pub mod round;
pub mod rules;
pub mod runner;
pub mod seed;
pub mod stats;

// Re-export commonly used types
pub use config::{EngineSettings, RunParams, SimulationConfigDoc};
pub use jackpot::{
    FundingRecord, JackpotPhase, JackpotState, apply_round_funding, settle_jackpot_hit,
};
pub use odds::{match_probability, theoretical_fixed_rtp};
pub use registry::{RegistryError, RunListing, SimulationRegistry, StartAck};
pub use round::{LevelOutcome, RoundResult, RoundSimulator};
pub use rules::{
    ConfigurationError, GameConfigDoc, GameRules, GameType, JackpotConfig, JackpotDoc,
    PrizeLevel, PrizeLevelDoc, PrizePayout, ValidationError, Violation, validate_config,
};
pub use runner::{RunHandle, RunProgress, RunStatus, SimulationId, SimulationRunner};
pub use stats::{
    AggregateStats, ChartData, ChartSource, JackpotPhaseInfo, PrizeDistributionEntry, PrizeStat,
    PrizeSummary, ProgressView, RealTimeStats, StatsAggregator, SummaryView,
};

/// Trait for abstracting where named game documents come from
/// Platform-specific implementations should provide this
pub trait RuleSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the game document stored under `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be found or parsed.
    fn load_rules(&self, name: &str) -> Result<GameConfigDoc, Self::Error>;

    /// Names of every stored game document
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated.
    fn rule_names(&self) -> Result<Vec<String>, Self::Error>;
}

/// Trait for abstracting where finished summaries are kept
/// Platform-specific implementations should provide this
pub trait SummarySink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a finished run's summary
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be stored.
    fn record_summary(&self, id: SimulationId, summary: &SummaryView) -> Result<(), Self::Error>;

    /// Load a previously stored summary
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be read.
    fn load_summary(&self, id: SimulationId) -> Result<Option<SummaryView>, Self::Error>;
}

/// Binds a rule source and a summary sink to a run registry
pub struct Workbench<L, S>
where
    L: RuleSource,
    S: SummarySink,
{
    rule_source: L,
    sink: S,
    registry: SimulationRegistry,
}

impl<L, S> Workbench<L, S>
where
    L: RuleSource,
    S: SummarySink,
{
    /// Create a new workbench with the provided source, sink, and engine settings
    pub fn new(rule_source: L, sink: S, settings: EngineSettings) -> Self {
        Self {
            rule_source,
            sink,
            registry: SimulationRegistry::new(settings),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &SimulationRegistry {
        &self.registry
    }

    /// Start a run of the named game document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or the run is rejected.
    pub fn start_named(
        &self,
        name: &str,
        simulation: &SimulationConfigDoc,
    ) -> Result<StartAck, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let game = self.rule_source.load_rules(name).map_err(Into::into)?;
        Ok(self.registry.start(&game, simulation)?)
    }

    /// Wait for a run, hand its summary to the sink, and return it
    ///
    /// # Errors
    ///
    /// Returns an error if the run is unknown, its worker panicked, or the
    /// sink rejects the summary.
    pub fn finish(&self, id: SimulationId) -> Result<SummaryView, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        self.registry.wait(id)?;
        let summary = self.registry.result(id)?;
        self.sink
            .record_summary(id, &summary)
            .map_err(Into::into)?;
        Ok(summary)
    }

    /// Summary previously handed to the sink
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be read.
    pub fn archived(&self, id: SimulationId) -> Result<Option<SummaryView>, S::Error> {
        self.sink.load_summary(id)
    }

    /// Names the rule source can start
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated.
    pub fn rule_names(&self) -> Result<Vec<String>, L::Error> {
        self.rule_source.rule_names()
    }
}
