//! Centralized limits and defaults for the simulation engine.
//!
//! These values bound what a single run may ask of the engine. Keeping them
//! together ensures limits can only be adjusted via reviewed code changes
//! rather than through configuration documents.

// Run limits ---------------------------------------------------------------
/// Upper bound on rounds accepted for a single simulation.
pub const MAX_SIMULATION_ROUNDS: u64 = 10_000_000;
/// Default number of simulations allowed to execute at the same time.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 5;
/// Largest number pool (`max - min + 1`) a game may draw from.
pub const MAX_NUMBER_POOL: u64 = 1_000_000;

// Statistics ---------------------------------------------------------------
/// Number of per-round RTP values kept for the live "recent" window.
pub const RECENT_RTP_WINDOW: usize = 10;
/// Rounds per sealed chunk of the per-round chart history.
pub(crate) const TREND_CHUNK_ROUNDS: usize = 4096;

// Jackpot defaults (mirroring the configuration documents) -----------------
pub(crate) const DEFAULT_CONTRIBUTION_RATE: f64 = 0.15;
pub(crate) const DEFAULT_POST_RETURN_CONTRIBUTION_RATE: f64 = 0.3;
pub(crate) const DEFAULT_RETURN_RATE: f64 = 0.9;

// RNG stream domain tags ---------------------------------------------------
pub(crate) const STREAM_POPULATION: &[u8] = b"rtpsim/population";
pub(crate) const STREAM_TICKETS: &[u8] = b"rtpsim/tickets";
pub(crate) const STREAM_DRAW: &[u8] = b"rtpsim/draw";

// Worker threads -----------------------------------------------------------
pub(crate) const WORKER_THREAD_PREFIX: &str = "rtpsim-run";
