//! Streaming aggregation of round results into progress and summary views.
//!
//! [`StatsAggregator`] owns one run's [`AggregateStats`]. Every view it hands
//! out is derived from those running totals on demand, so a snapshot taken
//! after the run has finished is always the same snapshot.
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{RECENT_RTP_WINDOW, TREND_CHUNK_ROUNDS};
use crate::jackpot::{JackpotPhase, JackpotState};
use crate::numbers::{checked, count_to_f64, decimal_to_f64, fraction, ratio};
use crate::odds::{level_probabilities, theoretical_fixed_rtp};
use crate::round::RoundResult;
use crate::rules::{ConfigurationError, GameRules};
use crate::runner::RunStatus;

/// Running totals for one prize tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTotals {
    pub level: u32,
    pub winners_count: u64,
    pub total_amount: Decimal,
}

/// Running sums for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_rounds: u64,
    pub total_players: u64,
    pub total_bets: u64,
    pub total_winners: u64,
    pub total_bet_amount: Decimal,
    pub total_payout: Decimal,
    pub total_returned_amount: Decimal,
    pub total_sales_amount: Decimal,
    pub total_pool_contribution: Decimal,
    pub jackpot_hits: u64,
    /// Per-tier totals in prize-level order.
    pub per_level: Vec<LevelTotals>,
    pub recent_rtps: VecDeque<f64>,
    pub jackpot: JackpotState,
    rtp_mean: f64,
    rtp_m2: f64,
    #[serde(skip)]
    trends: TrendLog,
}

impl AggregateStats {
    fn new(rules: &GameRules) -> Self {
        Self {
            total_rounds: 0,
            total_players: 0,
            total_bets: 0,
            total_winners: 0,
            total_bet_amount: Decimal::ZERO,
            total_payout: Decimal::ZERO,
            total_returned_amount: Decimal::ZERO,
            total_sales_amount: Decimal::ZERO,
            total_pool_contribution: Decimal::ZERO,
            jackpot_hits: 0,
            per_level: rules
                .prize_levels()
                .iter()
                .map(|level| LevelTotals {
                    level: level.level,
                    winners_count: 0,
                    total_amount: Decimal::ZERO,
                })
                .collect(),
            recent_rtps: VecDeque::with_capacity(RECENT_RTP_WINDOW),
            jackpot: JackpotState::initial(rules.jackpot()),
            rtp_mean: 0.0,
            rtp_m2: 0.0,
            trends: TrendLog::default(),
        }
    }

    /// Bet-weighted RTP over every absorbed round.
    #[must_use]
    pub fn average_rtp(&self) -> f64 {
        decimal_to_f64(ratio(self.total_payout, self.total_bet_amount))
    }

    #[must_use]
    pub fn winning_rate(&self) -> f64 {
        fraction(self.total_winners, self.total_players)
    }

    /// Population variance of the per-round RTP values.
    #[must_use]
    pub fn rtp_variance(&self) -> f64 {
        if self.total_rounds == 0 {
            return 0.0;
        }
        self.rtp_m2 / count_to_f64(self.total_rounds)
    }
}

/// Live jackpot funding details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotPhaseInfo {
    pub phase: JackpotPhase,
    pub return_phase_completed: bool,
    pub current_contribution_rate: Decimal,
    pub total_returned_amount: Decimal,
    pub initial_jackpot_amount: Decimal,
}

/// Running totals for one prize tier, labelled for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeStat {
    pub level: u32,
    pub name: String,
    pub winners_count: u64,
    pub total_amount: Decimal,
}

/// Statistics shared by progress snapshots and final summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealTimeStats {
    pub completed_rounds: u64,
    pub current_rtp: f64,
    pub current_jackpot: Decimal,
    pub total_bet_amount: Decimal,
    pub total_payout: Decimal,
    pub total_sales_amount: Decimal,
    pub total_pool_contribution: Decimal,
    pub total_players: u64,
    pub total_winners: u64,
    pub total_non_winners: u64,
    pub winning_rate: f64,
    pub jackpot_hits: u64,
    pub prize_stats: Vec<PrizeStat>,
    pub recent_rtps: Vec<f64>,
    pub jackpot_phase: JackpotPhaseInfo,
}

/// Point-in-time progress of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub current_round: u64,
    pub total_rounds: u64,
    pub progress_percentage: f64,
    /// Seconds since the run started.
    pub elapsed_time: f64,
    /// Seconds, extrapolated from the average round time so far.
    pub estimated_remaining: f64,
    pub real_time_stats: RealTimeStats,
}

/// Final per-tier statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeSummary {
    pub level: u32,
    pub name: String,
    pub winners_count: u64,
    pub total_amount: Decimal,
    /// Winning bets per player.
    pub probability: f64,
    /// Hypergeometric chance that a single bet lands in this tier.
    pub theoretical_probability: f64,
}

/// Final outcome of a run. Contains no timing data, so identical runs
/// serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub game_name: String,
    pub seed: u64,
    pub total_rounds: u64,
    pub configured_rounds: u64,
    pub total_bets: u64,
    pub average_rtp: f64,
    pub rtp_variance: f64,
    pub theoretical_fixed_rtp: f64,
    pub initial_jackpot: Decimal,
    pub final_jackpot: Decimal,
    pub prize_summary: Vec<PrizeSummary>,
    #[serde(flatten)]
    pub real_time: RealTimeStats,
}

/// One bar of the prize distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeDistributionEntry {
    pub level: u32,
    pub name: String,
    pub count: u64,
    pub amount: Decimal,
}

/// Per-round history for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub rtp_trend: Vec<f64>,
    pub prize_distribution: Vec<PrizeDistributionEntry>,
    pub jackpot_trend: Vec<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TrendPoint {
    rtp: f64,
    jackpot: Decimal,
}

/// Per-round history. Full chunks are sealed behind `Arc`s so readers can
/// take a copy while holding the run lock only briefly.
#[derive(Debug, Clone, Default, PartialEq)]
struct TrendLog {
    sealed: Vec<Arc<[TrendPoint]>>,
    open: Vec<TrendPoint>,
}

impl TrendLog {
    fn push(&mut self, point: TrendPoint) {
        self.open.push(point);
        if self.open.len() == TREND_CHUNK_ROUNDS {
            let next = Vec::with_capacity(TREND_CHUNK_ROUNDS);
            let full = std::mem::replace(&mut self.open, next);
            self.sealed.push(Arc::from(full));
        }
    }

    fn len(&self) -> usize {
        self.sealed.len() * TREND_CHUNK_ROUNDS + self.open.len()
    }
}

/// Chart inputs captured from a run. Turning them into [`ChartData`] does
/// the per-round copying and needs no lock.
#[derive(Debug, Clone)]
pub struct ChartSource {
    trends: TrendLog,
    prize_distribution: Vec<PrizeDistributionEntry>,
}

impl ChartSource {
    #[must_use]
    pub fn into_chart_data(self) -> ChartData {
        let rounds = self.trends.len();
        let mut rtp_trend = Vec::with_capacity(rounds);
        let mut jackpot_trend = Vec::with_capacity(rounds);
        let chunks = self
            .trends
            .sealed
            .iter()
            .map(|chunk| &chunk[..])
            .chain(std::iter::once(&self.trends.open[..]));
        for point in chunks.flatten() {
            rtp_trend.push(point.rtp);
            jackpot_trend.push(point.jackpot);
        }
        ChartData {
            rtp_trend,
            prize_distribution: self.prize_distribution,
            jackpot_trend,
        }
    }
}

fn add(
    total: Decimal,
    amount: Decimal,
    operation: &'static str,
) -> Result<Decimal, ConfigurationError> {
    checked(total.checked_add(amount), operation)
}

#[derive(Debug, Clone, Copy, Default)]
struct RunClock {
    started: Option<Instant>,
    frozen: Option<Duration>,
}

impl RunClock {
    fn elapsed(&self) -> Duration {
        match (self.frozen, self.started) {
            (Some(frozen), _) => frozen,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }
}

/// Folds round results for one run and derives views from the totals.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    rules: Arc<GameRules>,
    configured_rounds: u64,
    seed: u64,
    stats: AggregateStats,
    theoretical: Vec<f64>,
    theoretical_fixed_rtp: f64,
    clock: RunClock,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(rules: Arc<GameRules>, configured_rounds: u64, seed: u64) -> Self {
        Self {
            stats: AggregateStats::new(&rules),
            theoretical: level_probabilities(&rules),
            theoretical_fixed_rtp: theoretical_fixed_rtp(&rules),
            rules,
            configured_rounds,
            seed,
            clock: RunClock::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Start timing the run. Has no effect once the clock is running.
    pub fn start_clock(&mut self) {
        if self.clock.started.is_none() {
            self.clock.started = Some(Instant::now());
        }
    }

    /// Freeze elapsed time so later snapshots repeat exactly.
    pub fn freeze_clock(&mut self) {
        if self.clock.frozen.is_none() {
            self.clock.frozen = Some(self.clock.elapsed());
        }
    }

    /// Fold one round into the running totals. Nothing is committed when a
    /// running sum would leave the decimal range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Overflow` naming the total that overflowed.
    pub fn absorb(&mut self, round: &RoundResult) -> Result<(), ConfigurationError> {
        let stats = &self.stats;
        let total_bet_amount =
            add(stats.total_bet_amount, round.total_bet_amount, "total bet amount")?;
        let total_payout = add(stats.total_payout, round.total_payout, "total payout")?;
        let total_returned_amount = add(
            stats.total_returned_amount,
            round.funding.seller_return,
            "total seller return",
        )?;
        let total_sales_amount =
            add(stats.total_sales_amount, round.funding.sales, "total sales")?;
        let total_pool_contribution = add(
            stats.total_pool_contribution,
            round.funding.pool_contribution,
            "total pool contribution",
        )?;
        let level_amounts = stats
            .per_level
            .iter()
            .zip(&round.levels)
            .map(|(totals, outcome)| {
                add(totals.total_amount, outcome.amount, "prize level total")
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stats = &mut self.stats;
        stats.total_rounds += 1;
        stats.total_players += round.players;
        stats.total_bets += round.bets;
        stats.total_winners += round.winning_players;
        stats.total_bet_amount = total_bet_amount;
        stats.total_payout = total_payout;
        stats.total_returned_amount = total_returned_amount;
        stats.total_sales_amount = total_sales_amount;
        stats.total_pool_contribution = total_pool_contribution;
        if round.jackpot_hit {
            stats.jackpot_hits += 1;
        }
        stats.jackpot = round.jackpot_after;

        let levels = stats.per_level.iter_mut().zip(&round.levels);
        for ((totals, outcome), amount) in levels.zip(level_amounts) {
            totals.winners_count += outcome.winners;
            totals.total_amount = amount;
        }

        let rtp = decimal_to_f64(round.rtp);
        if stats.recent_rtps.len() == RECENT_RTP_WINDOW {
            stats.recent_rtps.pop_front();
        }
        stats.recent_rtps.push_back(rtp);

        let n = count_to_f64(stats.total_rounds);
        let delta = rtp - stats.rtp_mean;
        stats.rtp_mean += delta / n;
        stats.rtp_m2 += delta * (rtp - stats.rtp_mean);

        stats.trends.push(TrendPoint {
            rtp,
            jackpot: round.jackpot_balance_after(),
        });
        Ok(())
    }

    fn real_time_stats(&self) -> RealTimeStats {
        let stats = &self.stats;
        let jackpot_cfg = self.rules.jackpot();
        RealTimeStats {
            completed_rounds: stats.total_rounds,
            current_rtp: stats.average_rtp(),
            current_jackpot: stats.jackpot.balance,
            total_bet_amount: stats.total_bet_amount,
            total_payout: stats.total_payout,
            total_sales_amount: stats.total_sales_amount,
            total_pool_contribution: stats.total_pool_contribution,
            total_players: stats.total_players,
            total_winners: stats.total_winners,
            total_non_winners: stats.total_players.saturating_sub(stats.total_winners),
            winning_rate: stats.winning_rate(),
            jackpot_hits: stats.jackpot_hits,
            prize_stats: self
                .labelled_levels()
                .map(|(name, totals)| PrizeStat {
                    level: totals.level,
                    name: name.to_string(),
                    winners_count: totals.winners_count,
                    total_amount: totals.total_amount,
                })
                .collect(),
            recent_rtps: stats.recent_rtps.iter().copied().collect(),
            jackpot_phase: JackpotPhaseInfo {
                phase: stats.jackpot.phase,
                return_phase_completed: jackpot_cfg.enabled
                    && stats.jackpot.phase == JackpotPhase::PostReturn,
                current_contribution_rate: stats.jackpot.contribution_rate(jackpot_cfg),
                total_returned_amount: stats.total_returned_amount,
                initial_jackpot_amount: jackpot_cfg.initial_amount,
            },
        }
    }

    fn labelled_levels(&self) -> impl Iterator<Item = (&str, &LevelTotals)> {
        self.rules
            .prize_levels()
            .iter()
            .map(|level| level.name.as_str())
            .zip(&self.stats.per_level)
    }

    /// Current progress of the run.
    #[must_use]
    pub fn snapshot(&self) -> ProgressView {
        let current = self.stats.total_rounds;
        let total = self.configured_rounds;
        let elapsed = self.clock.elapsed().as_secs_f64();
        let remaining = count_to_f64(total.saturating_sub(current));
        ProgressView {
            current_round: current,
            total_rounds: total,
            progress_percentage: fraction(current, total) * 100.0,
            elapsed_time: elapsed,
            estimated_remaining: elapsed * remaining / count_to_f64(current.max(1)),
            real_time_stats: self.real_time_stats(),
        }
    }

    /// Summary of everything absorbed so far.
    #[must_use]
    pub fn finalize(&self, status: RunStatus, error: Option<String>) -> SummaryView {
        let stats = &self.stats;
        let prize_summary = self
            .labelled_levels()
            .zip(&self.theoretical)
            .map(|((name, totals), &theoretical)| PrizeSummary {
                level: totals.level,
                name: name.to_string(),
                winners_count: totals.winners_count,
                total_amount: totals.total_amount,
                probability: fraction(totals.winners_count, stats.total_players),
                theoretical_probability: theoretical,
            })
            .collect();

        SummaryView {
            status,
            error,
            game_name: self.rules.name().to_string(),
            seed: self.seed,
            total_rounds: stats.total_rounds,
            configured_rounds: self.configured_rounds,
            total_bets: stats.total_bets,
            average_rtp: stats.average_rtp(),
            rtp_variance: stats.rtp_variance(),
            theoretical_fixed_rtp: self.theoretical_fixed_rtp,
            initial_jackpot: self.rules.jackpot().initial_amount,
            final_jackpot: stats.jackpot.balance,
            prize_summary,
            real_time: self.real_time_stats(),
        }
    }

    /// Cheap capture of the chart inputs: sealed trend chunks are shared,
    /// only the open chunk is copied.
    #[must_use]
    pub fn chart_source(&self) -> ChartSource {
        ChartSource {
            trends: self.stats.trends.clone(),
            prize_distribution: self
                .labelled_levels()
                .filter(|(_, totals)| totals.winners_count > 0)
                .map(|(name, totals)| PrizeDistributionEntry {
                    level: totals.level,
                    name: name.to_string(),
                    count: totals.winners_count,
                    amount: totals.total_amount,
                })
                .collect(),
        }
    }

    /// Full per-round history plus tiers that have paid out.
    #[must_use]
    pub fn chart_data(&self) -> ChartData {
        self.chart_source().into_chart_data()
    }
}
