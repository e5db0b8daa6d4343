use rtpsim_engine::constants::RECENT_RTP_WINDOW;
use rtpsim_engine::{RunStatus, SummaryView};
use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of one invariant check against a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &'static str, passed: bool, detail: String) -> Self {
        Self {
            name,
            passed,
            detail,
        }
    }
}

/// Check a summary for internal consistency.
pub fn check_summary(summary: &SummaryView) -> Vec<CheckResult> {
    let stats = &summary.real_time;
    let mut checks = Vec::new();

    checks.push(CheckResult::new(
        "run-finished",
        summary.status == RunStatus::Completed
            || (summary.status == RunStatus::Stopped && summary.total_rounds <= summary.configured_rounds),
        format!(
            "status {} after {}/{} rounds{}",
            summary.status,
            summary.total_rounds,
            summary.configured_rounds,
            summary
                .error
                .as_deref()
                .map(|err| format!(": {err}"))
                .unwrap_or_default()
        ),
    ));

    let funded = stats.total_sales_amount
        + stats.total_pool_contribution
        + stats.jackpot_phase.total_returned_amount;
    checks.push(CheckResult::new(
        "zero-sum-funding",
        funded == stats.total_bet_amount,
        format!(
            "sales {} + pool {} + seller return {} vs wagered {}",
            stats.total_sales_amount,
            stats.total_pool_contribution,
            stats.jackpot_phase.total_returned_amount,
            stats.total_bet_amount
        ),
    ));

    let tier_total: Decimal = summary.prize_summary.iter().map(|tier| tier.total_amount).sum();
    checks.push(CheckResult::new(
        "payout-matches-tiers",
        tier_total == stats.total_payout,
        format!("tiers {tier_total} vs total payout {}", stats.total_payout),
    ));

    checks.push(CheckResult::new(
        "rtp-non-negative",
        summary.average_rtp >= 0.0 && stats.recent_rtps.iter().all(|rtp| *rtp >= 0.0),
        format!("average rtp {:.6}", summary.average_rtp),
    ));

    checks.push(CheckResult::new(
        "recent-window-bounded",
        stats.recent_rtps.len() <= RECENT_RTP_WINDOW,
        format!("{} recent values kept", stats.recent_rtps.len()),
    ));

    checks.push(CheckResult::new(
        "winners-partition-players",
        stats.total_winners + stats.total_non_winners == stats.total_players,
        format!(
            "{} winners + {} non-winners vs {} players",
            stats.total_winners, stats.total_non_winners, stats.total_players
        ),
    ));

    checks.push(CheckResult::new(
        "jackpot-non-negative",
        summary.final_jackpot >= Decimal::ZERO,
        format!("final jackpot {}", summary.final_jackpot),
    ));

    checks
}
