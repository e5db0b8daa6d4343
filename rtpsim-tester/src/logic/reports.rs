use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::batch::RunOutcome;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    game: &'a str,
    passed: bool,
    runs: &'a [RunOutcome],
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    game: &str,
    outcomes: &[RunOutcome],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", format!("📊 RTP Simulation Results: {game}").bright_cyan().bold())?;
    writeln!(writer, "{}", "==============================".cyan())?;

    let passed = outcomes.iter().filter(|outcome| outcome.passed()).count();
    writeln!(writer, "Seeds run: {}", outcomes.len())?;
    writeln!(writer, "Passed: {}", passed.to_string().green())?;
    writeln!(writer, "Failed: {}", (outcomes.len() - passed).to_string().red())?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for outcome in outcomes {
        let summary = &outcome.summary;
        let stats = &summary.real_time;
        let status = if outcome.passed() {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        let origin = if outcome.seed.generated { " (random)" } else { "" };

        writeln!(writer, "{} seed {}{}", status, outcome.seed.seed.to_string().bold(), origin)?;
        writeln!(
            writer,
            "   Status: {} after {}/{} rounds",
            summary.status, summary.total_rounds, summary.configured_rounds
        )?;
        writeln!(
            writer,
            "   RTP: {:.4} (variance {:.6}, fixed-tier expectation {:.4})",
            summary.average_rtp, summary.rtp_variance, summary.theoretical_fixed_rtp
        )?;
        writeln!(
            writer,
            "   Wagered {} / paid {} over {} bets",
            stats.total_bet_amount, stats.total_payout, summary.total_bets
        )?;
        writeln!(
            writer,
            "   Winners: {}/{} players ({:.2}%)",
            stats.total_winners,
            stats.total_players,
            stats.winning_rate * 100.0
        )?;
        writeln!(
            writer,
            "   Jackpot: {} -> {} ({} hits, {:?} phase)",
            summary.initial_jackpot,
            summary.final_jackpot,
            stats.jackpot_hits,
            stats.jackpot_phase.phase
        )?;
        for tier in &summary.prize_summary {
            writeln!(
                writer,
                "     • L{} {:<16} {:>8} wins  {:>14}  p={:.6} (theory {:.6})",
                tier.level,
                tier.name,
                tier.winners_count,
                tier.total_amount.to_string(),
                tier.probability,
                tier.theoretical_probability
            )?;
        }
        if let Some(verified) = outcome.verified {
            let label = if verified {
                "reproduced".green()
            } else {
                "DIVERGED".red()
            };
            writeln!(writer, "   Replay: {label} (fingerprint {})", outcome.fingerprint)?;
        }
        for check in outcome.checks.iter().filter(|check| !check.passed) {
            writeln!(writer, "   {} {}: {}", "•".red(), check.name, check.detail.red())?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn generate_json_report(
    writer: &mut dyn Write,
    game: &str,
    outcomes: &[RunOutcome],
) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        game,
        passed: outcomes.iter().all(RunOutcome::passed),
        runs: outcomes,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}
