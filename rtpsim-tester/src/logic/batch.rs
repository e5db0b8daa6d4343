use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use rtpsim_engine::{
    GameRules, RunParams, RunStatus, SimulationId, SimulationRegistry, SimulationRunner,
    SummaryView,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::checks::{CheckResult, check_summary};
use super::config_file::ConfigBundle;
use super::seeds::SeedInfo;
use crate::util::fingerprint;

/// Knobs for one batch of runs.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub poll: Duration,
    /// Replay each completed seed and compare fingerprints.
    pub verify: bool,
    pub verbose: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(200),
            verify: false,
            verbose: false,
        }
    }
}

/// Everything the reports need to know about one seed's run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub seed: SeedInfo,
    pub simulation_id: SimulationId,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    pub checks: Vec<CheckResult>,
    pub summary: SummaryView,
}

impl RunOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed) && self.verified != Some(false)
    }
}

/// Run every seed through the registry, in waves no larger than the
/// registry's concurrent run limit.
///
/// Ctrl-C stops the runs in flight; seeds not yet started are skipped and
/// the partial outcomes are returned.
pub async fn run_batch(
    registry: Arc<SimulationRegistry>,
    bundle: &ConfigBundle,
    seeds: &[SeedInfo],
    options: BatchOptions,
) -> Result<Vec<RunOutcome>> {
    let rules = Arc::new(
        registry
            .validate_config(&bundle.game_config)
            .context("invalid game config")?,
    );
    let wave_size = registry.settings().max_concurrent_runs.max(1);
    let mut outcomes = Vec::with_capacity(seeds.len());

    for wave in seeds.chunks(wave_size) {
        let mut started = Vec::with_capacity(wave.len());
        for info in wave {
            let params = bundle
                .simulation_for_seed(info.seed)
                .validate(registry.settings())
                .context("invalid simulation config")?;
            let ack = registry.start_validated(Arc::clone(&rules), params)?;
            log::debug!("seed {} started as {}", info.seed, ack.simulation_id);
            started.push((info.clone(), ack.simulation_id, params));
        }

        let ids: Vec<SimulationId> = started.iter().map(|(_, id, _)| *id).collect();
        let interrupted = watch_wave(&registry, &ids, options).await?;

        for (info, id, params) in started {
            let summary = collect(Arc::clone(&registry), id).await?;
            let replay_with = options.verify.then_some(params);
            outcomes.push(evaluate(&rules, info, id, summary, replay_with).await?);
        }

        if interrupted {
            eprintln!(
                "{}",
                format!(
                    "Interrupted: {} of {} seeds finished",
                    outcomes.len(),
                    seeds.len()
                )
                .yellow()
            );
            break;
        }
    }

    Ok(outcomes)
}

/// Poll a wave until every run is terminal. Returns whether Ctrl-C fired.
async fn watch_wave(
    registry: &SimulationRegistry,
    ids: &[SimulationId],
    options: BatchOptions,
) -> Result<bool> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        let mut pending = 0;
        for id in ids {
            let progress = registry.progress(*id)?;
            if !progress.status.is_terminal() {
                pending += 1;
            }
            if options.verbose {
                let view = &progress.progress;
                eprintln!(
                    "  {} {:>6.2}% round {}/{} rtp {:.4} jackpot {}",
                    short_id(*id).dimmed(),
                    view.progress_percentage,
                    view.current_round,
                    view.total_rounds,
                    view.real_time_stats.current_rtp,
                    view.real_time_stats.current_jackpot
                );
            }
        }
        if pending == 0 {
            return Ok(interrupted);
        }

        tokio::select! {
            signal = &mut ctrl_c, if !interrupted => {
                signal.context("listening for ctrl-c")?;
                interrupted = true;
                log::warn!("ctrl-c received, stopping {pending} running simulations");
                for id in ids {
                    registry.stop(*id)?;
                }
            }
            () = tokio::time::sleep(options.poll) => {}
        }
    }
}

async fn collect(registry: Arc<SimulationRegistry>, id: SimulationId) -> Result<SummaryView> {
    tokio::task::spawn_blocking(move || {
        let status = registry.wait(id)?;
        log::debug!("simulation {id} finished with status {status}");
        registry.remove(id).map_err(anyhow::Error::from)
    })
    .await
    .context("joining simulation collector")?
}

async fn evaluate(
    rules: &Arc<GameRules>,
    seed: SeedInfo,
    simulation_id: SimulationId,
    summary: SummaryView,
    replay_with: Option<RunParams>,
) -> Result<RunOutcome> {
    let print = fingerprint(&summary)?;
    let verified = match replay_with {
        Some(params) if summary.status == RunStatus::Completed => {
            let replayed = replay(Arc::clone(rules), params).await?;
            let matches = fingerprint(&replayed)? == print;
            if !matches {
                log::warn!("seed {} did not reproduce its summary", seed.seed);
            }
            Some(matches)
        }
        _ => None,
    };

    Ok(RunOutcome {
        checks: check_summary(&summary),
        seed,
        simulation_id,
        fingerprint: format!("{print:016x}"),
        verified,
        summary,
    })
}

/// Re-run a simulation on a plain runner, outside the registry.
async fn replay(rules: Arc<GameRules>, params: RunParams) -> Result<SummaryView> {
    tokio::task::spawn_blocking(move || {
        let runner = SimulationRunner::new(SimulationId::new(), rules, params);
        let handle = runner.handle();
        runner.run();
        handle
            .result()
            .ok_or_else(|| anyhow!("replayed simulation produced no summary"))
    })
    .await
    .context("joining replay worker")?
}

fn short_id(id: SimulationId) -> String {
    id.to_string().chars().take(8).collect()
}
