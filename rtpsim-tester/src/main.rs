mod logic;
mod presets;
mod util;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use rtpsim_engine::{EngineSettings, SimulationRegistry};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use logic::{
    BatchOptions, ConfigBundle, DEFAULT_SEED, RunOutcome, SeedInfo, load_bundle,
    resolve_seed_inputs, run_batch,
};
use presets::{get_preset, list_presets};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "rtpsim-tester", version = "0.1.0")]
#[command(about = "Run lottery RTP simulations, check their invariants, and report results")]
struct Args {
    /// Built-in game and run configuration
    #[arg(long, default_value = "lotto-6-42")]
    preset: String,

    /// JSON file holding `game_config` and `simulation_config`; overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// List all built-in presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Seeds to run (comma-separated, `random` draws a fresh one)
    #[arg(long)]
    seeds: Option<String>,

    /// Override the configured round count
    #[arg(long)]
    rounds: Option<u64>,

    /// Maximum simulations running at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Milliseconds between progress polls
    #[arg(long, default_value_t = 200)]
    poll_ms: u64,

    /// Replay each completed seed and require an identical summary
    #[arg(long)]
    verify: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_presets(&args)? {
        return Ok(());
    }

    if !report_on_stdout_is_json(&args) {
        announce_banner();
    }

    let start_time = Instant::now();
    let bundle = load_config(&args)?;
    let seeds = resolve_seeds(&args, &bundle)?;
    let registry = Arc::new(SimulationRegistry::new(engine_settings(&args)));
    let options = BatchOptions {
        poll: Duration::from_millis(args.poll_ms.max(1)),
        verify: args.verify,
        verbose: args.verbose,
    };

    let outcomes = run_batch(registry, &bundle, &seeds, options).await?;

    write_reports(&args, &bundle.game_config.name, &outcomes, start_time)?;

    if outcomes.len() < seeds.len() || outcomes.iter().any(|outcome| !outcome.passed()) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_presets(args: &Args) -> Result<bool> {
    if !args.list_presets {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available presets:")?;
    for (key, description) in list_presets() {
        writeln!(output_target.writer(), "  {key:12} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn report_on_stdout_is_json(args: &Args) -> bool {
    args.report == "json" && args.output.is_none()
}

fn announce_banner() {
    println!("{}", "🎲 RTP Simulation Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn load_config(args: &Args) -> Result<ConfigBundle> {
    let bundle = match &args.config {
        Some(path) => load_bundle(path)?,
        None => get_preset(&args.preset).ok_or_else(|| {
            anyhow!(
                "unknown preset {:?}; use --list-presets to see the choices",
                args.preset
            )
        })?,
    };
    Ok(bundle.with_rounds(args.rounds))
}

fn resolve_seeds(args: &Args, bundle: &ConfigBundle) -> Result<Vec<SeedInfo>> {
    let fallback = bundle.simulation_config.seed.unwrap_or(DEFAULT_SEED);
    let tokens = args.seeds.as_deref().map(split_csv).unwrap_or_default();
    resolve_seed_inputs(&tokens, fallback).context("invalid --seeds")
}

fn engine_settings(args: &Args) -> EngineSettings {
    let defaults = EngineSettings::default();
    EngineSettings {
        max_concurrent_runs: args
            .max_concurrent
            .unwrap_or(defaults.max_concurrent_runs)
            .max(1),
        ..defaults
    }
}

fn write_reports(
    args: &Args,
    game: &str,
    outcomes: &[RunOutcome],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    if args.report.as_str() == "json" {
        logic::reports::generate_json_report(&mut output_target, game, outcomes)?;
    } else {
        let duration = start_time.elapsed();
        if outcomes.is_empty() {
            writeln!(&mut output_target, "No simulations completed.")?;
        } else {
            logic::reports::generate_console_report(&mut output_target, game, outcomes, duration)?;
        }
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            preset: "single-bet".to_string(),
            config: None,
            list_presets: false,
            seeds: None,
            rounds: None,
            max_concurrent: None,
            poll_ms: 5,
            verify: false,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn run(args: &Args) -> Vec<RunOutcome> {
        let bundle = load_config(args).unwrap();
        let seeds = resolve_seeds(args, &bundle).unwrap();
        let options = BatchOptions {
            poll: Duration::from_millis(args.poll_ms),
            verify: args.verify,
            verbose: args.verbose,
        };
        tokio_test::block_on(run_batch(
            Arc::new(SimulationRegistry::new(engine_settings(args))),
            &bundle,
            &seeds,
            options,
        ))
        .unwrap()
    }

    #[test]
    fn seeds_fall_back_to_the_configured_seed() {
        let args = base_args();
        let bundle = load_config(&args).unwrap();
        let seeds = resolve_seeds(&args, &bundle).unwrap();
        assert_eq!(seeds, vec![SeedInfo::from_numeric(1)]);
    }

    #[test]
    fn explicit_seeds_replace_the_configured_seed() {
        let args = Args {
            seeds: Some("5, 6,5".to_string()),
            ..base_args()
        };
        let bundle = load_config(&args).unwrap();
        let seeds: Vec<u64> = resolve_seeds(&args, &bundle)
            .unwrap()
            .into_iter()
            .map(|info| info.seed)
            .collect();
        assert_eq!(seeds, vec![5, 6]);
    }

    #[test]
    fn rounds_override_applies_to_presets() {
        let args = Args {
            preset: "pick-3".to_string(),
            rounds: Some(12),
            ..base_args()
        };
        assert_eq!(load_config(&args).unwrap().simulation_config.rounds, 12);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let args = Args {
            preset: "keno".to_string(),
            ..base_args()
        };
        let err = load_config(&args).unwrap_err();
        assert!(err.to_string().contains("keno"));
    }

    #[test]
    fn engine_settings_never_drop_below_one_slot() {
        let args = Args {
            max_concurrent: Some(0),
            ..base_args()
        };
        assert_eq!(engine_settings(&args).max_concurrent_runs, 1);
        assert_eq!(
            engine_settings(&base_args()).max_concurrent_runs,
            EngineSettings::default().max_concurrent_runs
        );
    }

    #[test]
    fn banner_is_suppressed_only_for_json_on_stdout() {
        assert!(report_on_stdout_is_json(&base_args()));
        let to_file = Args {
            output: Some(PathBuf::from("report.json")),
            ..base_args()
        };
        assert!(!report_on_stdout_is_json(&to_file));
        let console = Args {
            report: "console".to_string(),
            ..base_args()
        };
        assert!(!report_on_stdout_is_json(&console));
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = std::env::temp_dir().join("rtpsim-test-report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        let outcomes = run(&args);
        write_reports(&args, "Single Bet", &outcomes, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["runs"][0]["summary"]["total_rounds"], 1);
        assert_eq!(value["runs"][0]["summary"]["total_bets"], 1);
    }

    #[test]
    fn write_reports_console_without_outcomes() {
        let temp = std::env::temp_dir().join("rtpsim-empty-report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, "Single Bet", &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No simulations completed"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn maybe_list_presets_writes_output() {
        let temp = std::env::temp_dir().join("rtpsim-presets.txt");
        let args = Args {
            list_presets: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_presets(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available presets"));
        assert!(content.contains("lotto-6-42"));
    }

    #[test]
    fn maybe_list_presets_returns_false_when_disabled() {
        assert!(!maybe_list_presets(&base_args()).unwrap());
    }

    #[test]
    fn config_file_overrides_preset() {
        let temp = std::env::temp_dir().join("rtpsim-config-override.json");
        let mut bundle = get_preset("pick-3").unwrap();
        bundle.game_config.name = "Pick 3 From Disk".to_string();
        std::fs::write(&temp, serde_json::to_string(&bundle).unwrap()).unwrap();
        let args = Args {
            config: Some(temp),
            rounds: Some(30),
            verify: true,
            ..base_args()
        };
        let outcomes = run(&args);
        assert_eq!(outcomes[0].summary.game_name, "Pick 3 From Disk");
        assert_eq!(outcomes[0].summary.total_rounds, 30);
        assert_eq!(outcomes[0].verified, Some(true));
    }
}
