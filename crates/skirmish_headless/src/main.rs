//! Headless skirmish runner.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in scenario
//! cargo run -p skirmish_headless -- run
//!
//! # Run a scenario file, writing a save and a replay
//! cargo run -p skirmish_headless -- run --scenario scenarios/desert_raid.ron \
//!     --save raid.sav --replay raid.replay
//!
//! # Check determinism across 8 parallel runs
//! cargo run -p skirmish_headless -- verify --scenario scenarios/desert_raid.ron --runs 8
//!
//! # Verify a replay
//! cargo run -p skirmish_headless -- replay --file raid.replay
//! ```
//!
//! Reports go to stdout as JSON. Logs go to stderr; set `RUST_LOG` to
//! change the filter.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_headless::runner::{inspect_save, run_scenario, verify_replay, verify_scenario, RunOptions};
use skirmish_headless::scenario::{Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for determinism checks and replays")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print a summary
    Run {
        /// Scenario file (built-in desert raid if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's tick count
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Write a game save when the run ends
        #[arg(long)]
        save: Option<PathBuf>,

        /// Record a replay
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Run a scenario several times in parallel and compare final hashes
    Verify {
        /// Scenario file (built-in desert raid if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: usize,

        /// Override the scenario's tick count
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Verify that a replay reproduces its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Load a game save and print its state
    Inspect {
        /// Save file path
        #[arg(short, long)]
        file: PathBuf,

        /// Scenario whose balance data the save was made with
        #[arg(short, long)]
        scenario: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for reports.
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            ticks,
            save,
            replay,
        } => cmd_run(scenario.as_deref(), ticks, save, replay, cli.pretty),
        Commands::Verify {
            scenario,
            runs,
            ticks,
        } => cmd_verify(scenario.as_deref(), runs, ticks, cli.pretty),
        Commands::Replay { file } => cmd_replay(&file, cli.pretty),
        Commands::Inspect { file, scenario } => cmd_inspect(&file, scenario.as_deref(), cli.pretty),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(%err, "Command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => Scenario::load(path),
        None => Ok(Scenario::default()),
    }
}

fn print_json<T: Serialize>(report: &T, pretty: bool) -> Result<(), ScenarioError> {
    let json = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .map_err(std::io::Error::from)?;
    println!("{json}");
    Ok(())
}

/// Run a single scenario
fn cmd_run(
    scenario: Option<&Path>,
    ticks: Option<u64>,
    save_path: Option<PathBuf>,
    replay_path: Option<PathBuf>,
    pretty: bool,
) -> Result<bool, ScenarioError> {
    let scenario = load_scenario(scenario)?;
    let options = RunOptions {
        ticks,
        save_path,
        replay_path,
    };
    let summary = run_scenario(&scenario, &options)?;
    print_json(&summary, pretty)?;
    Ok(true)
}

/// Verify determinism across parallel runs
fn cmd_verify(
    scenario: Option<&Path>,
    runs: usize,
    ticks: Option<u64>,
    pretty: bool,
) -> Result<bool, ScenarioError> {
    let scenario = load_scenario(scenario)?;
    tracing::info!(scenario = %scenario.name, runs, "Verifying determinism");

    let report = verify_scenario(&scenario, runs, ticks)?;
    print_json(&report, pretty)?;
    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
    }
    Ok(report.deterministic)
}

/// Verify a recorded replay
fn cmd_replay(file: &Path, pretty: bool) -> Result<bool, ScenarioError> {
    tracing::info!(path = %file.display(), "Verifying replay");

    let report = verify_replay(file)?;
    print_json(&report, pretty)?;
    if report.verified {
        eprintln!("PASS: Replay verification successful");
    } else {
        eprintln!("FAIL: Replay produced different hash!");
        eprintln!("  Expected: {}", report.expected_hash);
        eprintln!("  Actual:   {}", report.actual_hash);
    }
    Ok(report.verified)
}

/// Describe a game save
fn cmd_inspect(file: &Path, scenario: Option<&Path>, pretty: bool) -> Result<bool, ScenarioError> {
    let scenario = load_scenario(scenario)?;
    let summary = inspect_save(file, &scenario)?;
    print_json(&summary, pretty)?;
    Ok(true)
}
