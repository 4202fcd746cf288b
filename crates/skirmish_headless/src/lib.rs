//! Headless scenario runner for CI verification.
//!
//! Runs RON scenarios against the deterministic core without any
//! graphics or audio:
//!
//! - **Scenario runs**: print a JSON summary of the final state
//! - **Determinism checks**: run a scenario several times in parallel
//!   and compare state hashes
//! - **Replay verification**: check that a recorded replay still
//!   reproduces its final hash
//!
//! # Output
//!
//! - **stdout**: JSON reports
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run a scenario and record a replay
//! cargo run -p skirmish_headless -- run --scenario scenarios/desert_raid.ron --replay raid.replay
//!
//! # Verify determinism
//! cargo run -p skirmish_headless -- verify --scenario scenarios/desert_raid.ron --runs 8
//!
//! # Verify a replay
//! cargo run -p skirmish_headless -- replay --file raid.replay
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{run_scenario, verify_replay, verify_scenario, RunOptions, RunSummary};
pub use scenario::{Scenario, ScenarioError};
