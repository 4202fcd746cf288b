//! File-level tests for the headless runner: scenario files, saves and
//! replays on disk.

use std::path::PathBuf;

use skirmish_core::data::BalanceTable;
use skirmish_core::replay::Replay;
use skirmish_headless::runner::{inspect_save, run_scenario, verify_replay, verify_scenario, RunOptions};
use skirmish_headless::scenario::{Scenario, ScenarioError};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn shipped_balance_matches_builtin_defaults() {
    let scenario = Scenario::load(scenario_path("desert_raid.ron")).unwrap();
    assert_eq!(scenario.balance_table().unwrap(), BalanceTable::standard());
}

#[test]
fn shipped_scenarios_run() {
    for name in ["desert_raid.ron", "ordos_patrol.ron"] {
        let scenario = Scenario::load(scenario_path(name)).unwrap();
        let summary = run_scenario(&scenario, &RunOptions::default()).unwrap();
        assert_eq!(summary.tick, scenario.ticks, "{name}");
        assert_eq!(summary.rejected_orders, 0, "{name}");
    }
}

#[test]
fn file_scenario_matches_builtin() {
    let from_file = Scenario::load(scenario_path("desert_raid.ron")).unwrap();
    let options = RunOptions {
        ticks: Some(200),
        ..RunOptions::default()
    };
    let a = run_scenario(&from_file, &options).unwrap();
    let b = run_scenario(&Scenario::desert_raid(), &options).unwrap();
    assert_eq!(a.state_hash, b.state_hash);
}

#[test]
fn save_and_replay_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("raid.sav");
    let replay_path = dir.path().join("raid.replay");

    let scenario = Scenario::desert_raid();
    let options = RunOptions {
        ticks: Some(250),
        save_path: Some(save_path.clone()),
        replay_path: Some(replay_path.clone()),
    };
    let summary = run_scenario(&scenario, &options).unwrap();

    let replay = Replay::load(&replay_path).unwrap();
    assert_eq!(replay.final_tick, 250);
    assert_eq!(replay.command_count(), 4);

    let report = verify_replay(&replay_path).unwrap();
    assert!(report.verified);
    assert_eq!(report.actual_hash, summary.state_hash);

    let inspected = inspect_save(&save_path, &scenario).unwrap();
    assert_eq!(inspected.state_hash, summary.state_hash);
    assert_eq!(inspected.tick, 250);
    assert_eq!(inspected.units.len(), summary.units.len());
}

#[test]
fn tampered_replay_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let replay_path = dir.path().join("raid.replay");
    let options = RunOptions {
        ticks: Some(120),
        replay_path: Some(replay_path.clone()),
        ..RunOptions::default()
    };
    run_scenario(&Scenario::desert_raid(), &options).unwrap();

    let mut replay = Replay::load(&replay_path).unwrap();
    replay.commands.retain(|command| command.tick != 0);
    replay.save(&replay_path).unwrap();

    assert!(!verify_replay(&replay_path).unwrap().verified);
}

#[test]
fn corrupt_save_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("broken.sav");
    std::fs::write(&save_path, [1u8, 2, 3]).unwrap();

    assert!(matches!(
        inspect_save(&save_path, &Scenario::default()),
        Err(ScenarioError::Game(_))
    ));
}

#[test]
fn parallel_runs_agree() {
    let scenario = Scenario::load(scenario_path("ordos_patrol.ron")).unwrap();
    let report = verify_scenario(&scenario, 6, Some(400)).unwrap();
    assert_eq!(report.runs, 6);
    assert_eq!(report.hashes.len(), 6);
    assert!(report.deterministic);
}

#[test]
fn bad_balance_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("balance.ron"), "BalanceData(units: [])").unwrap();
    let scenario_file = dir.path().join("s.ron");
    std::fs::write(
        &scenario_file,
        r#"Scenario(name: "x", map_size: (4, 4), balance: Some("balance.ron"), units: [], ticks: 1)"#,
    )
    .unwrap();

    let scenario = Scenario::load(&scenario_file).unwrap();
    assert!(matches!(
        run_scenario(&scenario, &RunOptions::default()),
        Err(ScenarioError::Game(skirmish_core::error::GameError::DataParseError { .. }))
    ));
}
