//! Scenario execution, determinism checks and replay verification.
//!
//! Every entry point returns a serializable report; `main` prints it as
//! JSON on stdout.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use skirmish_core::components::{Destination, HouseId, ItemType, ObjectId, TeamId};
use skirmish_core::events::{SimEvent, TickEvents};
use skirmish_core::replay::{Replay, ReplayPlayer};
use skirmish_core::simulation::Simulation;
use skirmish_core::unit::Unit;
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, ScenarioError};

/// Optional outputs of a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Override the scenario's tick count.
    pub ticks: Option<u64>,
    /// Write a game save here when the run ends.
    pub save_path: Option<PathBuf>,
    /// Record a replay here.
    pub replay_path: Option<PathBuf>,
}

/// Final state of one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// Object id.
    pub id: ObjectId,
    /// Unit type.
    pub item: ItemType,
    /// Owning house.
    pub house: HouseId,
    /// Team.
    pub team: TeamId,
    /// World position, rounded.
    pub position: (i32, i32),
    /// Current tile.
    pub tile: (i32, i32),
    /// Heading in degrees256, for display only.
    pub heading: f64,
    /// Sprite direction bucket.
    pub drawn_angle: u8,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Tile the unit is heading for, if any.
    pub destination: Option<(i32, i32)>,
    /// Movement state name.
    pub motion: String,
}

impl From<&Unit> for UnitReport {
    fn from(unit: &Unit) -> Self {
        let location = unit.location();
        Self {
            id: unit.id(),
            item: unit.item(),
            house: unit.owner().house,
            team: unit.owner().team,
            position: unit.position().rounded(),
            tile: (location.x, location.y),
            heading: unit.angle().to_num(),
            drawn_angle: unit.drawn_angle(),
            health: unit.health().current,
            max_health: unit.health().max,
            destination: match unit.destination() {
                Destination::Order(tile) | Destination::GuardReturn(tile) => Some((tile.x, tile.y)),
                Destination::Invalid => None,
            },
            motion: format!("{:?}", unit.motion()),
        }
    }
}

/// Totals of the events a run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    /// Shots fired.
    pub shots: u32,
    /// Damage dealt.
    pub damage: u64,
    /// Explosions requested.
    pub explosions: u32,
    /// Sounds requested, shots included.
    pub sounds: u32,
    /// Moves rejected by occupancy.
    pub blocked_moves: u32,
    /// Destinations reached.
    pub arrivals: u32,
}

impl EventCounts {
    fn record(&mut self, events: &TickEvents) {
        self.damage += events
            .damage_events
            .iter()
            .map(|event| u64::from(event.damage))
            .sum::<u64>();
        for effect in &events.effects {
            match effect {
                SimEvent::WeaponFired { sound, .. } => {
                    self.shots += 1;
                    self.sounds += u32::from(sound.is_some());
                }
                SimEvent::Explosion { .. } => self.explosions += 1,
                SimEvent::Sound { .. } => self.sounds += 1,
                SimEvent::MoveBlocked { .. } => self.blocked_moves += 1,
                SimEvent::DestinationReached { .. } => self.arrivals += 1,
                SimEvent::ReturningToGuard { .. } => {}
            }
        }
    }
}

/// Result of running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Final tick.
    pub tick: u64,
    /// Final state hash, hex encoded.
    pub state_hash: String,
    /// Orders the simulation rejected.
    pub rejected_orders: u32,
    /// Units destroyed, in order.
    pub destroyed: Vec<ObjectId>,
    /// Event totals.
    pub events: EventCounts,
    /// Surviving units in id order.
    pub units: Vec<UnitReport>,
    #[serde(skip)]
    hash: u64,
}

impl RunSummary {
    /// Final state hash.
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.hash
    }
}

/// Run a scenario to completion.
///
/// # Errors
///
/// Fails if the scenario cannot be built, an order names an unknown
/// placement, or an output file cannot be written. Orders the simulation
/// rejects are logged and counted, not fatal.
pub fn run_scenario(scenario: &Scenario, options: &RunOptions) -> Result<RunSummary, ScenarioError> {
    let prepared = scenario.prepare()?;
    let mut orders = Vec::with_capacity(scenario.orders.len());
    for (index, order) in scenario.orders.iter().enumerate() {
        let (unit, command) = prepared.resolve(index, order)?;
        orders.push((order.tick, unit, command));
    }
    // Stable: orders given for the same tick keep file order.
    orders.sort_by_key(|(tick, _, _)| *tick);

    let mut sim = prepared.simulation;
    let mut replay = match options.replay_path {
        Some(_) => Some(Replay::new(scenario.name.clone(), &sim)?),
        None => None,
    };

    let ticks = options.ticks.unwrap_or(scenario.ticks);
    let mut pending = orders.into_iter().peekable();
    let mut rejected_orders = 0;
    let mut destroyed = Vec::new();
    let mut counts = EventCounts::default();

    info!(scenario = %scenario.name, ticks, units = sim.storage().len(), "Running scenario");

    for _ in 0..ticks {
        let now = sim.get_tick();
        while let Some((_, unit, command)) = pending.next_if(|(tick, _, _)| *tick <= now) {
            match sim.apply_command(unit, command) {
                Ok(()) => {
                    if let Some(replay) = replay.as_mut() {
                        replay.record_command(now, unit, command);
                    }
                }
                Err(err) => {
                    warn!(tick = now, unit, ?command, %err, "Order rejected");
                    rejected_orders += 1;
                }
            }
        }

        let events = sim.tick();
        counts.record(&events);
        for &id in &events.deaths {
            debug!(tick = now, unit = id, "Unit destroyed");
        }
        destroyed.extend(events.deaths);
    }

    let hash = sim.state_hash();

    if let Some(path) = &options.save_path {
        std::fs::write(path, sim.save()?)?;
        info!(path = %path.display(), "Game saved");
    }
    if let (Some(mut replay), Some(path)) = (replay, &options.replay_path) {
        replay.finalize(sim.get_tick(), hash);
        replay.save(path)?;
        info!(path = %path.display(), commands = replay.command_count(), "Replay written");
    }

    Ok(RunSummary {
        scenario: scenario.name.clone(),
        tick: sim.get_tick(),
        state_hash: format!("{hash:016x}"),
        rejected_orders,
        destroyed,
        events: counts,
        units: sim.units().map(UnitReport::from).collect(),
        hash,
    })
}

/// Result of a determinism check.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Number of runs.
    pub runs: usize,
    /// Ticks per run.
    pub ticks: u64,
    /// Final hash of every run, hex encoded.
    pub hashes: Vec<String>,
    /// Whether every run ended in the same state.
    pub deterministic: bool,
}

/// Run a scenario `runs` times on the rayon pool and compare final hashes.
///
/// # Errors
///
/// Fails if any run fails.
pub fn verify_scenario(
    scenario: &Scenario,
    runs: usize,
    ticks: Option<u64>,
) -> Result<VerifyReport, ScenarioError> {
    let options = RunOptions {
        ticks,
        ..RunOptions::default()
    };
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| run_scenario(scenario, &options).map(|summary| summary.hash()))
        .collect::<Result<Vec<u64>, ScenarioError>>()?;

    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(scenario = %scenario.name, ?hashes, "Runs diverged");
    }

    Ok(VerifyReport {
        scenario: scenario.name.clone(),
        runs,
        ticks: ticks.unwrap_or(scenario.ticks),
        hashes: hashes.iter().map(|hash| format!("{hash:016x}")).collect(),
        deterministic,
    })
}

/// Result of replay verification.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Scenario the replay was recorded from.
    pub scenario: String,
    /// Recorded commands.
    pub commands: usize,
    /// Final tick.
    pub final_tick: u64,
    /// Hash stored in the replay.
    pub expected_hash: String,
    /// Hash the playback produced.
    pub actual_hash: String,
    /// Whether they match.
    pub verified: bool,
}

/// Play a replay file back and compare the final state hash.
///
/// # Errors
///
/// Fails if the replay cannot be read or its initial state cannot be
/// restored.
pub fn verify_replay(path: &Path) -> Result<ReplayReport, ScenarioError> {
    let replay = Replay::load(path)?;
    info!(
        scenario = %replay.scenario_id,
        commands = replay.command_count(),
        final_tick = replay.final_tick,
        "Replay loaded"
    );

    let mut player = ReplayPlayer::new(replay)?;
    let verified = player.verify()?;
    let replay = player.replay();

    Ok(ReplayReport {
        scenario: replay.scenario_id.clone(),
        commands: replay.command_count(),
        final_tick: replay.final_tick,
        expected_hash: format!("{:016x}", replay.final_hash),
        actual_hash: format!("{:016x}", player.simulation().state_hash()),
        verified,
    })
}

/// Load a game save and describe it.
///
/// # Errors
///
/// Fails if the file cannot be read or does not load.
pub fn inspect_save(path: &Path, scenario: &Scenario) -> Result<RunSummary, ScenarioError> {
    let bytes = std::fs::read(path)?;
    let sim = Simulation::load(&bytes, scenario.balance_table()?)?;
    let hash = sim.state_hash();
    Ok(RunSummary {
        scenario: scenario.name.clone(),
        tick: sim.get_tick(),
        state_hash: format!("{hash:016x}"),
        rejected_orders: 0,
        destroyed: Vec::new(),
        events: EventCounts::default(),
        units: sim.units().map(UnitReport::from).collect(),
        hash,
    })
}
