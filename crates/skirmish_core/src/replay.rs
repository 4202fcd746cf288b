//! Replay system for recording and playing back games.
//!
//! A replay stores a game save of the starting state, the balance data it
//! ran with, and every command issued. Because the simulation is
//! deterministic, that is enough to recreate the whole game.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{ObjectId, UnitCommand};
use crate::data::{BalanceData, BalanceTable};
use crate::error::{GameError, Result};
use crate::simulation::Simulation;

/// A single command record for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Simulation tick at which the command was applied (before that tick ran).
    pub tick: u64,
    /// Commanded unit.
    pub unit: ObjectId,
    /// The command.
    pub command: UnitCommand,
}

impl ReplayCommand {
    /// Create a new replay command record.
    #[must_use]
    pub const fn new(tick: u64, unit: ObjectId, command: UnitCommand) -> Self {
        Self {
            tick,
            unit,
            command,
        }
    }
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Balance data the game ran with.
    pub balance: BalanceData,
    /// Game save of the initial state.
    pub initial_state: Vec<u8>,
    /// Stream of commands in tick order.
    pub commands: Vec<ReplayCommand>,
    /// Tick at which recording stopped.
    pub final_tick: u64,
    /// State hash at `final_tick`.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from a simulation's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Simulation) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            balance: initial_state.balance().to_data(),
            initial_state: initial_state.save()?,
            commands: Vec::new(),
            final_tick: initial_state.get_tick(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Record a command for replay.
    pub fn record_command(&mut self, tick: u64, unit: ObjectId, command: UnitCommand) {
        self.commands.push(ReplayCommand::new(tick, unit, command));
    }

    /// Finalize the replay with end-game state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Encode the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))
    }

    /// Decode a replay and check its version.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode or the version differs.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Rebuild the simulation the replay starts from.
    ///
    /// # Errors
    /// Returns an error if the balance data or the initial save is invalid.
    pub fn restore_initial_state(&self) -> Result<Simulation> {
        let balance = BalanceTable::from_data(&self.balance).map_err(|message| {
            GameError::DataParseError {
                source_name: format!("replay '{}'", self.scenario_id),
                message,
            }
        })?;
        Simulation::load(&self.initial_state, balance)
    }

    /// Get commands for a specific tick.
    #[must_use]
    pub fn commands_at_tick(&self, tick: u64) -> Vec<&ReplayCommand> {
        self.commands.iter().filter(|cmd| cmd.tick == tick).collect()
    }

    /// Get the total number of commands in the replay.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    /// The replay being played.
    replay: Replay,
    /// Current simulation state.
    simulation: Simulation,
    /// Index into the command stream.
    command_index: usize,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Create a new replay player from a replay.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay) -> Result<Self> {
        let simulation = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            simulation,
            command_index: 0,
            paused: false,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if !self.paused && !self.is_finished() {
            self.step();
        }
        !self.is_finished()
    }

    fn step(&mut self) {
        let now = self.simulation.get_tick();
        while let Some(cmd) = self.replay.commands.get(self.command_index) {
            if cmd.tick > now {
                break;
            }
            if let Err(err) = self.simulation.apply_command(cmd.unit, cmd.command) {
                tracing::warn!(tick = now, unit = cmd.unit, %err, "Replay command rejected");
            }
            self.command_index += 1;
        }
        self.simulation.tick();
    }

    /// Seek to a specific tick by replaying from the start.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.simulation = self.replay.restore_initial_state()?;
        self.command_index = 0;

        while self.simulation.get_tick() < target_tick && !self.is_finished() {
            self.step();
        }
        Ok(())
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.simulation.get_tick()
    }

    /// Get a reference to the current simulation state.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.simulation.get_tick() >= self.replay.final_tick
    }

    /// Play to the end and require the recorded final hash.
    ///
    /// # Errors
    /// Returns [`GameError::DesyncDetected`] on a hash mismatch, or an
    /// error if state restoration fails.
    pub fn check(&mut self) -> Result<()> {
        self.seek(self.replay.final_tick)?;
        let actual_hash = self.simulation.state_hash();
        if actual_hash != self.replay.final_hash {
            return Err(GameError::DesyncDetected {
                tick: self.simulation.get_tick(),
                expected_hash: self.replay.final_hash,
                actual_hash,
            });
        }
        Ok(())
    }

    /// Verify the replay produces the expected final hash.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn verify(&mut self) -> Result<bool> {
        match self.check() {
            Ok(()) => Ok(true),
            Err(GameError::DesyncDetected { tick, .. }) => {
                tracing::warn!(tick, "Replay diverged from recording");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{HouseId, ItemType, Owner, TileCoord};
    use crate::math::Fixed;
    use crate::simulation::UnitSpawnParams;

    fn create_test_simulation() -> Simulation {
        let mut sim = Simulation::new(24, 24);
        sim.spawn_unit(UnitSpawnParams {
            item: ItemType::Ornithopter,
            owner: Owner::new(HouseId::Atreides, 0),
            tile: TileCoord::new(2, 2),
            angle: Fixed::ZERO,
        })
        .unwrap();
        sim.spawn_unit(UnitSpawnParams {
            item: ItemType::Trike,
            owner: Owner::new(HouseId::Harkonnen, 1),
            tile: TileCoord::new(12, 12),
            angle: Fixed::ZERO,
        })
        .unwrap();
        sim
    }

    /// Run a recorded game: commands at fixed ticks, then finalize.
    fn record(ticks: u64) -> Replay {
        let mut sim = create_test_simulation();
        let mut replay = Replay::new("test_scenario", &sim).unwrap();
        let orders = [
            (0, 1, UnitCommand::Move(TileCoord::new(10, 10))),
            (15, 2, UnitCommand::Move(TileCoord::new(3, 12))),
            (30, 1, UnitCommand::Stop),
        ];
        for _ in 0..ticks {
            for (tick, unit, command) in orders {
                if tick == sim.get_tick() {
                    sim.apply_command(unit, command).unwrap();
                    replay.record_command(tick, unit, command);
                }
            }
            sim.tick();
        }
        replay.finalize(sim.get_tick(), sim.state_hash());
        replay
    }

    #[test]
    fn test_replay_create() {
        let sim = create_test_simulation();
        let replay = Replay::new("test_scenario", &sim).unwrap();
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.scenario_id, "test_scenario");
        assert!(replay.commands.is_empty());
        assert_eq!(replay.final_tick, 0);
    }

    #[test]
    fn test_replay_record_commands() {
        let replay = record(40);
        assert_eq!(replay.command_count(), 3);
        assert_eq!(replay.commands_at_tick(15).len(), 1);
        assert!(replay.commands_at_tick(7).is_empty());
    }

    #[test]
    fn test_replay_bytes_round_trip() {
        let replay = record(10);
        let decoded = Replay::from_bytes(&replay.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.commands, replay.commands);
        assert_eq!(decoded.final_hash, replay.final_hash);
    }

    #[test]
    fn test_replay_version_check() {
        let mut replay = record(1);
        replay.version = 99;
        assert!(Replay::from_bytes(&replay.to_bytes().unwrap()).is_err());
    }

    #[test]
    fn test_replay_verifies() {
        let mut player = ReplayPlayer::new(record(60)).unwrap();
        assert!(player.verify().unwrap());
        assert!(player.is_finished());
    }

    #[test]
    fn test_tampered_replay_fails_verification() {
        let mut replay = record(60);
        replay.commands.remove(1);
        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(!player.verify().unwrap());
    }

    #[test]
    fn test_tampered_replay_reports_desync() {
        let mut replay = record(60);
        let recorded = replay.final_hash;
        replay.commands.remove(1);
        let mut player = ReplayPlayer::new(replay).unwrap();
        match player.check() {
            Err(GameError::DesyncDetected {
                tick,
                expected_hash,
                actual_hash,
            }) => {
                assert_eq!(tick, 60);
                assert_eq!(expected_hash, recorded);
                assert_ne!(actual_hash, recorded);
            }
            other => panic!("expected a desync, got {other:?}"),
        }
        assert!(ReplayPlayer::new(record(60)).unwrap().check().is_ok());
    }

    #[test]
    fn test_replay_player_advance_and_seek() {
        let mut player = ReplayPlayer::new(record(20)).unwrap();
        for _ in 0..5 {
            assert!(player.advance());
        }
        assert_eq!(player.current_tick(), 5);

        player.seek(12).unwrap();
        assert_eq!(player.current_tick(), 12);
        player.seek(3).unwrap();
        assert_eq!(player.current_tick(), 3);

        while player.advance() {}
        assert!(player.is_finished());
        assert_eq!(player.current_tick(), 20);
    }

    #[test]
    fn test_replay_player_pause() {
        let mut player = ReplayPlayer::new(record(10)).unwrap();
        player.paused = true;
        player.advance();
        assert_eq!(player.current_tick(), 0);

        player.toggle_pause();
        player.advance();
        assert_eq!(player.current_tick(), 1);
    }
}
