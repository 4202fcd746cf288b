//! # Skirmish Core
//!
//! Deterministic unit-movement, combat and tile-occupancy core for a
//! desert-planet RTS.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No audio (effects are requested through [`events`])
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Lockstep multiplayer (identical simulation across clients)
//! - Headless runs and determinism testing
//! - Save games and replays
//!
//! ## Crate Structure
//!
//! - [`math`] - Fixed-point math, trigonometry and angle helpers
//! - [`map`] - Tile grid, occupancy and visibility
//! - [`movement`] - Per-unit movement state machine
//! - [`targeting`] - Who may attack whom
//! - [`unit`] - Unit construction, rendering state and destruction
//! - [`persistence`] - Ordered binary save format
//! - [`simulation`] - Core simulation loop
//! - [`replay`] - Command recording and playback

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod map;
pub mod math;
pub mod movement;
pub mod persistence;
pub mod replay;
pub mod simulation;
pub mod targeting;
pub mod unit;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::data::{BalanceTable, UnitStats, WeaponStats};
    pub use crate::error::{GameError, LoadError, Result};
    pub use crate::events::{DamageEvent, SimEvent, TickEvents};
    pub use crate::map::{Map, OccupancyCategory};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::MotionState;
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::simulation::{Simulation, UnitSpawnParams};
    pub use crate::unit::{SpriteState, Unit};
}
