//! Fire-and-forget requests the simulation hands to its collaborators.
//!
//! The core never plays sounds or draws explosions. It records what should
//! happen in [`TickEvents`] and the caller decides what to do with it.

use serde::{Deserialize, Serialize};

use crate::components::{ObjectId, TileCoord};
use crate::unit_kind::{ExplosionKind, SoundId};

/// One hit dealt by a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Attacking unit.
    pub attacker: ObjectId,
    /// Unit that was hit.
    pub target: ObjectId,
    /// Health removed.
    pub damage: u32,
}

/// A request to an effect collaborator, or a notable state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Spawn an explosion animation at a rounded world position.
    Explosion {
        /// Animation kind.
        kind: ExplosionKind,
        /// World position.
        position: (i32, i32),
    },
    /// Play a sound at a rounded world position.
    Sound {
        /// Sound cue.
        sound: SoundId,
        /// World position.
        position: (i32, i32),
    },
    /// A weapon fired.
    WeaponFired {
        /// Attacking unit.
        attacker: ObjectId,
        /// Unit that was hit.
        target: ObjectId,
        /// Launch sound of the attacker's kind.
        sound: Option<SoundId>,
        /// Attacker's world position.
        position: (i32, i32),
    },
    /// A unit came within reach of its destination.
    DestinationReached {
        /// Unit.
        unit: ObjectId,
        /// The destination that was cleared.
        tile: TileCoord,
    },
    /// A unit drifted too far and is heading back to its guard point.
    ReturningToGuard {
        /// Unit.
        unit: ObjectId,
        /// Guard point.
        tile: TileCoord,
    },
    /// A move was rejected because the next tile is missing or full.
    MoveBlocked {
        /// Unit.
        unit: ObjectId,
        /// Tile it tried to enter.
        tile: TileCoord,
    },
}

/// Everything that happened during one tick, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Weapon hits.
    pub damage_events: Vec<DamageEvent>,
    /// Units destroyed at the end of the tick, in id order.
    pub deaths: Vec<ObjectId>,
    /// Effect requests and movement notifications.
    pub effects: Vec<SimEvent>,
}

impl TickEvents {
    /// Append an effect.
    pub fn push(&mut self, event: SimEvent) {
        self.effects.push(event);
    }

    /// Check whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.damage_events.is_empty() && self.deaths.is_empty() && self.effects.is_empty()
    }
}
