//! Error types for the game simulation.
//!
//! Only recoverable conditions live here. Broken invariants (double
//! occupancy, unassigning an absent occupant, division by zero) panic
//! instead, because continuing would silently desynchronize lockstep peers.

use thiserror::Error;

use crate::components::{ItemType, ObjectId, TileCoord};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(ObjectId),

    /// Tile outside the map.
    #[error("Tile {0} is outside the map")]
    TileOutOfBounds(TileCoord),

    /// Tile cannot take another occupant of this kind.
    #[error("Tile {tile} cannot hold a {item:?}")]
    TileOccupied {
        /// The requested tile.
        tile: TileCoord,
        /// Item type that was being placed.
        item: ItemType,
    },

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the document that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// A persisted unit or game could not be restored.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Replayed state does not match the recorded state.
    #[error("Desync detected at tick {tick}: recorded hash {expected_hash:016x}, replayed hash {actual_hash:016x}")]
    DesyncDetected {
        /// Tick at which the hashes were compared.
        tick: u64,
        /// Hash stored in the recording.
        expected_hash: u64,
        /// Hash the playback produced.
        actual_hash: u64,
    },
}

/// Failure to restore state from a persistence stream.
///
/// A load either yields a fully consistent value or one of these; nothing
/// is half-constructed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The stream ended before all fields were read.
    #[error("Stream truncated while reading {0}")]
    Truncated(&'static str),

    /// The stream contained bytes that do not decode.
    #[error("Corrupt stream: {0}")]
    Corrupt(String),

    /// The stream does not start with the save magic.
    #[error("Bad magic number: {0:#x}")]
    BadMagic(u32),

    /// The stream was written by an incompatible version.
    #[error("Unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version in the stream.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// A field decoded but holds a value that breaks an invariant.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl LoadError {
    /// Classify a bincode failure while reading `what`.
    #[must_use]
    pub fn from_bincode(what: &'static str, err: &bincode::Error) -> Self {
        match &**err {
            bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                Self::Truncated(what)
            }
            other => Self::Corrupt(format!("{what}: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_is_classified() {
        let bytes = [1u8, 0];
        let err = bincode::deserialize::<u32>(&bytes).unwrap_err();
        assert!(matches!(
            LoadError::from_bincode("header", &err),
            LoadError::Truncated("header")
        ));
    }

    #[test]
    fn test_corrupt_tag_is_classified() {
        let bytes = 7u32.to_le_bytes();
        let err = bincode::deserialize::<Option<u8>>(&bytes).unwrap_err();
        assert!(matches!(
            LoadError::from_bincode("flag", &err),
            LoadError::Corrupt(_)
        ));
    }

    #[test]
    fn test_load_error_converts() {
        let err: GameError = LoadError::BadMagic(0xdead).into();
        assert!(err.to_string().contains("0xdead"));
    }
}
