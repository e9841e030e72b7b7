//! Error types for the world graph.

use crate::{Direction, RoomId};

/// Errors that can occur during graph operations.
///
/// "No path between two known rooms" is not an error: path queries return
/// `Ok(None)` for that.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// An operation named a room the graph has never seen.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// No edge leaves `from` in `direction`.
    #[error("no edge from room {from} going {direction}")]
    EdgeNotFound { from: RoomId, direction: Direction },

    /// A direction token outside the known vocabulary.
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),

    /// A speedwalk string that could not be expanded.
    #[error("invalid route {0:?}")]
    InvalidRoute(String),

    /// Reading or writing a map file failed.
    #[error("map file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A map file was not valid JSON, or not a map.
    #[error("map serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A map file written by an incompatible format version.
    #[error("unsupported map format version {0:?}")]
    UnsupportedVersion(String),
}
