//! Errors raised by misuse of the map API.
//!
//! Every variant is a contract violation by the caller. Operations fail
//! immediately and never clip or repair their arguments. A blocked ray or
//! an unreachable cell is a normal result, not an error.

use thiserror::Error;
use tilesight_core::Point;

use crate::monitor::WatchTarget;
use crate::object::ObjectId;

/// Errors that can occur when querying or mutating a [`Map`](crate::Map).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A coordinate lies outside the map.
    #[error("position {pos} is outside the {cols}x{rows} map")]
    OutOfBounds { pos: Point, cols: i32, rows: i32 },
    /// A watch target does not resolve to a location on the map.
    #[error("watch target {0:?} is not on the map")]
    InvalidWatchTarget(WatchTarget),
    /// The object already belongs to a tile and must be removed first.
    #[error("object {object} already belongs to the tile at {pos}")]
    AlreadyMemberOfCell { object: ObjectId, pos: Point },
    /// The object is not a member of the tile it was removed from.
    #[error("object {object} is not in the tile at {pos}")]
    NotMemberOfCell { object: ObjectId, pos: Point },
    /// A negative radius was given to a visibility or light computation.
    #[error("radius must be non-negative, got {0}")]
    DegenerateRadius(i32),
    /// The object id was never registered with this map, or was destroyed.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    /// A snapshot lists the same object id twice.
    #[error("object {0} appears more than once")]
    DuplicateObject(ObjectId),
    /// A light's intensity is negative or not finite, or its falloff or
    /// cut-off is not a finite positive number.
    #[error("invalid light {name}: {value}")]
    InvalidLight { name: &'static str, value: String },
    /// A map must have at least one column and one row.
    #[error("invalid map size {cols}x{rows}")]
    InvalidSize { cols: i32, rows: i32 },
}
