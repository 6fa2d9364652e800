//! Tile-grid visibility for tilesight: field of view, line of sight,
//! proximity monitoring and light propagation.
//!
//! A [`Map`] owns its tiles and an arena of [`MapObject`]s. Opacity comes
//! from the objects on each tile. Consumers that need to react to changes
//! register proximity watches and receive batched [`DirtyBatch`]es once per
//! turn, from which [`VisibilityState`] and [`LightSource`] recompute only
//! what changed.

pub mod bresenham;
pub mod error;
pub mod fov;
pub mod light;
pub mod los;
pub mod map;
pub mod monitor;
pub mod object;
pub mod snapshot;
pub mod tile;
pub mod visibility;

pub use error::MapError;
pub use fov::{Fov, Quadrant, Quadrants};
pub use light::{LightSource, MIN_INTENSITY};
pub use map::Map;
pub use monitor::{Condition, DirtyBatch, DirtyEntry, NearbyListener, WatchId, WatchTarget};
pub use object::{MapObject, ObjectId};
pub use snapshot::{MapSnapshot, ObjectSnapshot};
pub use tile::Tile;
pub use tilesight_core::{Light, Point, Range, Rgb};
pub use visibility::{ViewConfig, VisibilityChange, VisibilityState};
