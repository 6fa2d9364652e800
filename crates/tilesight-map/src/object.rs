//! Objects that can be placed on map tiles.

use std::fmt;

/// Handle to an object registered with a [`Map`](crate::Map).
///
/// Ids are allocated by [`Map::insert_object`](crate::Map::insert_object)
/// and are never reused by the same map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The map-relevant capabilities of a game object.
///
/// Game types keep one of these (or build one on demand) rather than
/// exposing their own fields to the map. `layer` only matters to
/// renderers; the visibility code reads the two blocking flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapObject {
    pub layer: i32,
    pub blocks_los: bool,
    pub blocks_move: bool,
}

impl MapObject {
    /// A non-blocking object on the given display layer.
    #[inline]
    pub const fn new(layer: i32) -> Self {
        Self {
            layer,
            blocks_los: false,
            blocks_move: false,
        }
    }

    /// Set whether the object blocks line of sight (builder).
    #[inline]
    pub const fn with_blocks_los(mut self, blocks: bool) -> Self {
        self.blocks_los = blocks;
        self
    }

    /// Set whether the object blocks movement (builder).
    #[inline]
    pub const fn with_blocks_move(mut self, blocks: bool) -> Self {
        self.blocks_move = blocks;
        self
    }

    /// An object that blocks both sight and movement, like a wall.
    #[inline]
    pub const fn solid(layer: i32) -> Self {
        Self::new(layer).with_blocks_los(true).with_blocks_move(true)
    }
}

/// Arena slot for a registered object.
#[derive(Debug, Clone)]
pub(crate) struct ObjectEntry {
    pub(crate) object: MapObject,
    /// Position of the tile holding the object, if placed.
    pub(crate) parent: Option<tilesight_core::Point>,
}
