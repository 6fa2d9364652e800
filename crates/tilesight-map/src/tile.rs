//! A single map position and the objects it holds.

use tilesight_core::{Light, Point};

use crate::object::{ObjectEntry, ObjectId};

/// One cell of a [`Map`](crate::Map).
///
/// A tile holds non-owning membership of objects (the map's object arena
/// owns them). The blocking flags are recomputed whenever the membership
/// changes, so they always agree with the current contents.
#[derive(Debug, Clone)]
pub struct Tile {
    pos: Point,
    contents: Vec<ObjectId>,
    blocks_los: bool,
    blocks_move: bool,
    light: Light,
}

impl Tile {
    pub(crate) fn new(pos: Point) -> Self {
        Self {
            pos,
            contents: Vec::new(),
            blocks_los: false,
            blocks_move: false,
            light: Light::ZERO,
        }
    }

    /// Position of the tile on its map.
    #[inline]
    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Objects in the tile, in insertion order.
    #[inline]
    pub fn objects(&self) -> &[ObjectId] {
        &self.contents
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.contents.contains(&id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether any object in the tile blocks line of sight.
    #[inline]
    pub fn blocks_los(&self) -> bool {
        self.blocks_los
    }

    /// Whether any object in the tile blocks movement.
    #[inline]
    pub fn blocks_move(&self) -> bool {
        self.blocks_move
    }

    /// Light accumulated on the tile from all sources.
    #[inline]
    pub fn light(&self) -> Light {
        self.light
    }

    pub(crate) fn push(&mut self, id: ObjectId, arena: &[Option<ObjectEntry>]) {
        self.contents.push(id);
        self.refresh_flags(arena);
    }

    pub(crate) fn take(&mut self, id: ObjectId, arena: &[Option<ObjectEntry>]) -> bool {
        let Some(i) = self.contents.iter().position(|&o| o == id) else {
            return false;
        };
        self.contents.remove(i);
        self.refresh_flags(arena);
        true
    }

    pub(crate) fn refresh_flags(&mut self, arena: &[Option<ObjectEntry>]) {
        self.blocks_los = false;
        self.blocks_move = false;
        for id in &self.contents {
            if let Some(Some(entry)) = arena.get(id.0 as usize) {
                self.blocks_los |= entry.object.blocks_los;
                self.blocks_move |= entry.object.blocks_move;
            }
        }
    }

    pub(crate) fn add_light(&mut self, delta: Light) {
        self.light += delta;
    }

    pub(crate) fn sub_light(&mut self, delta: Light) {
        self.light -= delta;
    }
}
