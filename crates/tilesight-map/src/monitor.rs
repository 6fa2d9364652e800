//! Proximity monitoring.
//!
//! A watch follows a target (an object or a fixed point) and collects the
//! objects that were added to or removed from a tile within its radius.
//! Events are batched per watch until [`Map::flush_dirty`] drains them, so
//! a consumer can work out the minimal set of dirty [`Quadrants`] once per
//! turn instead of reacting to each event.
//!
//! [`Map::flush_dirty`]: crate::Map::flush_dirty

use std::collections::BTreeMap;
use std::fmt;

use tilesight_core::Point;

use crate::error::MapError;
use crate::fov::Quadrants;
use crate::map::Map;
use crate::object::{MapObject, ObjectId};

/// What a watch is centred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// The current position of a placed object. Follows it when it moves.
    Object(ObjectId),
    /// A fixed map position.
    Point(Point),
}

impl From<ObjectId> for WatchTarget {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl From<Point> for WatchTarget {
    fn from(p: Point) -> Self {
        Self::Point(p)
    }
}

/// Handle to a registered watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u32);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

/// Filter deciding which objects a watch cares about.
pub type Condition = Box<dyn Fn(ObjectId, &MapObject) -> bool>;

/// Condition matching objects that block line of sight.
pub fn blocks_los() -> Condition {
    Box::new(|_: ObjectId, obj: &MapObject| obj.blocks_los)
}

/// One object that changed near a watch since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyEntry {
    pub object: ObjectId,
    /// Position of the latest event for the object.
    pub pos: Point,
    /// Position of the first event for the object in this interval.
    /// Differs from `pos` when the object moved more than once.
    pub first_pos: Point,
}

/// All changes collected by one watch since the last flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyBatch {
    pub watch: WatchId,
    pub target: WatchTarget,
    /// Where the target was when the batch was flushed, if it is on the map.
    pub origin: Option<Point>,
    /// Changed objects, ordered by id, one entry per object.
    pub entries: Vec<DirtyEntry>,
}

impl DirtyBatch {
    /// Whether the batch holds an event for `id`.
    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.entries.iter().any(|e| e.object == id)
    }

    /// The quadrants around the target that need recomputing.
    ///
    /// If the watched object itself moved, or it is no longer on the map,
    /// everything is dirty.
    pub fn dirty_quadrants(&self) -> Quadrants {
        let Some(origin) = self.origin else {
            return Quadrants::ALL;
        };
        if let WatchTarget::Object(id) = self.target {
            if self.contains_object(id) {
                return Quadrants::ALL;
            }
        }
        let mut qs = Quadrants::NONE;
        for e in &self.entries {
            qs.extend_with(Quadrants::touched_by(e.pos, origin));
            qs.extend_with(Quadrants::touched_by(e.first_pos, origin));
        }
        qs
    }
}

/// A consumer of dirty batches, routed by [`Map::dispatch_dirty`].
///
/// [`Map::dispatch_dirty`]: crate::Map::dispatch_dirty
pub trait NearbyListener {
    /// The watch this listener owns, if it currently has one.
    fn watch_id(&self) -> Option<WatchId>;

    /// React to the changes collected by the listener's watch.
    fn on_nearby(&mut self, map: &mut Map, batch: &DirtyBatch) -> Result<(), MapError>;
}

// ── Registry ──────────────────────────────────────────────────────

struct Watch {
    id: WatchId,
    target: WatchTarget,
    radius: i32,
    condition: Option<Condition>,
    dirty: BTreeMap<ObjectId, DirtyEntry>,
}

/// The watches registered on a map.
#[derive(Default)]
pub(crate) struct Monitor {
    watches: Vec<Watch>,
    next_id: u32,
}

impl Monitor {
    pub(crate) fn insert(
        &mut self,
        target: WatchTarget,
        radius: i32,
        condition: Option<Condition>,
    ) -> WatchId {
        let id = WatchId(self.next_id);
        self.next_id += 1;
        self.watches.push(Watch {
            id,
            target,
            radius,
            condition,
            dirty: BTreeMap::new(),
        });
        id
    }

    pub(crate) fn remove(&mut self, id: WatchId) -> bool {
        let before = self.watches.len();
        self.watches.retain(|w| w.id != id);
        self.watches.len() != before
    }

    pub(crate) fn remove_target(&mut self, target: WatchTarget) -> usize {
        let before = self.watches.len();
        self.watches.retain(|w| w.target != target);
        before - self.watches.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.watches.len()
    }

    pub(crate) fn radius(&self, id: WatchId) -> Option<i32> {
        self.watches.iter().find(|w| w.id == id).map(|w| w.radius)
    }

    /// Record an add or remove of `object` at `pos` with every watch that
    /// cares about it.
    pub(crate) fn record(
        &mut self,
        object: ObjectId,
        obj: &MapObject,
        pos: Point,
        resolve: impl Fn(WatchTarget) -> Option<Point>,
    ) {
        for w in &mut self.watches {
            let Some(center) = resolve(w.target) else {
                log::trace!(
                    "{}: target {:?} not on map, event for {object} skipped",
                    w.id,
                    w.target
                );
                continue;
            };
            if !center.within(pos, w.radius) {
                continue;
            }
            if !w.condition.as_ref().is_none_or(|cond| cond(object, obj)) {
                continue;
            }
            log::trace!("{}: {object} changed at {pos}", w.id);
            w.dirty
                .entry(object)
                .and_modify(|e| e.pos = pos)
                .or_insert(DirtyEntry {
                    object,
                    pos,
                    first_pos: pos,
                });
        }
    }

    /// Take every non-empty dirty set, leaving them all empty.
    pub(crate) fn drain(
        &mut self,
        resolve: impl Fn(WatchTarget) -> Option<Point>,
    ) -> Vec<DirtyBatch> {
        let mut batches = Vec::new();
        for w in &mut self.watches {
            if w.dirty.is_empty() {
                continue;
            }
            let entries = std::mem::take(&mut w.dirty).into_values().collect();
            batches.push(DirtyBatch {
                watch: w.id,
                target: w.target,
                origin: resolve(w.target),
                entries,
            });
        }
        batches
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("watches", &self.watches.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
