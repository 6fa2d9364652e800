//! A consumer-side field of view kept up to date incrementally.

use std::collections::BTreeSet;

use tilesight_core::Point;

use crate::error::MapError;
use crate::fov::{Quadrant, Quadrants};
use crate::map::Map;
use crate::monitor::{DirtyBatch, NearbyListener, WatchId, WatchTarget};
use crate::object::{MapObject, ObjectId};

/// View configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewConfig {
    /// Sight radius in tiles.
    pub radius: i32,
    /// Keep the set of every tile seen so far.
    pub remember: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            radius: 8,
            remember: true,
        }
    }
}

/// Cells that entered or left the view during one
/// [`VisibilityState::update`], each in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityChange {
    pub newly_visible: Vec<Point>,
    pub newly_hidden: Vec<Point>,
}

impl VisibilityChange {
    pub fn is_empty(&self) -> bool {
        self.newly_visible.is_empty() && self.newly_hidden.is_empty()
    }
}

/// The field of view of an origin on a map, with optional memory.
///
/// The state owns a proximity watch on its origin that collects objects
/// blocking sight (and the origin object itself). Dispatching the map's
/// dirty batches to the state marks the touched quadrants, and
/// [`update`](Self::update) recomputes only those.
#[derive(Debug)]
pub struct VisibilityState {
    origin: WatchTarget,
    config: ViewConfig,
    visible: BTreeSet<Point>,
    remembered: BTreeSet<Point>,
    dirty: Quadrants,
    last_origin: Option<Point>,
    watch: Option<WatchId>,
    cells: Vec<Point>,
}

impl VisibilityState {
    /// Start tracking the view from `origin`. Everything is dirty until
    /// the first [`update`](Self::update).
    pub fn bind(
        map: &mut Map,
        origin: impl Into<WatchTarget>,
        config: ViewConfig,
    ) -> Result<Self, MapError> {
        let origin = origin.into();
        let mut state = Self {
            origin,
            config,
            visible: BTreeSet::new(),
            remembered: BTreeSet::new(),
            dirty: Quadrants::ALL,
            last_origin: None,
            watch: None,
            cells: Vec::new(),
        };
        state.watch = Some(state.register(map)?);
        Ok(state)
    }

    fn register(&self, map: &mut Map) -> Result<WatchId, MapError> {
        let own = match self.origin {
            WatchTarget::Object(id) => Some(id),
            WatchTarget::Point(_) => None,
        };
        map.monitor_nearby(
            self.origin,
            self.config.radius,
            Some(Box::new(move |id: ObjectId, obj: &MapObject| {
                obj.blocks_los || Some(id) == own
            })),
        )
    }

    /// Stop watching the map. The visible and remembered sets are kept.
    pub fn unbind(&mut self, map: &mut Map) {
        if let Some(watch) = self.watch.take() {
            map.unmonitor_nearby(watch);
        }
    }

    pub fn origin(&self) -> WatchTarget {
        self.origin
    }

    pub fn config(&self) -> ViewConfig {
        self.config
    }

    /// Change the sight radius. The watch is re-registered and the whole
    /// view marked dirty.
    pub fn set_radius(&mut self, map: &mut Map, radius: i32) -> Result<(), MapError> {
        if radius < 0 {
            return Err(MapError::DegenerateRadius(radius));
        }
        let old = self.config.radius;
        self.config.radius = radius;
        let watch = match self.register(map) {
            Ok(w) => w,
            Err(e) => {
                self.config.radius = old;
                return Err(e);
            }
        };
        if let Some(prev) = self.watch.replace(watch) {
            map.unmonitor_nearby(prev);
        }
        self.dirty = Quadrants::ALL;
        Ok(())
    }

    /// Whether `p` is currently visible.
    pub fn in_fov(&self, p: Point) -> bool {
        self.visible.contains(&p)
    }

    /// Whether `p` has ever been visible. Always `false` without memory.
    pub fn remembered(&self, p: Point) -> bool {
        self.remembered.contains(&p)
    }

    /// Currently visible cells in row-major order.
    pub fn visible(&self) -> impl Iterator<Item = Point> + '_ {
        self.visible.iter().copied()
    }

    /// Every cell seen so far in row-major order.
    pub fn remembered_cells(&self) -> impl Iterator<Item = Point> + '_ {
        self.remembered.iter().copied()
    }

    /// Forget every remembered cell except the visible ones.
    pub fn forget(&mut self) {
        self.remembered.clear();
        if self.config.remember {
            self.remembered.extend(self.visible.iter().copied());
        }
    }

    /// Quadrants waiting for the next [`update`](Self::update).
    pub fn dirty_quadrants(&self) -> Quadrants {
        self.dirty
    }

    /// Mark the whole view for recomputation.
    pub fn mark_all_dirty(&mut self) {
        self.dirty = Quadrants::ALL;
    }

    /// Recompute the dirty quadrants and return what changed.
    ///
    /// If the origin has moved since the previous update, everything is
    /// recomputed whatever was marked.
    pub fn update(&mut self, map: &Map) -> Result<VisibilityChange, MapError> {
        let origin = map
            .resolve(self.origin)
            .ok_or(MapError::InvalidWatchTarget(self.origin))?;
        if self.last_origin != Some(origin) {
            self.dirty = Quadrants::ALL;
        }
        if self.dirty.is_empty() {
            return Ok(VisibilityChange::default());
        }
        let dirty = self.dirty;

        let mut cells = std::mem::take(&mut self.cells);
        cells.clear();
        let res = map.field_of_view(origin, self.config.radius, |p| cells.push(p), dirty);
        if let Err(e) = res {
            self.cells = cells;
            return Err(e);
        }
        let fresh: BTreeSet<Point> = cells.iter().copied().collect();
        self.cells = cells;

        let (stale, kept): (BTreeSet<Point>, BTreeSet<Point>) = std::mem::take(&mut self.visible)
            .into_iter()
            .partition(|&p| dirty.contains(Quadrant::of(p, origin)));

        let change = VisibilityChange {
            newly_visible: fresh.difference(&stale).copied().collect(),
            newly_hidden: stale.difference(&fresh).copied().collect(),
        };
        if self.config.remember {
            self.remembered.extend(fresh.iter().copied());
        }
        self.visible = kept;
        self.visible.extend(fresh);
        self.dirty = Quadrants::NONE;
        self.last_origin = Some(origin);
        log::trace!(
            "view from {origin} {dirty:?}: +{} -{}",
            change.newly_visible.len(),
            change.newly_hidden.len()
        );
        Ok(change)
    }
}

impl NearbyListener for VisibilityState {
    fn watch_id(&self) -> Option<WatchId> {
        self.watch
    }

    fn on_nearby(&mut self, _map: &mut Map, batch: &DirtyBatch) -> Result<(), MapError> {
        self.dirty.extend_with(batch.dirty_quadrants());
        Ok(())
    }
}
