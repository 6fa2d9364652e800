//! The tile map: tiles, the object arena, proximity watches and light
//! accumulators.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

use tilesight_core::{Light, Point, Range, Rgb};

use crate::error::MapError;
use crate::fov::{Fov, Quadrant, Quadrants};
use crate::los;
use crate::monitor::{Condition, DirtyBatch, Monitor, NearbyListener, WatchId, WatchTarget};
use crate::object::{MapObject, ObjectEntry, ObjectId};
use crate::tile::Tile;

/// A fixed-size grid of [`Tile`]s plus the objects placed on them.
///
/// The map owns an arena of registered objects; tiles only record which
/// objects they hold. Every add and remove is reported to the proximity
/// watches before the next [`flush_dirty`](Self::flush_dirty).
pub struct Map {
    pub(crate) name: String,
    pub(crate) cols: i32,
    pub(crate) rows: i32,
    pub(crate) tiles: Vec<Tile>,
    pub(crate) objects: Vec<Option<ObjectEntry>>,
    monitor: Monitor,
    pub(crate) ambient: (Rgb, f64),
    dirty_light: BTreeSet<Point>,
}

impl Map {
    /// Create an empty map of `cols × rows` tiles.
    pub fn new(name: impl Into<String>, cols: i32, rows: i32) -> Result<Self, MapError> {
        if cols < 1 || rows < 1 {
            return Err(MapError::InvalidSize { cols, rows });
        }
        let tiles = Range::new(0, 0, cols, rows).iter().map(Tile::new).collect();
        Ok(Self {
            name: name.into(),
            cols,
            rows,
            tiles,
            objects: Vec::new(),
            monitor: Monitor::default(),
            ambient: (Rgb::BLACK, 0.0),
            dirty_light: BTreeSet::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// The range of valid positions.
    pub fn range(&self) -> Range {
        Range::new(0, 0, self.cols, self.rows)
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.cols && p.y >= 0 && p.y < self.rows
    }

    #[inline]
    fn idx(&self, p: Point) -> usize {
        (p.y * self.cols + p.x) as usize
    }

    fn check(&self, p: Point) -> Result<usize, MapError> {
        if self.contains(p) {
            Ok(self.idx(p))
        } else {
            Err(MapError::OutOfBounds {
                pos: p,
                cols: self.cols,
                rows: self.rows,
            })
        }
    }

    /// The tile at `p`.
    pub fn tile(&self, p: Point) -> Result<&Tile, MapError> {
        let i = self.check(p)?;
        Ok(&self.tiles[i])
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Euclidean distance between two positions.
    pub fn dist(&self, a: Point, b: Point) -> f64 {
        a.dist(b)
    }

    /// The quadrant `p` lies in relative to `origin`.
    pub fn quadrant(&self, p: Point, origin: Point) -> Quadrant {
        Quadrant::of(p, origin)
    }

    /// Whether the tile at `p` blocks sight. Positions off the map do.
    #[inline]
    pub fn is_opaque(&self, p: Point) -> bool {
        !self.contains(p) || self.tiles[self.idx(p)].blocks_los()
    }

    // ── Objects ───────────────────────────────────────────────────

    /// Register an object with the map. It is not placed on any tile yet.
    pub fn insert_object(&mut self, object: MapObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Some(ObjectEntry {
            object,
            parent: None,
        }));
        id
    }

    fn entry(&self, id: ObjectId) -> Result<&ObjectEntry, MapError> {
        self.objects
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(MapError::UnknownObject(id))
    }

    fn entry_mut(&mut self, id: ObjectId) -> Result<&mut ObjectEntry, MapError> {
        self.objects
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(MapError::UnknownObject(id))
    }

    /// The object registered as `id`.
    pub fn object(&self, id: ObjectId) -> Result<&MapObject, MapError> {
        Ok(&self.entry(id)?.object)
    }

    /// The position of the tile holding `id`, if it is placed.
    pub fn position_of(&self, id: ObjectId) -> Result<Option<Point>, MapError> {
        Ok(self.entry(id)?.parent)
    }

    /// All registered objects with their positions, by id.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &MapObject, Option<Point>)> {
        self.objects.iter().enumerate().filter_map(|(i, e)| {
            e.as_ref()
                .map(|e| (ObjectId(i as u32), &e.object, e.parent))
        })
    }

    /// Unregister an object, removing it from its tile first.
    pub fn destroy_object(&mut self, id: ObjectId) -> Result<MapObject, MapError> {
        if let Some(pos) = self.entry(id)?.parent {
            self.remove(pos, id)?;
        }
        let entry = self.objects[id.0 as usize].take();
        entry.map(|e| e.object).ok_or(MapError::UnknownObject(id))
    }

    /// Place an object on the tile at `pos`.
    pub fn add(&mut self, pos: Point, id: ObjectId) -> Result<(), MapError> {
        let i = self.check(pos)?;
        let entry = self.entry_mut(id)?;
        if let Some(parent) = entry.parent {
            return Err(MapError::AlreadyMemberOfCell {
                object: id,
                pos: parent,
            });
        }
        entry.parent = Some(pos);
        self.tiles[i].push(id, &self.objects);
        self.notify(id, pos);
        Ok(())
    }

    /// Take an object off the tile at `pos`.
    ///
    /// Watches see the object at `pos` before it leaves.
    pub fn remove(&mut self, pos: Point, id: ObjectId) -> Result<(), MapError> {
        let i = self.check(pos)?;
        if self.entry(id)?.parent != Some(pos) || !self.tiles[i].contains(id) {
            return Err(MapError::NotMemberOfCell { object: id, pos });
        }
        self.notify(id, pos);
        self.entry_mut(id)?.parent = None;
        self.tiles[i].take(id, &self.objects);
        Ok(())
    }

    /// Remove every object from the tile at `pos`, one event per object.
    ///
    /// Returns the removed ids.
    pub fn clear(&mut self, pos: Point) -> Result<Vec<ObjectId>, MapError> {
        let i = self.check(pos)?;
        let ids = self.tiles[i].objects().to_vec();
        for &id in &ids {
            self.remove(pos, id)?;
        }
        Ok(ids)
    }

    /// Move a placed object to another tile (a remove followed by an add).
    pub fn move_object(&mut self, id: ObjectId, to: Point) -> Result<(), MapError> {
        self.check(to)?;
        if let Some(from) = self.entry(id)?.parent {
            self.remove(from, id)?;
        }
        self.add(to, id)
    }

    /// Change an object's capabilities.
    ///
    /// A placed object is taken off its tile and put back around the change,
    /// so watches observe both its old and its new flags.
    pub fn update_object(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut MapObject),
    ) -> Result<(), MapError> {
        let parent = self.entry(id)?.parent;
        if let Some(pos) = parent {
            self.remove(pos, id)?;
        }
        f(&mut self.entry_mut(id)?.object);
        if let Some(pos) = parent {
            self.add(pos, id)?;
        }
        Ok(())
    }

    /// The object with the highest layer on the tile at `pos`. The earliest
    /// added wins ties.
    pub fn highest_object(&self, pos: Point) -> Result<Option<ObjectId>, MapError> {
        let tile = self.tile(pos)?;
        let mut best: Option<(ObjectId, i32)> = None;
        for &id in tile.objects() {
            let layer = self.entry(id)?.object.layer;
            if best.is_none_or(|(_, l)| layer > l) {
                best = Some((id, layer));
            }
        }
        Ok(best.map(|(id, _)| id))
    }

    fn notify(&mut self, id: ObjectId, pos: Point) {
        let Some(Some(entry)) = self.objects.get(id.0 as usize) else {
            return;
        };
        let object = entry.object;
        let objects = &self.objects;
        let cols = self.cols;
        let rows = self.rows;
        self.monitor.record(id, &object, pos, |t| {
            resolve_target(objects, cols, rows, t)
        });
    }

    // ── Field of view and line of sight ───────────────────────────

    /// Visit the cells visible from `origin` within `radius`, using tile
    /// opacity. See [`Fov::field_of_view`].
    pub fn field_of_view(
        &self,
        origin: Point,
        radius: i32,
        visit: impl FnMut(Point),
        quadrants: Quadrants,
    ) -> Result<(), MapError> {
        self.field_of_view_with(origin, radius, |p| self.is_opaque(p), visit, quadrants)
    }

    /// Like [`field_of_view`](Self::field_of_view) with a custom opacity
    /// predicate.
    pub fn field_of_view_with(
        &self,
        origin: Point,
        radius: i32,
        is_opaque: impl Fn(Point) -> bool,
        visit: impl FnMut(Point),
        quadrants: Quadrants,
    ) -> Result<(), MapError> {
        Fov::new(self.range()).field_of_view(origin, radius, is_opaque, visit, quadrants)
    }

    /// Walk the ray from `p0` to `p1` until `callback` returns `false`.
    /// Returns the last position reached.
    pub fn trace_ray(
        &self,
        p0: Point,
        p1: Point,
        mut callback: impl FnMut(&Tile) -> bool,
    ) -> Result<Point, MapError> {
        self.check(p0)?;
        self.check(p1)?;
        Ok(los::trace_ray(p0, p1, |p| callback(&self.tiles[self.idx(p)])))
    }

    /// Walk the ray from `p0` to `p1`, stopping at the first tile strictly
    /// between them that blocks sight. Returns the last position reached.
    pub fn trace_los(&self, p0: Point, p1: Point) -> Result<Point, MapError> {
        self.check(p0)?;
        self.check(p1)?;
        Ok(los::trace_los(p0, p1, |p| self.is_opaque(p)))
    }

    /// Like [`trace_los`](Self::trace_los), calling `callback` on each
    /// reached tile; a `false` return stops the trace there.
    pub fn trace_los_with(
        &self,
        p0: Point,
        p1: Point,
        mut callback: impl FnMut(&Tile) -> bool,
    ) -> Result<Point, MapError> {
        self.check(p0)?;
        self.check(p1)?;
        Ok(los::trace_los_with(
            p0,
            p1,
            |p| self.is_opaque(p),
            |p| callback(&self.tiles[self.idx(p)]),
        ))
    }

    /// Whether `p1` can be seen from `p0`.
    pub fn test_los(&self, p0: Point, p1: Point) -> Result<bool, MapError> {
        Ok(self.trace_los(p0, p1)? == p1)
    }

    // ── Proximity monitoring ──────────────────────────────────────

    /// Where a watch target currently is, if it is on the map.
    pub fn resolve(&self, target: WatchTarget) -> Option<Point> {
        resolve_target(&self.objects, self.cols, self.rows, target)
    }

    /// Start collecting changes to objects within `radius` of `target`
    /// that satisfy `condition` (all objects when `None`).
    pub fn monitor_nearby(
        &mut self,
        target: impl Into<WatchTarget>,
        radius: i32,
        condition: Option<Condition>,
    ) -> Result<WatchId, MapError> {
        let target = target.into();
        if radius < 0 {
            return Err(MapError::DegenerateRadius(radius));
        }
        if self.resolve(target).is_none() {
            return Err(MapError::InvalidWatchTarget(target));
        }
        let id = self.monitor.insert(target, radius, condition);
        log::trace!("{id}: watching {target:?} r={radius}");
        Ok(id)
    }

    /// Drop a watch and its pending changes. Returns `false` if there was
    /// no such watch.
    pub fn unmonitor_nearby(&mut self, watch: WatchId) -> bool {
        self.monitor.remove(watch)
    }

    /// Drop every watch on `target`. Returns how many were dropped.
    pub fn unmonitor_target(&mut self, target: impl Into<WatchTarget>) -> usize {
        self.monitor.remove_target(target.into())
    }

    /// Number of registered watches.
    pub fn watch_count(&self) -> usize {
        self.monitor.len()
    }

    /// The radius of a registered watch.
    pub fn watch_radius(&self, watch: WatchId) -> Option<i32> {
        self.monitor.radius(watch)
    }

    /// Take the pending changes of every watch, one batch per watch with
    /// changes. All dirty sets are empty afterwards.
    pub fn flush_dirty(&mut self) -> Vec<DirtyBatch> {
        let objects = &self.objects;
        let cols = self.cols;
        let rows = self.rows;
        self.monitor
            .drain(|t| resolve_target(objects, cols, rows, t))
    }

    /// Flush the pending changes and hand each batch to the listener that
    /// owns its watch.
    ///
    /// Every dirty set is drained before the first listener runs. Batches
    /// nobody listens to are dropped. A failing listener does not stop the
    /// others: every batch is still delivered and the first error is
    /// returned afterwards. Otherwise returns how many were delivered.
    pub fn dispatch_dirty(
        &mut self,
        listeners: &mut [&mut dyn NearbyListener],
    ) -> Result<usize, MapError> {
        let batches = self.flush_dirty();
        let mut delivered = 0;
        let mut first_err = None;
        for batch in &batches {
            match listeners
                .iter_mut()
                .find(|l| l.watch_id() == Some(batch.watch))
            {
                Some(listener) => {
                    if let Err(e) = listener.on_nearby(self, batch) {
                        log::warn!("{}: listener failed: {e}", batch.watch);
                        first_err.get_or_insert(e);
                    }
                    delivered += 1;
                }
                None => log::trace!("{}: no listener, batch dropped", batch.watch),
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    // ── Light ─────────────────────────────────────────────────────

    /// The light accumulated at `p`.
    pub fn light_at(&self, p: Point) -> Result<Light, MapError> {
        Ok(self.tile(p)?.light())
    }

    /// Add `rgb` at `intensity` to the tile at `p`. Returns the quantized
    /// amount that was added.
    pub fn add_light(&mut self, p: Point, rgb: Rgb, intensity: f64) -> Result<Light, MapError> {
        let i = self.check(p)?;
        let delta = Light::scaled(rgb, intensity);
        self.tiles[i].add_light(delta);
        self.dirty_light.insert(p);
        Ok(delta)
    }

    /// Exactly undo a previous [`add_light`](Self::add_light) with the
    /// same arguments.
    pub fn remove_light(&mut self, p: Point, rgb: Rgb, intensity: f64) -> Result<Light, MapError> {
        let i = self.check(p)?;
        let delta = Light::scaled(rgb, intensity);
        self.tiles[i].sub_light(delta);
        self.dirty_light.insert(p);
        Ok(delta)
    }

    /// Reset the light at `p` to zero, forgetting every contribution.
    pub fn clear_light(&mut self, p: Point) -> Result<(), MapError> {
        let i = self.check(p)?;
        let light = self.tiles[i].light();
        self.tiles[i].sub_light(light);
        self.dirty_light.insert(p);
        Ok(())
    }

    /// Replace the uniform ambient light on every tile.
    pub fn set_ambient_light(&mut self, rgb: Rgb, intensity: f64) {
        let (old_rgb, old_intensity) = self.ambient;
        let old = Light::scaled(old_rgb, old_intensity);
        let new = Light::scaled(rgb, intensity);
        for t in &mut self.tiles {
            t.sub_light(old);
            t.add_light(new);
            self.dirty_light.insert(t.pos());
        }
        self.ambient = (rgb, intensity);
    }

    /// The current ambient light colour and intensity.
    pub fn ambient_light(&self) -> (Rgb, f64) {
        self.ambient
    }

    /// Take the positions whose light changed since the last call, in
    /// row-major order.
    pub fn take_dirty_light(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.dirty_light).into_iter().collect()
    }
}

fn resolve_target(
    objects: &[Option<ObjectEntry>],
    cols: i32,
    rows: i32,
    target: WatchTarget,
) -> Option<Point> {
    let p = match target {
        WatchTarget::Point(p) => p,
        WatchTarget::Object(id) => objects.get(id.0 as usize)?.as_ref()?.parent?,
    };
    (p.x >= 0 && p.x < cols && p.y >= 0 && p.y < rows).then_some(p)
}

impl Index<Point> for Map {
    type Output = Tile;

    /// # Panics
    ///
    /// Panics if `p` is outside the map. Use [`Map::tile`] for a fallible
    /// lookup.
    fn index(&self, p: Point) -> &Tile {
        match self.tile(p) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        }
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map \"{}\" {}x{}", self.name, self.cols, self.rows)
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("name", &self.name)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("objects", &self.objects.iter().flatten().count())
            .field("monitor", &self.monitor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::blocks_los;

    fn map(cols: i32, rows: i32) -> Map {
        Map::new("test", cols, rows).unwrap()
    }

    #[test]
    fn new_rejects_empty() {
        assert_eq!(
            Map::new("x", 0, 4).unwrap_err(),
            MapError::InvalidSize { cols: 0, rows: 4 }
        );
        let m = map(3, 2);
        assert_eq!(m.tiles().count(), 6);
        assert_eq!(m.to_string(), "Map \"test\" 3x2");
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let m = map(4, 4);
        assert!(matches!(
            m.tile(Point::new(4, 0)),
            Err(MapError::OutOfBounds { .. })
        ));
        assert!(m.tile(Point::new(-1, 2)).is_err());
        assert_eq!(m[Point::new(3, 3)].pos(), Point::new(3, 3));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn index_panics_out_of_bounds() {
        let m = map(2, 2);
        let _ = &m[Point::new(2, 2)];
    }

    #[test]
    fn add_remove_updates_flags_and_parent() {
        let mut m = map(5, 5);
        let p = Point::new(1, 2);
        let wall = m.insert_object(MapObject::solid(1));
        let rug = m.insert_object(MapObject::new(0));
        m.add(p, rug).unwrap();
        assert!(!m[p].blocks_los());
        m.add(p, wall).unwrap();
        assert!(m[p].blocks_los() && m[p].blocks_move());
        assert_eq!(m.position_of(wall).unwrap(), Some(p));
        assert_eq!(m.highest_object(p).unwrap(), Some(wall));

        m.remove(p, wall).unwrap();
        assert!(!m[p].blocks_los() && !m[p].blocks_move());
        assert_eq!(m.position_of(wall).unwrap(), None);
        assert_eq!(m[p].objects(), &[rug]);
    }

    #[test]
    fn add_twice_and_remove_missing_fail() {
        let mut m = map(5, 5);
        let o = m.insert_object(MapObject::new(0));
        m.add(Point::new(0, 0), o).unwrap();
        assert_eq!(
            m.add(Point::new(1, 0), o),
            Err(MapError::AlreadyMemberOfCell {
                object: o,
                pos: Point::new(0, 0)
            })
        );
        assert_eq!(
            m.remove(Point::new(1, 0), o),
            Err(MapError::NotMemberOfCell {
                object: o,
                pos: Point::new(1, 0)
            })
        );
        assert_eq!(
            m.add(Point::new(0, 0), ObjectId(99)),
            Err(MapError::UnknownObject(ObjectId(99)))
        );
    }

    #[test]
    fn clear_removes_each_object() {
        let mut m = map(5, 5);
        let p = Point::new(2, 2);
        let ids: Vec<_> = (0..3).map(|l| m.insert_object(MapObject::new(l))).collect();
        for &id in &ids {
            m.add(p, id).unwrap();
        }
        let w = m.monitor_nearby(p, 0, None).unwrap();
        assert_eq!(m.clear(p).unwrap(), ids);
        assert!(m[p].is_empty());
        let batches = m.flush_dirty();
        assert_eq!(batches[0].watch, w);
        assert_eq!(batches[0].entries.len(), 3);
    }

    #[test]
    fn move_and_destroy() {
        let mut m = map(5, 5);
        let o = m.insert_object(MapObject::solid(0));
        m.add(Point::new(0, 0), o).unwrap();
        m.move_object(o, Point::new(4, 4)).unwrap();
        assert!(!m[Point::new(0, 0)].blocks_los());
        assert!(m[Point::new(4, 4)].blocks_los());
        assert_eq!(m.destroy_object(o).unwrap(), MapObject::solid(0));
        assert!(m[Point::new(4, 4)].is_empty());
        assert_eq!(m.object(o), Err(MapError::UnknownObject(o)));
        assert_eq!(m.objects().count(), 0);
    }

    #[test]
    fn update_object_refreshes_flags_and_notifies() {
        let mut m = map(5, 5);
        let p = Point::new(3, 3);
        let door = m.insert_object(MapObject::solid(0));
        m.add(p, door).unwrap();
        m.monitor_nearby(Point::new(2, 2), 3, Some(blocks_los())).unwrap();
        m.update_object(door, |o| o.blocks_los = false).unwrap();
        assert!(!m[p].blocks_los());
        assert!(m[p].blocks_move());
        let batches = m.flush_dirty();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].contains_object(door));
    }

    #[test]
    fn monitor_requires_resolvable_target() {
        let mut m = map(5, 5);
        let o = m.insert_object(MapObject::new(0));
        assert_eq!(
            m.monitor_nearby(o, 2, None),
            Err(MapError::InvalidWatchTarget(WatchTarget::Object(o)))
        );
        assert!(m.monitor_nearby(Point::new(7, 1), 2, None).is_err());
        assert_eq!(
            m.monitor_nearby(Point::new(1, 1), -2, None),
            Err(MapError::DegenerateRadius(-2))
        );
        m.add(Point::new(1, 1), o).unwrap();
        let w = m.monitor_nearby(o, 2, None).unwrap();
        assert_eq!(m.watch_count(), 1);
        assert_eq!(m.watch_radius(w), Some(2));
        assert!(m.unmonitor_nearby(w));
        assert!(!m.unmonitor_nearby(w));
    }

    #[test]
    fn watch_follows_moving_object() {
        let mut m = map(20, 5);
        let hero = m.insert_object(MapObject::new(5));
        let rock = m.insert_object(MapObject::solid(0));
        m.add(Point::new(1, 1), hero).unwrap();
        m.monitor_nearby(hero, 2, Some(blocks_los())).unwrap();
        m.flush_dirty();

        m.add(Point::new(10, 1), rock).unwrap();
        assert!(m.flush_dirty().is_empty());

        m.move_object(hero, Point::new(9, 1)).unwrap();
        m.remove(Point::new(10, 1), rock).unwrap();
        let batches = m.flush_dirty();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].origin, Some(Point::new(9, 1)));
        assert_eq!(batches[0].entries.len(), 1);
        assert_eq!(batches[0].entries[0].object, rock);
    }

    struct Recorder {
        watch: WatchId,
        fail: bool,
        seen: usize,
    }

    impl NearbyListener for Recorder {
        fn watch_id(&self) -> Option<WatchId> {
            Some(self.watch)
        }

        fn on_nearby(&mut self, _map: &mut Map, _batch: &DirtyBatch) -> Result<(), MapError> {
            self.seen += 1;
            if self.fail {
                return Err(MapError::UnknownObject(ObjectId(77)));
            }
            Ok(())
        }
    }

    #[test]
    fn failing_listener_does_not_starve_others() {
        let mut m = map(5, 5);
        let a = m.monitor_nearby(Point::new(0, 0), 1, None).unwrap();
        let b = m.monitor_nearby(Point::new(4, 4), 1, None).unwrap();
        let near_a = m.insert_object(MapObject::new(0));
        let near_b = m.insert_object(MapObject::new(0));
        m.add(Point::new(0, 1), near_a).unwrap();
        m.add(Point::new(4, 3), near_b).unwrap();

        let mut broken = Recorder {
            watch: a,
            fail: true,
            seen: 0,
        };
        let mut healthy = Recorder {
            watch: b,
            fail: false,
            seen: 0,
        };
        assert_eq!(
            m.dispatch_dirty(&mut [&mut broken, &mut healthy]),
            Err(MapError::UnknownObject(ObjectId(77)))
        );
        assert_eq!(broken.seen, 1);
        assert_eq!(healthy.seen, 1);
        assert!(m.flush_dirty().is_empty());

        m.remove(Point::new(4, 3), near_b).unwrap();
        assert_eq!(m.dispatch_dirty(&mut [&mut broken, &mut healthy]), Ok(1));
        assert_eq!(healthy.seen, 2);
    }

    #[test]
    fn los_methods_check_bounds() {
        let mut m = map(6, 1);
        let wall = m.insert_object(MapObject::solid(0));
        m.add(Point::new(3, 0), wall).unwrap();
        assert_eq!(m.trace_los(Point::new(0, 0), Point::new(5, 0)).unwrap(), Point::new(3, 0));
        assert!(!m.test_los(Point::new(0, 0), Point::new(5, 0)).unwrap());
        assert!(m.test_los(Point::new(0, 0), Point::new(3, 0)).unwrap());
        assert!(m.trace_los(Point::new(0, 0), Point::new(6, 0)).is_err());

        let mut visited = 0;
        let last = m
            .trace_ray(Point::new(5, 0), Point::new(0, 0), |t| {
                visited += 1;
                !t.blocks_move()
            })
            .unwrap();
        assert_eq!(last, Point::new(3, 0));
        assert_eq!(visited, 3);
    }

    #[test]
    fn ambient_light_swaps_exactly() {
        let mut m = map(3, 3);
        let p = Point::new(1, 1);
        m.add_light(p, Rgb::new(10, 20, 30), 1.0).unwrap();
        m.set_ambient_light(Rgb::new(255, 255, 255), 0.1);
        assert_eq!(m.light_at(p).unwrap(), Light::new(35, 45, 55));
        assert_eq!(m.light_at(Point::ZERO).unwrap(), Light::new(25, 25, 25));
        m.set_ambient_light(Rgb::BLACK, 0.0);
        assert_eq!(m.light_at(p).unwrap(), Light::new(10, 20, 30));
        assert_eq!(m.take_dirty_light().len(), 9);
        assert!(m.take_dirty_light().is_empty());
        m.clear_light(p).unwrap();
        assert_eq!(m.light_at(p).unwrap(), Light::ZERO);
    }
}
