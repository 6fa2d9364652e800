//! Persistent map state.
//!
//! A [`MapSnapshot`] holds what a save needs to rebuild a map: its name and
//! size, the ambient light and every registered object with its position.
//! Watches, pending dirty sets, views and point-light contributions are
//! not part of it; views are re-bound and lights re-applied after loading.

use tilesight_core::{Point, Rgb};

use crate::error::MapError;
use crate::map::Map;
use crate::object::{MapObject, ObjectEntry, ObjectId};

/// One registered object.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub object: MapObject,
    /// The tile holding the object, `None` if it is not placed.
    pub pos: Option<Point>,
}

/// The persistent state of a [`Map`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapSnapshot {
    pub name: String,
    pub cols: i32,
    pub rows: i32,
    pub ambient_rgb: Rgb,
    pub ambient_intensity: f64,
    /// Placed objects in tile order (row-major, then insertion order
    /// within a tile), followed by unplaced ones.
    pub objects: Vec<ObjectSnapshot>,
    /// The id the next registered object gets.
    pub next_object: u32,
}

impl Map {
    /// Capture the persistent state of the map.
    pub fn to_snapshot(&self) -> MapSnapshot {
        let mut objects = Vec::new();
        for tile in &self.tiles {
            for &id in tile.objects() {
                if let Some(Some(e)) = self.objects.get(id.0 as usize) {
                    objects.push(ObjectSnapshot {
                        id,
                        object: e.object,
                        pos: Some(tile.pos()),
                    });
                }
            }
        }
        objects.extend(
            self.objects()
                .filter(|(_, _, pos)| pos.is_none())
                .map(|(id, object, _)| ObjectSnapshot {
                    id,
                    object: *object,
                    pos: None,
                }),
        );
        let (ambient_rgb, ambient_intensity) = self.ambient;
        MapSnapshot {
            name: self.name.clone(),
            cols: self.cols,
            rows: self.rows,
            ambient_rgb,
            ambient_intensity,
            objects,
            next_object: self.objects.len() as u32,
        }
    }

    /// Rebuild a map from a snapshot. The result has no watches and no
    /// point light.
    pub fn from_snapshot(snapshot: MapSnapshot) -> Result<Map, MapError> {
        let mut map = Map::new(snapshot.name, snapshot.cols, snapshot.rows)?;
        let slots = snapshot
            .objects
            .iter()
            .map(|o| o.id.0 as usize + 1)
            .max()
            .unwrap_or(0)
            .max(snapshot.next_object as usize);
        map.objects.resize_with(slots, || None);
        for o in &snapshot.objects {
            let slot = &mut map.objects[o.id.0 as usize];
            if slot.is_some() {
                return Err(MapError::DuplicateObject(o.id));
            }
            *slot = Some(ObjectEntry {
                object: o.object,
                parent: None,
            });
            if let Some(pos) = o.pos {
                map.add(pos, o.id)?;
            }
        }
        map.set_ambient_light(snapshot.ambient_rgb, snapshot.ambient_intensity);
        map.take_dirty_light();
        log::debug!("restored {map} with {} objects", snapshot.objects.len());
        Ok(map)
    }
}
