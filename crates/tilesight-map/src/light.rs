//! Point lights with inverse-square falloff.

use std::collections::HashMap;
use std::time::Instant;

use tilesight_core::{Point, Rgb};

use crate::error::MapError;
use crate::fov::Quadrants;
use crate::map::Map;
use crate::monitor::{DirtyBatch, NearbyListener, WatchId, blocks_los};

/// Contribution below which a light is considered negligible.
pub const MIN_INTENSITY: f64 = 0.03;

/// A coloured point light.
///
/// [`apply`](Self::apply) lights every tile in the field of view of its
/// position with `intensity / (fall_off × d²)` (full `intensity` on its own
/// tile) and remembers each contribution, so [`remove`](Self::remove) can
/// subtract exactly what was added. While applied, the light watches its
/// surroundings for tiles that start or stop blocking sight and re-applies
/// itself when dispatched a batch.
///
/// The type is not `Clone`: an applied light owns its contributions and its
/// watch. Use [`copy`](Self::copy) for a fresh light with the same settings.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightSource {
    rgb: Rgb,
    intensity: f64,
    fall_off: f64,
    min_intensity: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    pos: Option<Point>,
    #[cfg_attr(feature = "serde", serde(skip))]
    applied_tiles: HashMap<Point, f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    watch: Option<WatchId>,
    #[cfg_attr(feature = "serde", serde(skip))]
    dist_intensities: HashMap<i64, f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    cells: Vec<Point>,
}

impl LightSource {
    pub fn new(rgb: Rgb, intensity: f64) -> Self {
        Self {
            rgb,
            intensity,
            fall_off: 1.0,
            min_intensity: MIN_INTENSITY,
            pos: None,
            applied_tiles: HashMap::new(),
            watch: None,
            dist_intensities: HashMap::new(),
            cells: Vec::new(),
        }
    }

    /// Set the falloff factor (builder).
    pub fn with_fall_off(mut self, fall_off: f64) -> Self {
        self.fall_off = fall_off;
        self.dist_intensities.clear();
        self
    }

    /// Set the cut-off intensity (builder).
    pub fn with_min_intensity(mut self, min_intensity: f64) -> Self {
        self.min_intensity = min_intensity;
        self
    }

    /// A new, unapplied light with the same colour and strength.
    pub fn copy(&self) -> Self {
        Self::new(self.rgb, self.intensity)
            .with_fall_off(self.fall_off)
            .with_min_intensity(self.min_intensity)
    }

    pub fn rgb(&self) -> Rgb {
        self.rgb
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn fall_off(&self) -> f64 {
        self.fall_off
    }

    pub fn min_intensity(&self) -> f64 {
        self.min_intensity
    }

    /// How far the light reaches: the largest distance at which its
    /// contribution is still at least `min_intensity`. Invalid settings give
    /// 0 and huge reaches saturate at `i32::MAX`.
    pub fn radius(&self) -> i32 {
        if self.check().is_err() {
            return 0;
        }
        let r = (self.intensity / (self.fall_off * self.min_intensity))
            .sqrt()
            .floor();
        if r >= i32::MAX as f64 { i32::MAX } else { r as i32 }
    }

    fn check(&self) -> Result<(), MapError> {
        check_intensity(self.intensity)?;
        for (name, value) in [
            ("fall_off", self.fall_off),
            ("min_intensity", self.min_intensity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MapError::InvalidLight {
                    name,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Where the light is applied, if it is.
    pub fn position(&self) -> Option<Point> {
        self.pos
    }

    pub fn is_applied(&self) -> bool {
        self.pos.is_some()
    }

    /// The intensity this light currently contributes to each tile.
    pub fn applied_tiles(&self) -> &HashMap<Point, f64> {
        &self.applied_tiles
    }

    /// The contribution at `dist_sq` squared distance from the source.
    fn intensity_at(&mut self, dist_sq: i64) -> f64 {
        if dist_sq == 0 {
            return self.intensity;
        }
        let (intensity, fall_off) = (self.intensity, self.fall_off);
        *self
            .dist_intensities
            .entry(dist_sq)
            .or_insert_with(|| intensity / (fall_off * dist_sq as f64))
    }

    /// Light the field of view around `pos`. A light that is already
    /// applied is removed first.
    pub fn apply(&mut self, map: &mut Map, pos: Point) -> Result<(), MapError> {
        self.check()?;
        if self.is_applied() {
            self.remove(map)?;
        }
        let start = Instant::now();
        let radius = self.radius();
        let mut cells = std::mem::take(&mut self.cells);
        cells.clear();
        let res = map.field_of_view(pos, radius, |p| cells.push(p), Quadrants::ALL);
        if let Err(e) = res {
            self.cells = cells;
            return Err(e);
        }
        for &p in &cells {
            let intensity = self.intensity_at(pos.dist_sq(p));
            map.add_light(p, self.rgb, intensity)?;
            self.applied_tiles.insert(p, intensity);
        }
        self.cells = cells;
        self.watch = Some(map.monitor_nearby(pos, radius, Some(blocks_los()))?);
        self.pos = Some(pos);
        log::debug!(
            "LightSource::apply at {pos} r={radius}: {} tiles in {:?}",
            self.applied_tiles.len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Subtract every contribution made by the last
    /// [`apply`](Self::apply) and stop watching. Does nothing if the light
    /// is not applied.
    pub fn remove(&mut self, map: &mut Map) -> Result<(), MapError> {
        let start = Instant::now();
        let n = self.applied_tiles.len();
        for (&p, &intensity) in &self.applied_tiles {
            map.remove_light(p, self.rgb, intensity)?;
        }
        self.applied_tiles.clear();
        if let Some(watch) = self.watch.take() {
            map.unmonitor_nearby(watch);
        }
        self.pos = None;
        log::debug!("LightSource::remove: {n} tiles in {:?}", start.elapsed());
        Ok(())
    }

    /// Change the colour, re-tinting the tiles the light already reaches.
    pub fn set_rgb(&mut self, map: &mut Map, rgb: Rgb) -> Result<(), MapError> {
        for (&p, &intensity) in &self.applied_tiles {
            map.remove_light(p, self.rgb, intensity)?;
            map.add_light(p, rgb, intensity)?;
        }
        self.rgb = rgb;
        Ok(())
    }

    /// Change the intensity (and with it the radius). An applied light is
    /// re-applied at its position.
    pub fn set_intensity(&mut self, map: &mut Map, intensity: f64) -> Result<(), MapError> {
        check_intensity(intensity)?;
        let pos = self.pos;
        if pos.is_some() {
            self.remove(map)?;
        }
        self.intensity = intensity;
        self.dist_intensities.clear();
        match pos {
            Some(p) => self.apply(map, p),
            None => Ok(()),
        }
    }
}

fn check_intensity(intensity: f64) -> Result<(), MapError> {
    if intensity.is_finite() && intensity >= 0.0 {
        Ok(())
    } else {
        Err(MapError::InvalidLight {
            name: "intensity",
            value: intensity.to_string(),
        })
    }
}

impl NearbyListener for LightSource {
    fn watch_id(&self) -> Option<WatchId> {
        self.watch
    }

    fn on_nearby(&mut self, map: &mut Map, batch: &DirtyBatch) -> Result<(), MapError> {
        let Some(pos) = self.pos else {
            return Ok(());
        };
        log::trace!(
            "light at {pos}: {} blocker(s) changed, re-applying",
            batch.entries.len()
        );
        self.apply(map, pos)
    }
}
