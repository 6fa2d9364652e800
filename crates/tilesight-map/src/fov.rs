//! Field of view.
//!
//! Visibility is decided one ray at a time: a cell within the radius is
//! visible iff the Bresenham line from the origin to it has no opaque cell
//! strictly between the two ends. Opaque cells are themselves visible when
//! reached, and the origin is always visible. Because every cell is decided
//! by its own ray, the result agrees exactly with [`trace_los`] and is
//! monotonic in the radius.
//!
//! The work can be restricted to a subset of the four [`Quadrant`]s around
//! the origin. The quadrants partition the plane, and a ray to a cell never
//! leaves the cell's quadrant or the two axes bounding it, so recomputing
//! only the quadrants touched by a change and keeping the others gives the
//! same result as a full recomputation.
//!
//! [`trace_los`]: crate::los::trace_los

use std::fmt;
use std::ops::BitOr;
use std::time::Instant;

use tilesight_core::{Point, Range};

use crate::bresenham::trace_points_into;
use crate::error::MapError;

// ── Quadrants ─────────────────────────────────────────────────────

/// One of the four compass quadrants around an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quadrant {
    NE,
    SE,
    SW,
    NW,
}

impl Quadrant {
    /// All quadrants, clockwise from north-east.
    pub const ALL: [Quadrant; 4] = [Quadrant::NE, Quadrant::SE, Quadrant::SW, Quadrant::NW];

    /// The quadrant `p` lies in relative to `origin`.
    ///
    /// Rows at or above the origin are north and columns at or right of the
    /// origin are east, so the axes belong to the north and east halves and
    /// the origin itself is in `NE`.
    #[inline]
    pub fn of(p: Point, origin: Point) -> Quadrant {
        match (p.y <= origin.y, p.x >= origin.x) {
            (true, true) => Quadrant::NE,
            (false, true) => Quadrant::SE,
            (false, false) => Quadrant::SW,
            (true, false) => Quadrant::NW,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Quadrant::NE => 1 << 0,
            Quadrant::SE => 1 << 1,
            Quadrant::SW => 1 << 2,
            Quadrant::NW => 1 << 3,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quadrant::NE => "ne",
            Quadrant::SE => "se",
            Quadrant::SW => "sw",
            Quadrant::NW => "nw",
        })
    }
}

/// A set of [`Quadrant`]s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Quadrants(u8);

impl Quadrants {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    /// The set holding only `q`.
    #[inline]
    pub const fn only(q: Quadrant) -> Self {
        Self(q.bit())
    }

    /// The quadrants whose visibility may depend on the opacity of `p`.
    ///
    /// This is the quadrant of `p`, widened to both neighbouring quadrants
    /// when `p` lies on an axis through `origin` (rays into either side pass
    /// along the axis), and to all four when `p` is the origin.
    pub fn touched_by(p: Point, origin: Point) -> Self {
        let d = p - origin;
        match (d.x.signum(), d.y.signum()) {
            (0, 0) => Self::ALL,
            (1, 0) => Self::only(Quadrant::NE) | Quadrant::SE,
            (-1, 0) => Self::only(Quadrant::NW) | Quadrant::SW,
            (0, -1) => Self::only(Quadrant::NE) | Quadrant::NW,
            (0, 1) => Self::only(Quadrant::SE) | Quadrant::SW,
            _ => Self::only(Quadrant::of(p, origin)),
        }
    }

    #[inline]
    pub fn contains(self, q: Quadrant) -> bool {
        self.0 & q.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, q: Quadrant) {
        self.0 |= q.bit();
    }

    #[inline]
    pub fn extend_with(&mut self, other: Quadrants) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_all(self) -> bool {
        self == Self::ALL
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the members, clockwise from north-east.
    pub fn iter(self) -> impl Iterator<Item = Quadrant> {
        Quadrant::ALL.into_iter().filter(move |&q| self.contains(q))
    }
}

impl fmt::Debug for Quadrants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl BitOr for Quadrants {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<Quadrant> for Quadrants {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Quadrant) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl From<Quadrant> for Quadrants {
    #[inline]
    fn from(q: Quadrant) -> Self {
        Self::only(q)
    }
}

impl FromIterator<Quadrant> for Quadrants {
    fn from_iter<I: IntoIterator<Item = Quadrant>>(iter: I) -> Self {
        let mut qs = Self::NONE;
        for q in iter {
            qs.insert(q);
        }
        qs
    }
}

// ── Field of view ─────────────────────────────────────────────────

/// Field of view computation over a rectangular range.
///
/// Holds reusable buffers, so repeated queries do not allocate after the
/// first one.
pub struct Fov {
    range: Range,
    ray: Vec<Point>,
    visibles: Vec<Point>,
}

impl Fov {
    /// Create a new FOV for the given range.
    pub fn new(range: Range) -> Self {
        Self {
            range,
            ray: Vec::new(),
            visibles: Vec::new(),
        }
    }

    /// Return the current range.
    pub fn range(&self) -> Range {
        self.range
    }

    /// Change the range.
    pub fn set_range(&mut self, range: Range) {
        self.range = range;
    }

    /// Visit every cell of the requested quadrants visible from `origin`
    /// within the Euclidean `radius`.
    ///
    /// `is_opaque` tells whether a cell stops sight. Each visible cell is
    /// passed to `visit` exactly once, in row-major order.
    pub fn field_of_view(
        &mut self,
        origin: Point,
        radius: i32,
        is_opaque: impl Fn(Point) -> bool,
        mut visit: impl FnMut(Point),
        quadrants: Quadrants,
    ) -> Result<(), MapError> {
        if radius < 0 {
            return Err(MapError::DegenerateRadius(radius));
        }
        if !self.range.contains(origin) {
            return Err(MapError::OutOfBounds {
                pos: origin,
                cols: self.range.width(),
                rows: self.range.height(),
            });
        }
        if quadrants.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let mut visited = 0usize;
        let area = Range::around(origin, radius).intersect(self.range);
        for p in area {
            if !quadrants.contains(Quadrant::of(p, origin)) || !origin.within(p, radius) {
                continue;
            }
            trace_points_into(origin, p, &mut self.ray);
            let n = self.ray.len();
            let clear = n < 3 || !self.ray[1..n - 1].iter().any(|&q| is_opaque(q));
            if clear {
                visit(p);
                visited += 1;
            }
        }
        log::debug!(
            "field_of_view from {origin} r={radius} {quadrants:?}: {visited} cells in {:?}",
            start.elapsed()
        );
        Ok(())
    }

    /// Compute the visible cells of the requested quadrants and return them
    /// as a cached slice, in row-major order.
    pub fn visible_cells(
        &mut self,
        origin: Point,
        radius: i32,
        is_opaque: impl Fn(Point) -> bool,
        quadrants: Quadrants,
    ) -> Result<&[Point], MapError> {
        let mut visibles = std::mem::take(&mut self.visibles);
        visibles.clear();
        let res = self.field_of_view(origin, radius, is_opaque, |p| visibles.push(p), quadrants);
        self.visibles = visibles;
        res?;
        Ok(&self.visibles)
    }
}
