//! Line of sight along Bresenham rays.
//!
//! These functions work on raw predicates and do no bounds checking; the
//! [`Map`](crate::Map) methods of the same names check both endpoints and
//! use tile opacity.

use tilesight_core::Point;

use crate::bresenham::trace_points;

/// Walk the ray from `p0` to `p1`, calling `callback` on each cell
/// (both ends included) until it returns `false`.
///
/// Returns the last cell reached.
pub fn trace_ray(p0: Point, p1: Point, mut callback: impl FnMut(Point) -> bool) -> Point {
    let mut last = p0;
    for p in trace_points(p0, p1) {
        last = p;
        if !callback(p) {
            break;
        }
    }
    last
}

/// Walk the ray from `p0` to `p1`, stopping on the first opaque cell
/// strictly between them.
///
/// The start cell never blocks. The destination is reached whenever
/// nothing in between is opaque, whatever its own opacity; deciding
/// whether an opaque destination "counts" is up to the caller.
/// Returns the last cell reached.
pub fn trace_los(p0: Point, p1: Point, is_opaque: impl Fn(Point) -> bool) -> Point {
    trace_los_with(p0, p1, is_opaque, |_| true)
}

/// Like [`trace_los`], and also calls `callback` on every reached cell
/// (the stopping cell included). The trace stops early when `callback`
/// returns `false`.
pub fn trace_los_with(
    p0: Point,
    p1: Point,
    is_opaque: impl Fn(Point) -> bool,
    mut callback: impl FnMut(Point) -> bool,
) -> Point {
    trace_ray(p0, p1, |p| {
        if !callback(p) {
            return false;
        }
        p == p0 || p == p1 || !is_opaque(p)
    })
}

/// Whether a ray from `p0` reaches `p1` without being blocked.
pub fn test_los(p0: Point, p1: Point, is_opaque: impl Fn(Point) -> bool) -> bool {
    trace_los(p0, p1, is_opaque) == p1
}
