//! Integer Bresenham line tracing.
//!
//! The line between two points is always rasterized from a canonical
//! endpoint order (increasing along the major axis) and then oriented to
//! start at the requested origin. Tracing `a → b` therefore visits exactly
//! the cells of `b → a`, in reverse, which makes "can A see B" independent
//! of which end asks.

use tilesight_core::Point;

/// Return the cells on the line from `p0` to `p1`, both inclusive.
pub fn trace_points(p0: Point, p1: Point) -> Vec<Point> {
    let mut buf = Vec::new();
    trace_points_into(p0, p1, &mut buf);
    buf
}

/// Like [`trace_points`], but reuses `buf`. The buffer is cleared first.
pub fn trace_points_into(p0: Point, p1: Point, buf: &mut Vec<Point>) {
    buf.clear();
    let (mut x0, mut y0, mut x1, mut y1) = (p0.x, p0.y, p1.x, p1.y);
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }
    let dx = x1 - x0;
    let dy = (y1 - y0).abs();
    let ystep = if y0 < y1 { 1 } else { -1 };
    let mut error = dx / 2;
    let mut y = y0;
    buf.reserve(dx as usize + 1);
    for x in x0..=x1 {
        buf.push(if steep { Point::new(y, x) } else { Point::new(x, y) });
        error -= dy;
        if error < 0 {
            y += ystep;
            error += dx;
        }
    }
    if buf.first() != Some(&p0) {
        buf.reverse();
    }
}
