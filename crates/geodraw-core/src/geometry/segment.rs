//! Segment distance and intersection.

use kurbo::{Point, Vec2};

/// Closest point to `point` on the segment `a`→`b`, with its parameter `t`
/// in `[0, 1]`.
pub fn nearest_point_on_segment(point: Point, a: Point, b: Point) -> (Point, f64) {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return (a, 0.0);
    }
    let t = ((point - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    (a + seg * t, t)
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_distance(point: Point, a: Point, b: Point) -> f64 {
    let (nearest, _) = nearest_point_on_segment(point, a, b);
    (point - nearest).hypot()
}

fn cross(o: Point, p: Point, q: Point) -> f64 {
    let op: Vec2 = p - o;
    let oq: Vec2 = q - o;
    op.cross(oq)
}

fn on_segment(p: Point, q: Point, r: Point) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

/// Test if two line segments (a-b) and (c-d) intersect, touching included.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear cases: an endpoint lies on the other segment
    const EPS: f64 = 1e-12;
    (d1.abs() < EPS && on_segment(c, d, a))
        || (d2.abs() < EPS && on_segment(c, d, b))
        || (d3.abs() < EPS && on_segment(a, b, c))
        || (d4.abs() < EPS && on_segment(a, b, d))
}
