//! Self-intersection detection for lines and polygon rings.

use super::segment::segments_intersect;
use crate::feature::{Geometry, Position};
use kurbo::Point;

fn dedupe_consecutive(coords: &[Position]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(coords.len());
    for c in coords {
        let p = Point::new(c[0], c[1]);
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}

/// Whether any two non-adjacent segments of the path intersect. When `closed`
/// the first and last segments are also adjacent.
fn path_self_intersects(points: &[Point], closed: bool) -> bool {
    let segment_count = points.len().saturating_sub(1);
    if segment_count < 3 {
        return false;
    }
    for i in 0..segment_count {
        for j in (i + 2)..segment_count {
            if closed && i == 0 && j == segment_count - 1 {
                continue;
            }
            if segments_intersect(points[i], points[i + 1], points[j], points[j + 1]) {
                return true;
            }
        }
    }
    false
}

/// O(n²) pairwise test over every ring (or the line). Touching at the shared
/// endpoint of adjacent segments does not count, and repeated consecutive
/// vertices are ignored.
pub fn self_intersects(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point(_) => false,
        Geometry::LineString(coords) => {
            let points = dedupe_consecutive(coords);
            let closed = points.len() > 3 && points.first() == points.last();
            path_self_intersects(&points, closed)
        }
        Geometry::Polygon(rings) => rings.iter().any(|ring| {
            let points = dedupe_consecutive(ring);
            points.len() >= 4 && path_self_intersects(&points, true)
        }),
    }
}
