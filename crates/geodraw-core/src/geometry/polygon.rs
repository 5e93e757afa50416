//! Polygon containment, winding and area.

use super::measure::WEB_MERCATOR_RADIUS_M;
use crate::feature::{Geometry, Position};

/// Ray-casting containment test against the outer ring, excluding holes.
pub fn point_in_polygon(point: Position, rings: &[Vec<Position>]) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    if !point_in_ring(point, outer) {
        return false;
    }
    !rings.iter().skip(1).any(|hole| point_in_ring(point, hole))
}

fn point_in_ring(point: Position, ring: &[Position]) -> bool {
    let (x, y) = (point[0], point[1]);
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Planar signed area of a ring (shoelace). Positive means counter-clockwise.
pub fn ring_signed_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for w in ring.windows(2) {
        sum += w[0][0] * w[1][1] - w[1][0] * w[0][1];
    }
    let (first, last) = (ring[0], ring[ring.len() - 1]);
    if first != last {
        sum += last[0] * first[1] - first[0] * last[1];
    }
    sum / 2.0
}

/// Whether the polygon's outer ring winds counter-clockwise and every hole
/// clockwise.
pub fn follows_right_hand_rule(rings: &[Vec<Position>]) -> bool {
    rings.iter().enumerate().all(|(i, ring)| {
        let area = ring_signed_area(ring);
        if i == 0 { area >= 0.0 } else { area <= 0.0 }
    })
}

/// Return a corrected copy of a polygon whose rings violate the right-hand
/// rule, or `None` if no correction is needed or the geometry is not a polygon.
pub fn ensure_right_hand_rule(geometry: &Geometry) -> Option<Geometry> {
    let Geometry::Polygon(rings) = geometry else {
        return None;
    };
    if follows_right_hand_rule(rings) {
        return None;
    }
    let corrected = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let area = ring_signed_area(ring);
            let wrong = if i == 0 { area < 0.0 } else { area > 0.0 };
            if wrong {
                ring.iter().rev().copied().collect()
            } else {
                ring.clone()
            }
        })
        .collect();
    Some(Geometry::Polygon(corrected))
}

/// Spherical-excess ring area in square meters.
fn ring_area_m2(ring: &[Position]) -> f64 {
    let n = ring.len();
    if n <= 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..n {
        let (lower, middle, upper) = if i == n - 2 {
            (n - 2, n - 1, 0)
        } else if i == n - 1 {
            (n - 1, 0, 1)
        } else {
            (i, i + 1, i + 2)
        };
        let p1 = ring[lower];
        let p2 = ring[middle];
        let p3 = ring[upper];
        total += (p3[0].to_radians() - p1[0].to_radians()) * p2[1].to_radians().sin();
    }
    (total * WEB_MERCATOR_RADIUS_M * WEB_MERCATOR_RADIUS_M / 2.0).abs()
}

/// Geodesic area of a polygon in square meters, holes subtracted. Independent
/// of zoom level and projection.
pub fn geodesic_area_m2(rings: &[Vec<Position>]) -> f64 {
    let Some(outer) = rings.first() else {
        return 0.0;
    };
    let holes: f64 = rings.iter().skip(1).map(|r| ring_area_m2(r)).sum();
    (ring_area_m2(outer) - holes).max(0.0)
}
