//! Geodesic shape builders.

use super::measure::destination;
use crate::feature::Position;

/// A closed, counter-clockwise ring approximating a geodesic circle.
pub fn circle_polygon(center: Position, radius_km: f64, steps: usize) -> Vec<Vec<Position>> {
    let steps = steps.max(3);
    let mut ring: Vec<Position> = (0..steps)
        .map(|i| destination(center, radius_km, (i as f64 * -360.0) / steps as f64))
        .collect();
    ring.push(ring[0]);
    vec![ring]
}

/// Points along a geodesic arc swept clockwise from `start_bearing` to
/// `end_bearing`. Always yields at least the two end points.
pub fn geodesic_arc(
    center: Position,
    radius_km: f64,
    start_bearing: f64,
    end_bearing: f64,
    steps_per_circle: usize,
) -> Vec<Position> {
    let sweep = (end_bearing - start_bearing).rem_euclid(360.0);
    // Tolerance keeps float noise in the sweep from adding a segment
    let segments = ((sweep / 360.0) * steps_per_circle.max(4) as f64 - 1e-9).ceil().max(1.0) as usize;
    (0..=segments)
        .map(|i| {
            let b = start_bearing + sweep * (i as f64 / segments as f64);
            destination(center, radius_km, b)
        })
        .collect()
}
