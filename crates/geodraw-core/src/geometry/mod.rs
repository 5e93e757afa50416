//! Pure geometry helpers: distances, containment, intersection and winding.
//!
//! Functions here carry no state. Geographic inputs are longitude/latitude
//! degrees ([`Position`]); pixel-space inputs use [`kurbo::Point`].

mod bbox;
mod measure;
mod polygon;
mod segment;
mod self_intersects;
mod shapes;

pub use bbox::Bounds;
pub use measure::{
    bearing, cartesian_distance, destination, haversine_distance_km, lng_lat_to_web_mercator,
    web_mercator_midpoint, web_mercator_to_lng_lat, EARTH_RADIUS_KM, WEB_MERCATOR_RADIUS_M,
};
pub use polygon::{
    ensure_right_hand_rule, follows_right_hand_rule, geodesic_area_m2, point_in_polygon,
    ring_signed_area,
};
pub use segment::{nearest_point_on_segment, point_to_segment_distance, segments_intersect};
pub use self_intersects::self_intersects;
pub use shapes::{circle_polygon, geodesic_arc};

use crate::feature::Position;

/// Maximum number of decimal places a coordinate can meaningfully carry.
pub const MAX_COORDINATE_PRECISION: u32 = 15;

/// Round a value to `precision` decimal places.
pub fn limit_precision(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(MAX_COORDINATE_PRECISION) as i32);
    (value * factor).round() / factor
}

/// Round both components of a position to `precision` decimal places.
pub fn limit_position_precision(position: Position, precision: u32) -> Position {
    [
        limit_precision(position[0], precision),
        limit_precision(position[1], precision),
    ]
}

/// Whether a position lies inside the valid longitude/latitude range.
pub fn position_in_range(position: Position) -> bool {
    position[0].is_finite()
        && position[1].is_finite()
        && (-180.0..=180.0).contains(&position[0])
        && (-90.0..=90.0).contains(&position[1])
}

/// Whether a position is in range and carries no more than `precision`
/// decimal places.
pub fn position_is_valid(position: Position, precision: u32) -> bool {
    position_in_range(position)
        && position.iter().all(|v| {
            let limited = limit_precision(*v, precision);
            (limited - v).abs() <= f64::EPSILON * v.abs().max(1.0) * 4.0
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_precision() {
        assert_eq!(limit_precision(1.123456789, 3), 1.123);
        assert_eq!(limit_precision(-2.71828, 2), -2.72);
        assert_eq!(limit_precision(10.0, 0), 10.0);
    }

    #[test]
    fn test_position_validity() {
        assert!(position_is_valid([10.123, -5.5], 3));
        assert!(!position_is_valid([10.1234, -5.5], 3));
        assert!(!position_is_valid([181.0, 0.0], 9));
        assert!(!position_is_valid([0.0, -90.5], 9));
        assert!(!position_is_valid([f64::NAN, 0.0], 9));
    }
}
