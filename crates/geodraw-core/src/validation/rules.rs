//! Built-in validation predicates.

use super::Validation;
use crate::common::UpdateType;
use crate::feature::{Feature, Geometry, Position};
use serde::{Deserialize, Serialize};
use crate::geometry::{geodesic_area_m2, position_is_valid, self_intersects};

pub const REASON_NOT_A_POINT: &str = "Feature is not a Point";
pub const REASON_NOT_A_LINESTRING: &str = "Feature is not a LineString";
pub const REASON_NOT_A_POLYGON: &str = "Feature is not a Polygon";
pub const REASON_INVALID_COORDINATES: &str = "Feature has invalid coordinates";
pub const REASON_SELF_INTERSECTS: &str = "Feature intersects itself";
pub const REASON_TOO_SMALL: &str = "Feature area is smaller than the minimum";
pub const REASON_TOO_LARGE: &str = "Feature area is larger than the maximum";

fn all_valid(positions: &[Position], precision: u32) -> bool {
    positions.iter().all(|p| position_is_valid(*p, precision))
}

pub fn validate_point(feature: &Feature, precision: u32) -> Validation {
    match &feature.geometry {
        Geometry::Point(p) if position_is_valid(*p, precision) => Validation::valid(),
        Geometry::Point(_) => Validation::invalid(REASON_INVALID_COORDINATES),
        _ => Validation::invalid(REASON_NOT_A_POINT),
    }
}

/// At least two valid positions.
pub fn validate_linestring(feature: &Feature, precision: u32) -> Validation {
    match &feature.geometry {
        Geometry::LineString(coords) if coords.len() >= 2 && all_valid(coords, precision) => {
            Validation::valid()
        }
        Geometry::LineString(_) => Validation::invalid(REASON_INVALID_COORDINATES),
        _ => Validation::invalid(REASON_NOT_A_LINESTRING),
    }
}

/// Every ring closed, with at least three distinct vertices plus the closing
/// vertex.
pub fn validate_polygon(feature: &Feature, precision: u32) -> Validation {
    let Geometry::Polygon(rings) = &feature.geometry else {
        return Validation::invalid(REASON_NOT_A_POLYGON);
    };
    let well_formed = !rings.is_empty()
        && rings.iter().all(|ring| {
            ring.len() >= 4 && ring.first() == ring.last() && all_valid(ring, precision)
        });
    if well_formed {
        Validation::valid()
    } else {
        Validation::invalid(REASON_INVALID_COORDINATES)
    }
}

pub fn validate_non_self_intersecting(feature: &Feature) -> Validation {
    if self_intersects(&feature.geometry) {
        Validation::invalid(REASON_SELF_INTERSECTS)
    } else {
        Validation::valid()
    }
}

/// Geodesic area must be at least `min_m2` square meters.
pub fn validate_min_area(feature: &Feature, min_m2: f64) -> Validation {
    match &feature.geometry {
        Geometry::Polygon(rings) if geodesic_area_m2(rings) < min_m2 => Validation::invalid(REASON_TOO_SMALL),
        Geometry::Polygon(_) => Validation::valid(),
        _ => Validation::invalid(REASON_NOT_A_POLYGON),
    }
}

/// Geodesic area must be at most `max_m2` square meters.
pub fn validate_max_area(feature: &Feature, max_m2: f64) -> Validation {
    match &feature.geometry {
        Geometry::Polygon(rings) if geodesic_area_m2(rings) > max_m2 => Validation::invalid(REASON_TOO_LARGE),
        Geometry::Polygon(_) => Validation::valid(),
        _ => Validation::invalid(REASON_NOT_A_POLYGON),
    }
}

/// Geodesic area bounds in square meters, configurable on polygon-family
/// modes as `areaLimits`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AreaLimits {
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
}

impl AreaLimits {
    /// The maximum applies to every update. The minimum only applies once a
    /// shape is finished, as a shape under construction starts out empty.
    pub fn validate(&self, feature: &Feature, update_type: UpdateType) -> Validation {
        let max = match self.max_area {
            Some(max) => validate_max_area(feature, max),
            None => Validation::valid(),
        };
        max.and_then(|| match self.min_area {
            Some(min) if update_type == UpdateType::Finish => validate_min_area(feature, min),
            _ => Validation::valid(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureId, Properties};

    fn feature(geometry: Geometry) -> Feature {
        Feature::new(FeatureId::from(1), geometry, Properties::new())
    }

    fn square(size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![[0.0, 0.0], [size, 0.0], [size, size], [0.0, size], [0.0, 0.0]]])
    }

    #[test]
    fn test_shape_checks() {
        assert!(validate_polygon(&feature(square(1.0)), 9).valid);
        let open = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        assert_eq!(
            validate_polygon(&feature(open), 9).reason.as_deref(),
            Some(REASON_INVALID_COORDINATES)
        );
        let too_few = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]);
        assert!(!validate_polygon(&feature(too_few), 9).valid);

        assert!(!validate_linestring(&feature(Geometry::LineString(vec![[0.0, 0.0]])), 9).valid);
        assert_eq!(
            validate_point(&feature(square(1.0)), 9).reason.as_deref(),
            Some(REASON_NOT_A_POINT)
        );
        assert!(!validate_point(&feature(Geometry::Point([200.0, 0.0])), 9).valid);
    }

    #[test]
    fn test_area_bounds() {
        let one_degree = feature(square(1.0));
        // ~12,391 km^2
        assert!(validate_min_area(&one_degree, 1.0e10).valid);
        assert!(!validate_min_area(&one_degree, 2.0e10).valid);
        assert!(validate_max_area(&one_degree, 2.0e10).valid);
        assert_eq!(
            validate_max_area(&one_degree, 1.0e9).reason.as_deref(),
            Some(REASON_TOO_LARGE)
        );
    }

    #[test]
    fn test_self_intersection_rule() {
        let bowtie = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]);
        assert!(!validate_non_self_intersecting(&feature(bowtie)).valid);
        assert!(validate_non_self_intersecting(&feature(square(1.0))).valid);
    }

    #[test]
    fn test_area_limits_by_update_type() {
        let one_degree = feature(square(1.0));
        let limits: AreaLimits = serde_json::from_value(serde_json::json!({ "minArea": 1.3e10 })).unwrap();
        assert!(limits.validate(&one_degree, UpdateType::Provisional).valid);
        assert_eq!(
            limits.validate(&one_degree, UpdateType::Finish).reason.as_deref(),
            Some(REASON_TOO_SMALL)
        );

        let limits = AreaLimits {
            max_area: Some(1.0e9),
            ..Default::default()
        };
        assert!(!limits.validate(&one_degree, UpdateType::Provisional).valid);
        assert!(AreaLimits::default().validate(&one_degree, UpdateType::Finish).valid);
    }
}
