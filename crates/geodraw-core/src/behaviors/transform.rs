//! Rotating and scaling a feature about its centroid with the pointer.

use super::{commit_geometry, Guidance, ValidateFn};
use crate::common::{DrawPointerEvent, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId};
use crate::geometry::{limit_position_precision, lng_lat_to_web_mercator, web_mercator_to_lng_lat};
use crate::modes::ModeContext;
use kurbo::{Affine, Point, Vec2};

/// Mean of the editable vertices in Web Mercator space.
fn mercator_centroid(feature: &Feature) -> Option<Point> {
    let points = feature.geometry.editable_positions();
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .map(|p| lng_lat_to_web_mercator(*p).to_vec2())
        .fold(Vec2::ZERO, |acc, v| acc + v);
    Some((sum / points.len() as f64).to_point())
}

fn apply(ctx: &mut ModeContext<'_>, mut feature: Feature, affine: Affine, guidance: Guidance<'_>, validate: ValidateFn<'_>) -> DrawResult<bool> {
    let precision = ctx.precision();
    feature.geometry = feature.geometry.map_positions(|p| {
        let moved = affine * lng_lat_to_web_mercator(p);
        limit_position_precision(web_mercator_to_lng_lat(moved), precision)
    });
    commit_geometry(ctx, &feature, guidance, validate, UpdateType::Provisional)
}

/// Rotation by the change in pointer angle around the centroid.
#[derive(Debug, Clone, Default)]
pub struct RotateFeature {
    last_angle: Option<f64>,
}

impl RotateFeature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_angle = None;
    }

    pub fn rotate(
        &mut self,
        ctx: &mut ModeContext<'_>,
        event: &DrawPointerEvent,
        feature_id: &FeatureId,
        guidance: Guidance<'_>,
        validate: ValidateFn<'_>,
    ) -> DrawResult<bool> {
        let feature = ctx.store.copy(feature_id)?;
        let Some(centroid) = mercator_centroid(&feature) else {
            return Ok(false);
        };
        let angle = (lng_lat_to_web_mercator(event.position()) - centroid).atan2();
        let Some(last) = self.last_angle.replace(angle) else {
            return Ok(false);
        };
        let affine = Affine::translate(centroid.to_vec2())
            * Affine::rotate(angle - last)
            * Affine::translate(-centroid.to_vec2());
        apply(ctx, feature, affine, guidance, validate)
    }
}

/// Uniform scale by the change in pointer distance from the centroid.
#[derive(Debug, Clone, Default)]
pub struct ScaleFeature {
    last_distance: Option<f64>,
}

impl ScaleFeature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_distance = None;
    }

    pub fn scale(
        &mut self,
        ctx: &mut ModeContext<'_>,
        event: &DrawPointerEvent,
        feature_id: &FeatureId,
        guidance: Guidance<'_>,
        validate: ValidateFn<'_>,
    ) -> DrawResult<bool> {
        let feature = ctx.store.copy(feature_id)?;
        let Some(centroid) = mercator_centroid(&feature) else {
            return Ok(false);
        };
        let distance = lng_lat_to_web_mercator(event.position()).distance(centroid);
        let Some(last) = self.last_distance else {
            self.last_distance = Some(distance);
            return Ok(false);
        };
        if last <= f64::EPSILON || distance <= f64::EPSILON {
            return Ok(false);
        }
        let affine = Affine::translate(centroid.to_vec2())
            * Affine::scale(distance / last)
            * Affine::translate(-centroid.to_vec2());
        let applied = apply(ctx, feature, affine, guidance, validate)?;
        if applied {
            self.last_distance = Some(distance);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::feature::{Geometry, Properties};
    use crate::store::{GeoJsonStore, NewFeature, Origin};
    use crate::validation::Validation;
    use std::collections::HashMap;

    fn square() -> Geometry {
        Geometry::Polygon(vec![vec![[-0.1, -0.1], [0.1, -0.1], [0.1, 0.1], [-0.1, 0.1], [-0.1, -0.1]]])
    }

    #[test]
    fn test_quarter_turn() {
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let modes = HashMap::new();
        let mut events = Vec::new();
        let ids = store.create(vec![NewFeature::new(square(), Properties::new())], Origin::Api);
        let east = adapter.pointer_event(0.2, 0.0);
        let north = adapter.pointer_event(0.0, 0.2);
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);

        let mut rotate = RotateFeature::new();
        let ok = &|_: &Feature, _: &crate::validation::ValidationContext<'_>| Validation::valid();
        assert!(!rotate.rotate(&mut ctx, &east, &ids[0], Guidance::none(), ok).unwrap());
        assert!(rotate.rotate(&mut ctx, &north, &ids[0], Guidance::none(), ok).unwrap());

        let positions = ctx.store.get_geometry_copy(&ids[0]).unwrap().editable_positions();
        // [-0.1, -0.1] rotated 90 degrees counter-clockwise lands on [0.1, -0.1]
        assert!((positions[0][0] - 0.1).abs() < 1e-6);
        assert!((positions[0][1] + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_double_distance_doubles_size() {
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let modes = HashMap::new();
        let mut events = Vec::new();
        let ids = store.create(vec![NewFeature::new(square(), Properties::new())], Origin::Api);
        let near = adapter.pointer_event(0.1, 0.0);
        let far = adapter.pointer_event(0.2, 0.0);
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);

        let mut scale = ScaleFeature::new();
        let ok = &|_: &Feature, _: &crate::validation::ValidationContext<'_>| Validation::valid();
        assert!(!scale.scale(&mut ctx, &near, &ids[0], Guidance::none(), ok).unwrap());
        assert!(scale.scale(&mut ctx, &far, &ids[0], Guidance::none(), ok).unwrap());
        let positions = ctx.store.get_geometry_copy(&ids[0]).unwrap().editable_positions();
        assert!((positions[1][0] - 0.2).abs() < 1e-6);
    }
}
