//! Resizing a feature by dragging one of its vertices.
//!
//! Scaling happens in Web Mercator space so the shape keeps its on-screen
//! proportions.

use super::{commit_geometry, Guidance, ValidateFn};
use crate::common::{DrawPointerEvent, UpdateType};
use crate::error::DrawResult;
use crate::feature::{FeatureId, Position};
use crate::geometry::{limit_position_precision, lng_lat_to_web_mercator, web_mercator_to_lng_lat};
use crate::modes::ModeContext;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// The point that stays fixed while resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeOrigin {
    /// Scale about the bounding box center, axes independently.
    #[serde(rename = "center")]
    Center,
    /// Scale about the vertex farthest from the dragged one.
    #[serde(rename = "opposite")]
    Opposite,
    /// Like `Center` but keeping the aspect ratio.
    #[serde(rename = "center-fixed")]
    CenterFixed,
    /// Like `Opposite` but keeping the aspect ratio.
    #[serde(rename = "opposite-fixed")]
    OppositeFixed,
}

impl ResizeOrigin {
    fn keeps_aspect(self) -> bool {
        matches!(self, ResizeOrigin::CenterFixed | ResizeOrigin::OppositeFixed)
    }
}

/// Below this many mercator meters an axis is treated as flat.
const MIN_EXTENT: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct DragCoordinateResize {
    dragged: Option<(FeatureId, usize)>,
}

impl DragCoordinateResize {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, feature_id: FeatureId, index: usize) {
        self.dragged = Some((feature_id, index));
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    pub fn stop(&mut self) -> Option<FeatureId> {
        self.dragged.take().map(|(id, _)| id)
    }

    fn origin(kind: ResizeOrigin, points: &[Point], dragged: Point) -> Point {
        match kind {
            ResizeOrigin::Center | ResizeOrigin::CenterFixed => {
                let (min, max) = points.iter().fold(
                    (Point::new(f64::MAX, f64::MAX), Point::new(f64::MIN, f64::MIN)),
                    |(lo, hi), p| (Point::new(lo.x.min(p.x), lo.y.min(p.y)), Point::new(hi.x.max(p.x), hi.y.max(p.y))),
                );
                min.midpoint(max)
            }
            ResizeOrigin::Opposite | ResizeOrigin::OppositeFixed => points
                .iter()
                .copied()
                .max_by(|a, b| a.distance(dragged).total_cmp(&b.distance(dragged)))
                .unwrap_or(dragged),
        }
    }

    pub fn drag(
        &mut self,
        ctx: &mut ModeContext<'_>,
        event: &DrawPointerEvent,
        kind: ResizeOrigin,
        guidance: Guidance<'_>,
        validate: ValidateFn<'_>,
    ) -> DrawResult<bool> {
        let Some((feature_id, index)) = self.dragged.clone() else {
            return Ok(false);
        };
        let mut feature = ctx.store.copy(&feature_id)?;
        let points: Vec<Point> = feature
            .geometry
            .editable_positions()
            .into_iter()
            .map(lng_lat_to_web_mercator)
            .collect();
        let Some(&dragged) = points.get(index) else {
            return Ok(false);
        };
        let origin = Self::origin(kind, &points, dragged);
        let target = lng_lat_to_web_mercator(event.position());

        let from: Vec2 = dragged - origin;
        let to: Vec2 = target - origin;
        let scale = if kind.keeps_aspect() {
            if from.hypot() < MIN_EXTENT {
                return Ok(false);
            }
            let s = to.hypot() / from.hypot();
            Vec2::new(s, s)
        } else {
            let axis = |f: f64, t: f64| if f.abs() < MIN_EXTENT { 1.0 } else { t / f };
            Vec2::new(axis(from.x, to.x), axis(from.y, to.y))
        };
        if !(scale.x.is_finite() && scale.y.is_finite()) || scale.x <= 0.0 || scale.y <= 0.0 {
            return Ok(false);
        }

        let precision = ctx.precision();
        feature.geometry = feature.geometry.map_positions(|p: Position| {
            let m = lng_lat_to_web_mercator(p) - origin;
            let scaled = origin + Vec2::new(m.x * scale.x, m.y * scale.y);
            limit_position_precision(web_mercator_to_lng_lat(scaled), precision)
        });
        commit_geometry(ctx, &feature, guidance, validate, UpdateType::Provisional)
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

    fn run(kind: ResizeOrigin, to: Position) -> Vec<Position> {
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let modes = HashMap::new();
        let mut events = Vec::new();
        let square = Geometry::Polygon(vec![vec![[0.0, 0.0], [0.1, 0.0], [0.1, 0.1], [0.0, 0.1], [0.0, 0.0]]]);
        let ids = store.create(vec![NewFeature::new(square, Properties::new())], Origin::Api);
        let event = adapter.pointer_event(to[0], to[1]);
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);

        let mut resize = DragCoordinateResize::new();
        resize.start(ids[0].clone(), 2);
        assert!(resize
            .drag(&mut ctx, &event, kind, Guidance::none(), &|_, _| Validation::valid())
            .unwrap());
        ctx.store.get_geometry_copy(&ids[0]).unwrap().editable_positions()
    }

    #[test]
    fn test_opposite_keeps_far_corner() {
        let positions = run(ResizeOrigin::Opposite, [0.2, 0.2]);
        assert!(positions[0][0].abs() < 1e-9 && positions[0][1].abs() < 1e-9);
        assert!((positions[2][0] - 0.2).abs() < 1e-6);
        assert!((positions[2][1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_center_scales_both_sides() {
        let positions = run(ResizeOrigin::Center, [0.15, 0.15]);
        assert!((positions[0][0] + 0.05).abs() < 1e-6);
        assert!((positions[2][0] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_serde_names() {
        let kind: ResizeOrigin = serde_json::from_str("\"opposite-fixed\"").unwrap();
        assert_eq!(kind, ResizeOrigin::OppositeFixed);
    }
}
