//! Translating a whole feature with the pointer.

use super::{commit_geometry, Guidance, ValidateFn};
use crate::common::{DrawPointerEvent, UpdateType};
use crate::error::DrawResult;
use crate::feature::FeatureId;
use crate::modes::ModeContext;
use kurbo::Point;

#[derive(Debug, Clone, Default)]
pub struct DragFeature {
    feature_id: Option<FeatureId>,
    /// Pointer position of the last applied frame, in pixels.
    last: Option<Point>,
}

impl DragFeature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, feature_id: FeatureId, event: &DrawPointerEvent) {
        self.feature_id = Some(feature_id);
        self.last = Some(event.point());
    }

    pub fn is_dragging(&self) -> bool {
        self.feature_id.is_some()
    }

    pub fn stop(&mut self) -> Option<FeatureId> {
        self.last = None;
        self.feature_id.take()
    }

    /// Move every vertex by the pixel delta since the last applied frame.
    pub fn drag(
        &mut self,
        ctx: &mut ModeContext<'_>,
        event: &DrawPointerEvent,
        guidance: Guidance<'_>,
        validate: ValidateFn<'_>,
    ) -> DrawResult<bool> {
        let (Some(feature_id), Some(last)) = (self.feature_id.clone(), self.last) else {
            return Ok(false);
        };
        let delta = event.point() - last;
        let mut feature = ctx.store.copy(&feature_id)?;
        let moved = feature.geometry.try_map_positions(|p| {
            let pixel = ctx.project_position(p) + delta;
            ctx.unproject(pixel).map(|p| ctx.limit(p))
        });
        let Some(geometry) = moved else {
            return Ok(false);
        };
        feature.geometry = geometry;

        let applied = commit_geometry(ctx, &feature, guidance, validate, UpdateType::Provisional)?;
        if applied {
            self.last = Some(event.point());
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

    #[test]
    fn test_translates_by_pixel_delta() {
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let modes = HashMap::new();
        let mut events = Vec::new();
        let ids = store.create(
            vec![NewFeature::new(
                Geometry::LineString(vec![[0.0, 0.0], [0.1, 0.0]]),
                Properties::new(),
            )],
            Origin::Api,
        );
        let start = adapter.pointer_event(0.05, 0.0);
        let end = adapter.pointer_event(0.06, 0.0);
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);

        let mut drag = DragFeature::new();
        drag.start(ids[0].clone(), &start);
        assert!(drag.drag(&mut ctx, &end, Guidance::none(), &|_, _| Validation::valid()).unwrap());

        let Geometry::LineString(coords) = ctx.store.get_geometry_copy(&ids[0]).unwrap() else {
            panic!("expected line");
        };
        assert!((coords[0][0] - 0.01).abs() < 1e-6);
        assert!((coords[1][0] - 0.11).abs() < 1e-6);
        assert_eq!(drag.stop(), Some(ids[0].clone()));
    }
}
