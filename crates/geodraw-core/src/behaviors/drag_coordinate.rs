//! Dragging a single vertex.

use super::coordinate_point;
use super::pointer::pixel_distance;
use super::{Guidance, ValidateFn};
use crate::common::{DrawPointerEvent, UpdateType};
use crate::error::DrawResult;
use crate::feature::{FeatureId, Position};
use crate::geometry::{position_in_range, self_intersects};
use crate::modes::ModeContext;
use crate::store::Origin;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Dragged {
    feature_id: FeatureId,
    index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DragCoordinate {
    pointer_distance: f64,
    dragged: Option<Dragged>,
}

impl DragCoordinate {
    pub fn new(pointer_distance: f64) -> Self {
        Self {
            pointer_distance,
            dragged: None,
        }
    }

    pub fn set_pointer_distance(&mut self, pointer_distance: f64) {
        self.pointer_distance = pointer_distance;
    }

    /// Index of the editable vertex of `feature_id` closest to the pointer,
    /// if within the pointer distance. The shared first/last vertex of a
    /// polygon ring is index 0.
    pub fn draggable_index(
        &self,
        ctx: &ModeContext<'_>,
        event: &DrawPointerEvent,
        feature_id: &FeatureId,
    ) -> Option<usize> {
        let feature = ctx.store.get(feature_id)?;
        feature
            .geometry
            .editable_positions()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (i, pixel_distance(&*ctx.adapter, event, p)))
            .filter(|(_, d)| *d <= self.pointer_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn start(&mut self, feature_id: FeatureId, index: usize) {
        self.dragged = Some(Dragged { feature_id, index });
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    pub fn dragged_index(&self) -> Option<usize> {
        self.dragged.as_ref().map(|d| d.index)
    }

    pub fn feature_id(&self) -> Option<&FeatureId> {
        self.dragged.as_ref().map(|d| &d.feature_id)
    }

    /// End the drag, returning the feature that was dragged.
    pub fn stop(&mut self) -> Option<FeatureId> {
        self.dragged.take().map(|d| d.feature_id)
    }

    /// Move the dragged vertex to `target` (the snapped position, or the
    /// pointer). The frame is dropped if the target leaves the valid
    /// longitude/latitude range, creates a self-intersection (unless
    /// allowed) or fails `validate`. Otherwise the vertex and the guidance
    /// around it are written as one update. Returns whether the frame was
    /// applied.
    pub fn drag(
        &self,
        ctx: &mut ModeContext<'_>,
        target: Position,
        allow_self_intersection: bool,
        guidance: Guidance<'_>,
        validate: ValidateFn<'_>,
    ) -> DrawResult<bool> {
        let Some(Dragged { feature_id, index }) = self.dragged.clone() else {
            return Ok(false);
        };
        if !position_in_range(target) {
            log::warn!("drag of {feature_id} rejected: {target:?} is out of range");
            return Ok(false);
        }
        let target = ctx.limit(target);

        let mut feature = ctx.store.copy(&feature_id)?;
        let mut positions = feature.geometry.editable_positions();
        let Some(slot) = positions.get_mut(index) else {
            return Ok(false);
        };
        *slot = target;
        feature.geometry = feature.geometry.with_editable_positions(positions);

        if !allow_self_intersection && self_intersects(&feature.geometry) {
            log::debug!("drag of {feature_id} rejected: self-intersection");
            return Ok(false);
        }
        let verdict = validate(&feature, &ctx.validation_context(UpdateType::Provisional));
        if !verdict.valid {
            log::debug!("drag of {feature_id} rejected: {:?}", verdict.reason);
            return Ok(false);
        }

        let mut updates = vec![(feature_id.clone(), feature.geometry.clone())];
        if let Some(points) = guidance.selection_points {
            updates.extend(points.updated_at(index, target));
        }
        if let Some(mids) = guidance.mid_points {
            updates.extend(mids.updated_around(index, &feature.geometry, ctx.precision()));
        }
        updates.extend(coordinate_point::updated_at(ctx, &feature_id, index, target));
        ctx.store.update_geometry(updates, Origin::Interaction)?;
        Ok(true)
    }
}
