//! Interaction helpers layered on the store.
//!
//! Modes own their behaviors and pass in whatever each call needs; no
//! behavior holds a reference back into a mode.

pub mod coordinate_point;
mod closing_points;
mod drag_coordinate;
mod drag_coordinate_resize;
mod drag_feature;
mod features_at_pointer;
mod mid_point;
mod pointer;
mod selection_point;
mod snapping;
mod transform;

pub use closing_points::{ClosingHit, ClosingPoints};
pub use drag_coordinate::DragCoordinate;
pub use drag_coordinate_resize::{DragCoordinateResize, ResizeOrigin};
pub use drag_feature::DragFeature;
pub use features_at_pointer::{features_at_pointer, FeatureQueryOptions};
pub use mid_point::{midpoint_positions, MidPoints};
pub use pointer::{pixel_distance, pixel_distance_between, ClickBoundingBox, PointerMovement, MIN_POINTER_MOVEMENT};
pub use selection_point::{selection_positions, SelectionPoints};
pub use snapping::{snap, snap_to_coordinate, snap_to_line, CustomSnap, SnappingOptions, SnappingPoint};
pub use transform::{RotateFeature, ScaleFeature};

use crate::common::UpdateType;
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry};
use crate::geometry::position_in_range;
use crate::modes::ModeContext;
use crate::store::Origin;
use crate::validation::{Validation, ValidationContext};

/// Validator a mode hands to a behavior before it commits a change.
pub type ValidateFn<'v> = &'v dyn Fn(&Feature, &ValidationContext<'_>) -> Validation;

/// Guidance features that follow a feature while it is edited.
#[derive(Debug, Clone, Copy, Default)]
pub struct Guidance<'g> {
    pub selection_points: Option<&'g SelectionPoints>,
    pub mid_points: Option<&'g MidPoints>,
}

impl<'g> Guidance<'g> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(selection_points: &'g SelectionPoints, mid_points: &'g MidPoints) -> Self {
        Self {
            selection_points: Some(selection_points),
            mid_points: Some(mid_points),
        }
    }

    /// Updates that move every guidance feature onto `geometry`.
    pub fn updates_for(
        &self,
        ctx: &ModeContext<'_>,
        feature_id: &FeatureId,
        geometry: &Geometry,
    ) -> Vec<(FeatureId, Geometry)> {
        let mut updates = Vec::new();
        if let Some(points) = self.selection_points {
            updates.extend(points.updated(geometry));
        }
        if let Some(mids) = self.mid_points {
            updates.extend(mids.updated(geometry, ctx.precision()));
        }
        if let Some(parent) = ctx.store.get(feature_id) {
            let ids = parent.coordinate_point_ids();
            let positions = geometry.editable_positions();
            if !ids.is_empty() && ids.len() == positions.len() && !matches!(geometry, Geometry::Point(_)) {
                updates.extend(
                    ids.into_iter()
                        .filter(|id| ctx.store.has(id))
                        .zip(positions.into_iter().map(Geometry::Point)),
                );
            }
        }
        updates
    }
}

/// Validate `candidate` and, if it passes, write it together with its
/// guidance as one store update. Returns whether the change was applied.
pub(crate) fn commit_geometry(
    ctx: &mut ModeContext<'_>,
    candidate: &Feature,
    guidance: Guidance<'_>,
    validate: ValidateFn<'_>,
    update_type: UpdateType,
) -> DrawResult<bool> {
    if !candidate.geometry.positions().into_iter().all(position_in_range) {
        log::warn!("rejected change to {}: position out of range", candidate.id);
        return Ok(false);
    }
    let verdict = validate(candidate, &ctx.validation_context(update_type));
    if !verdict.valid {
        log::debug!("rejected change to {}: {:?}", candidate.id, verdict.reason);
        return Ok(false);
    }
    let mut updates = vec![(candidate.id.clone(), candidate.geometry.clone())];
    updates.extend(guidance.updates_for(ctx, &candidate.id, &candidate.geometry));
    ctx.store.update_geometry(updates, Origin::Interaction)?;
    Ok(true)
}
