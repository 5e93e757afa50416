//! Coordinate points: guidance points on every vertex of a finished feature,
//! tracked on the parent through its `coordinatePointIds` property.

use crate::common::property;
use crate::error::DrawResult;
use crate::feature::{properties, FeatureId, Geometry, Position};
use crate::modes::ModeContext;
use crate::store::{NewFeature, Origin};
use serde_json::{json, Value};

fn coordinate_positions(geometry: &Geometry) -> Vec<Position> {
    match geometry {
        Geometry::Point(_) => Vec::new(),
        _ => geometry.editable_positions(),
    }
}

/// Create coordinate points for `feature_id`, or move the existing ones if
/// the vertex count is unchanged.
pub fn create_or_update(ctx: &mut ModeContext<'_>, feature_id: &FeatureId) -> DrawResult<()> {
    let parent = ctx.store.copy(feature_id)?;
    let positions = coordinate_positions(&parent.geometry);
    let existing = parent.coordinate_point_ids();

    if !existing.is_empty() && existing.len() == positions.len() && existing.iter().all(|id| ctx.store.has(id)) {
        let updates = existing
            .into_iter()
            .zip(positions.into_iter().map(Geometry::Point))
            .collect();
        return ctx.store.update_geometry(updates, Origin::Interaction);
    }

    ctx.store.delete_if_present(&existing, Origin::Interaction);
    let mode = parent.mode().unwrap_or_default().to_string();
    let entries = positions
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            NewFeature::new(
                Geometry::Point(p),
                properties([
                    (property::MODE, json!(mode)),
                    (property::COORDINATE_POINT, json!(true)),
                    (property::COORDINATE_POINT_FEATURE_ID, Value::from(feature_id)),
                    (property::INDEX, json!(i)),
                ]),
            )
        })
        .collect();
    let ids = ctx.store.create(entries, Origin::Interaction);
    let ids: Vec<Value> = ids.iter().map(Value::from).collect();
    ctx.store.update_property(
        vec![(feature_id.clone(), property::COORDINATE_POINT_IDS, Some(Value::Array(ids)))],
        Origin::Interaction,
    )
}

/// Geometry update moving the coordinate point of vertex `index`, if the
/// parent tracks one.
pub fn updated_at(
    ctx: &ModeContext<'_>,
    feature_id: &FeatureId,
    index: usize,
    position: Position,
) -> Option<(FeatureId, Geometry)> {
    let parent = ctx.store.get(feature_id)?;
    let id = parent.coordinate_point_ids().get(index).cloned()?;
    ctx.store.has(&id).then(|| (id, Geometry::Point(position)))
}

/// Delete every coordinate point of `feature_id` and drop the back
/// reference. Missing features are ignored.
pub fn delete_for(ctx: &mut ModeContext<'_>, feature_id: &FeatureId) -> DrawResult<()> {
    let Some(parent) = ctx.store.get(feature_id) else {
        return Ok(());
    };
    let existing = parent.coordinate_point_ids();
    if existing.is_empty() {
        return Ok(());
    }
    ctx.store.delete_if_present(&existing, Origin::Interaction);
    ctx.store.update_property(
        vec![(feature_id.clone(), property::COORDINATE_POINT_IDS, None)],
        Origin::Interaction,
    )
}
