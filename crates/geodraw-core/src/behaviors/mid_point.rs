//! Midpoints: guidance points halfway along each segment of the selected
//! feature. Clicking one inserts a real vertex there.

use super::selection_point::SelectionPoints;
use crate::common::{property, UpdateType};
use crate::error::DrawResult;
use crate::feature::{properties, Feature, FeatureId, Geometry, Position};
use crate::geometry::{limit_position_precision, web_mercator_midpoint};
use crate::modes::ModeContext;
use crate::store::{NewFeature, Origin};
use crate::validation::{Validation, ValidationContext};
use serde_json::{json, Value};

/// Segment `i` runs from vertex `i` to vertex `i + 1`; polygons also have
/// the segment back to the first vertex.
pub fn midpoint_positions(geometry: &Geometry, precision: u32) -> Vec<Position> {
    let positions = geometry.editable_positions();
    let n = positions.len();
    let segment_count = match geometry {
        Geometry::Point(_) => 0,
        Geometry::LineString(_) => n.saturating_sub(1),
        Geometry::Polygon(_) if n >= 3 => n,
        Geometry::Polygon(_) => 0,
    };
    (0..segment_count)
        .map(|i| {
            let mid = web_mercator_midpoint(positions[i], positions[(i + 1) % n]);
            limit_position_precision(mid, precision)
        })
        .collect()
}

fn midpoint_feature(position: Position, feature_id: &FeatureId, segment: usize, mode: &str) -> NewFeature {
    NewFeature::new(
        Geometry::Point(position),
        properties([
            (property::MODE, json!(mode)),
            (property::MID_POINT, json!(true)),
            (property::MID_POINT_FEATURE_ID, Value::from(feature_id)),
            (property::MID_POINT_SEGMENT, json!(segment)),
        ]),
    )
}

#[derive(Debug, Clone, Default)]
pub struct MidPoints {
    /// Ordered by segment index.
    ids: Vec<FeatureId>,
}

impl MidPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[FeatureId] {
        &self.ids
    }

    pub fn create(&mut self, ctx: &mut ModeContext<'_>, feature_id: &FeatureId, geometry: &Geometry, mode: &str) {
        self.delete(ctx);
        let entries = midpoint_positions(geometry, ctx.precision())
            .into_iter()
            .enumerate()
            .map(|(i, p)| midpoint_feature(p, feature_id, i, mode))
            .collect();
        self.ids = ctx.store.create(entries, Origin::Interaction);
    }

    pub fn delete(&mut self, ctx: &mut ModeContext<'_>) {
        if !self.ids.is_empty() {
            ctx.store.delete_if_present(&std::mem::take(&mut self.ids), Origin::Interaction);
        }
    }

    /// Geometry updates that move every midpoint onto `geometry`. Empty when
    /// the segment count no longer matches.
    pub fn updated(&self, geometry: &Geometry, precision: u32) -> Vec<(FeatureId, Geometry)> {
        let positions = midpoint_positions(geometry, precision);
        if positions.len() != self.ids.len() {
            return Vec::new();
        }
        self.ids
            .iter()
            .cloned()
            .zip(positions.into_iter().map(Geometry::Point))
            .collect()
    }

    /// Updates for the two midpoints either side of vertex `index`.
    pub fn updated_around(&self, index: usize, geometry: &Geometry, precision: u32) -> Vec<(FeatureId, Geometry)> {
        let positions = midpoint_positions(geometry, precision);
        if positions.len() != self.ids.len() || positions.is_empty() {
            return Vec::new();
        }
        let n = positions.len();
        let mut segments = Vec::with_capacity(2);
        if matches!(geometry, Geometry::Polygon(_)) {
            segments.push(index % n);
            segments.push((index + n - 1) % n);
        } else {
            if index < n {
                segments.push(index);
            }
            if index > 0 && index - 1 < n {
                segments.push(index - 1);
            }
        }
        segments.sort_unstable();
        segments.dedup();
        segments
            .into_iter()
            .map(|s| (self.ids[s].clone(), Geometry::Point(positions[s])))
            .collect()
    }

    /// Insert a vertex where midpoint `id` sits. The midpoint becomes the
    /// selection point of the new vertex and the two segments it split get
    /// fresh midpoints. Returns the new parent geometry, or `None` when the
    /// result fails `validate` and nothing was changed.
    pub fn insert(
        &mut self,
        ctx: &mut ModeContext<'_>,
        id: &FeatureId,
        selection_points: &mut SelectionPoints,
        validate: impl Fn(&Feature, &ValidationContext<'_>) -> Validation,
    ) -> DrawResult<Option<Geometry>> {
        let Some(segment) = self.ids.iter().position(|m| m == id) else {
            return Ok(None);
        };
        let midpoint = ctx.store.copy(id)?;
        let Geometry::Point(position) = midpoint.geometry else {
            return Ok(None);
        };
        let Some(parent_id) = midpoint
            .properties
            .get(property::MID_POINT_FEATURE_ID)
            .and_then(FeatureId::from_value)
        else {
            return Ok(None);
        };
        let mut parent = ctx.store.copy(&parent_id)?;
        let mut positions = parent.geometry.editable_positions();
        positions.insert(segment + 1, position);
        parent.geometry = parent.geometry.with_editable_positions(positions);

        let verdict = validate(&parent, &ctx.validation_context(UpdateType::Commit));
        if !verdict.valid {
            log::debug!("midpoint insert rejected: {:?}", verdict.reason);
            return Ok(None);
        }
        ctx.store
            .update_geometry(vec![(parent_id.clone(), parent.geometry.clone())], Origin::Interaction)?;

        self.ids.remove(segment);
        selection_points.adopt(ctx, id.clone(), segment + 1, &parent_id)?;

        let mode = parent.mode().unwrap_or_default().to_string();
        let split = midpoint_positions(&parent.geometry, ctx.precision());
        let fresh: Vec<NewFeature> = [segment, segment + 1]
            .into_iter()
            .filter_map(|s| split.get(s).map(|p| midpoint_feature(*p, &parent_id, s, &mode)))
            .collect();
        let fresh_ids = ctx.store.create(fresh, Origin::Interaction);
        for (offset, fresh_id) in fresh_ids.into_iter().enumerate() {
            self.ids.insert(segment + offset, fresh_id);
        }

        let reindex: Vec<(FeatureId, &str, Option<Value>)> = self
            .ids
            .iter()
            .enumerate()
            .skip(segment + 2)
            .map(|(i, m)| (m.clone(), property::MID_POINT_SEGMENT, Some(json!(i))))
            .collect();
        ctx.store.update_property(reindex, Origin::Interaction)?;
        Ok(Some(parent.geometry))
    }

    /// Forget the ids without touching the store.
    pub fn reset(&mut self) {
        self.ids.clear();
    }
}
