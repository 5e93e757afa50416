//! Selection points: one guidance point per editable vertex of the selected
//! feature.

use crate::common::property;
use crate::error::DrawResult;
use crate::feature::{properties, FeatureId, Geometry, Position};
use crate::modes::ModeContext;
use crate::store::{NewFeature, Origin};
use serde_json::{json, Value};

/// Positions selection points sit on. Points have none.
pub fn selection_positions(geometry: &Geometry) -> Vec<Position> {
    match geometry {
        Geometry::Point(_) => Vec::new(),
        _ => geometry.editable_positions(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionPoints {
    /// Ordered by vertex index.
    ids: Vec<FeatureId>,
}

impl SelectionPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[FeatureId] {
        &self.ids
    }

    pub fn id_at(&self, index: usize) -> Option<&FeatureId> {
        self.ids.get(index)
    }

    pub fn index_of(&self, id: &FeatureId) -> Option<usize> {
        self.ids.iter().position(|i| i == id)
    }

    pub fn create(&mut self, ctx: &mut ModeContext<'_>, feature_id: &FeatureId, geometry: &Geometry, mode: &str) {
        self.delete(ctx);
        let entries = selection_positions(geometry)
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                NewFeature::new(
                    Geometry::Point(p),
                    properties([
                        (property::MODE, json!(mode)),
                        (property::SELECTION_POINT, json!(true)),
                        (property::SELECTION_POINT_FEATURE_ID, Value::from(feature_id)),
                        (property::INDEX, json!(i)),
                    ]),
                )
            })
            .collect();
        self.ids = ctx.store.create(entries, Origin::Interaction);
    }

    pub fn delete(&mut self, ctx: &mut ModeContext<'_>) {
        if !self.ids.is_empty() {
            ctx.store.delete_if_present(&std::mem::take(&mut self.ids), Origin::Interaction);
        }
    }

    /// Geometry updates that move every selection point onto `geometry`.
    /// Empty when the vertex count no longer matches.
    pub fn updated(&self, geometry: &Geometry) -> Vec<(FeatureId, Geometry)> {
        let positions = selection_positions(geometry);
        if positions.len() != self.ids.len() {
            return Vec::new();
        }
        self.ids
            .iter()
            .cloned()
            .zip(positions.into_iter().map(Geometry::Point))
            .collect()
    }

    /// Geometry update for the single point at `index`.
    pub fn updated_at(&self, index: usize, position: Position) -> Option<(FeatureId, Geometry)> {
        self.ids.get(index).map(|id| (id.clone(), Geometry::Point(position)))
    }

    /// Turn an existing guidance point into the selection point for a newly
    /// inserted vertex at `index`, shifting the indices of later points.
    pub fn adopt(&mut self, ctx: &mut ModeContext<'_>, id: FeatureId, index: usize, feature_id: &FeatureId) -> DrawResult<()> {
        let mut updates: Vec<(FeatureId, &str, Option<Value>)> = vec![
            (id.clone(), property::MID_POINT, None),
            (id.clone(), property::MID_POINT_FEATURE_ID, None),
            (id.clone(), property::MID_POINT_SEGMENT, None),
            (id.clone(), property::SELECTION_POINT, Some(json!(true))),
            (id.clone(), property::SELECTION_POINT_FEATURE_ID, Some(Value::from(feature_id))),
        ];
        let index = index.min(self.ids.len());
        self.ids.insert(index, id);
        for (i, point_id) in self.ids.iter().enumerate().skip(index) {
            updates.push((point_id.clone(), property::INDEX, Some(json!(i))));
        }
        ctx.store.update_property(updates, Origin::Interaction)
    }

    /// Drop the point at `index` after its vertex was deleted, reindexing the
    /// rest.
    pub fn remove_at(&mut self, ctx: &mut ModeContext<'_>, index: usize) -> DrawResult<()> {
        if index >= self.ids.len() {
            return Ok(());
        }
        let removed = self.ids.remove(index);
        ctx.store.delete_if_present(&[removed], Origin::Interaction);
        let updates: Vec<(FeatureId, &str, Option<Value>)> = self
            .ids
            .iter()
            .enumerate()
            .skip(index)
            .map(|(i, id)| (id.clone(), property::INDEX, Some(json!(i))))
            .collect();
        ctx.store.update_property(updates, Origin::Interaction)
    }

    /// Forget the ids without touching the store.
    pub fn reset(&mut self) {
        self.ids.clear();
    }
}
