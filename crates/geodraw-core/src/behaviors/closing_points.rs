//! Closing point guidance features for polygon-family drawing.
//!
//! The first closing point sits on the first vertex of the ring; the second
//! on the most recently committed vertex. Clicking either finishes the
//! polygon.

use super::pointer::pixel_distance;
use crate::common::{property, DrawPointerEvent};
use crate::error::DrawResult;
use crate::feature::{properties, FeatureId, Geometry, Position};
use crate::modes::ModeContext;
use crate::store::{NewFeature, Origin};
use serde_json::json;

/// Result of testing the pointer against the closing points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosingHit {
    pub is_closing: bool,
    pub is_previous_closing: bool,
}

impl ClosingHit {
    pub fn any(&self) -> bool {
        self.is_closing || self.is_previous_closing
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClosingPoints {
    ids: Vec<FeatureId>,
    pointer_distance: f64,
}

impl ClosingPoints {
    pub fn new(pointer_distance: f64) -> Self {
        Self {
            ids: Vec::new(),
            pointer_distance,
        }
    }

    pub fn set_pointer_distance(&mut self, pointer_distance: f64) {
        self.pointer_distance = pointer_distance;
    }

    pub fn ids(&self) -> &[FeatureId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Create one closing point per position. Replaces any existing ones.
    pub fn create(&mut self, ctx: &mut ModeContext<'_>, positions: &[Position], mode: &str) {
        self.delete(ctx);
        let entries = positions
            .iter()
            .map(|p| {
                NewFeature::new(
                    Geometry::Point(*p),
                    properties([
                        (property::MODE, json!(mode)),
                        (property::CLOSING_POINT, json!(true)),
                    ]),
                )
            })
            .collect();
        self.ids = ctx.store.create(entries, Origin::Interaction);
    }

    /// Move the existing closing points.
    pub fn update(&mut self, ctx: &mut ModeContext<'_>, positions: &[Position]) -> DrawResult<()> {
        if self.ids.len() != positions.len() {
            return Ok(());
        }
        let updates = self
            .ids
            .iter()
            .zip(positions)
            .map(|(id, p)| (id.clone(), Geometry::Point(*p)))
            .collect();
        ctx.store.update_geometry(updates, Origin::Interaction)
    }

    pub fn delete(&mut self, ctx: &mut ModeContext<'_>) {
        if !self.ids.is_empty() {
            ctx.store.delete_if_present(&std::mem::take(&mut self.ids), Origin::Interaction);
        }
    }

    /// Whether the pointer is within `pointer_distance` pixels of a closing
    /// point.
    pub fn hit_test(&self, ctx: &ModeContext<'_>, event: &DrawPointerEvent) -> ClosingHit {
        let near = |id: Option<&FeatureId>| {
            id.and_then(|id| ctx.store.get(id))
                .and_then(|f| match f.geometry {
                    Geometry::Point(p) => Some(p),
                    _ => None,
                })
                .is_some_and(|p| pixel_distance(&*ctx.adapter, event, p) < self.pointer_distance)
        };
        ClosingHit {
            is_closing: near(self.ids.first()),
            is_previous_closing: self.ids.len() > 1 && near(self.ids.get(1)),
        }
    }
}
