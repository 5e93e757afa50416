//! Freehand polygons sampled from pointer movement.

use super::{
    begin_drawing, complete_drawing, default_pointer_distance, drawing_properties, merge_options, validate_owned,
    write_validated, DrawMode, DrawingCursors, KeyEvents, ModeBase, ModeContext,
};
use crate::behaviors::{pixel_distance_between, ClosingPoints};
use crate::common::{DrawKeyboardEvent, DrawPointerEvent, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::geometry::{ensure_right_hand_rule, limit_position_precision};
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, AreaLimits, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FreehandOptions {
    pub pointer_distance: f64,
    /// Minimum pixel spacing between sampled vertices.
    pub min_distance: f64,
    pub smoothing: bool,
    /// Close as soon as the pointer returns to the first vertex.
    pub auto_close: bool,
    pub key_events: KeyEvents,
    pub cursors: DrawingCursors,
    /// Geodesic area bounds in square meters.
    pub area_limits: AreaLimits,
    pub styles: StyleOptions,
}

impl Default for FreehandOptions {
    fn default() -> Self {
        Self {
            pointer_distance: default_pointer_distance(),
            min_distance: 20.0,
            smoothing: false,
            auto_close: false,
            key_events: KeyEvents::default(),
            cursors: DrawingCursors::default(),
            area_limits: AreaLimits::default(),
            styles: StyleOptions::default(),
        }
    }
}

pub struct FreehandMode {
    base: ModeBase,
    options: FreehandOptions,
    validation: Option<Validator>,
    current_id: Option<FeatureId>,
    /// Vertices sampled so far, first one included.
    samples: Vec<Position>,
    closing_point: ClosingPoints,
}

impl Default for FreehandMode {
    fn default() -> Self {
        Self::new(FreehandOptions::default())
    }
}

/// Closed ring through the samples. Fewer than three samples repeat
/// vertices so the ring stays well formed.
fn ring_through(samples: &[Position]) -> Vec<Position> {
    match samples {
        [] => Vec::new(),
        [first] => vec![*first; 4],
        [first, second] => vec![*first, *second, *second, *first],
        [first, ..] => {
            let mut ring = samples.to_vec();
            ring.push(*first);
            ring
        }
    }
}

/// Chaikin corner cutting, one pass, keeping the ring closed.
fn smooth_ring(ring: &[Position]) -> Vec<Position> {
    if ring.len() < 4 {
        return ring.to_vec();
    }
    let mut out = Vec::with_capacity(ring.len() * 2);
    for pair in ring.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push([0.75 * a[0] + 0.25 * b[0], 0.75 * a[1] + 0.25 * b[1]]);
        out.push([0.25 * a[0] + 0.75 * b[0], 0.25 * a[1] + 0.75 * b[1]]);
    }
    out.push(out[0]);
    out
}

impl FreehandMode {
    pub fn new(options: FreehandOptions) -> Self {
        Self {
            base: ModeBase::new("freehand"),
            closing_point: ClosingPoints::new(options.pointer_distance),
            options,
            validation: None,
            current_id: None,
            samples: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base = ModeBase::new(name);
        self
    }

    pub fn with_validation(mut self, validation: Validator) -> Self {
        self.validation = Some(validation);
        self
    }

    fn close(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        if self.samples.len() < 3 {
            return Ok(());
        }
        let mut ring = ring_through(&self.samples);
        if self.options.smoothing {
            let precision = ctx.precision();
            ring = smooth_ring(&ring)
                .into_iter()
                .map(|p| limit_position_precision(p, precision))
                .collect();
        }
        let mut geometry = Geometry::Polygon(vec![ring]);
        if let Some(corrected) = ensure_right_hand_rule(&geometry) {
            geometry = corrected;
        }
        if !write_validated(&*self, ctx, &id, geometry, UpdateType::Finish)? {
            return Ok(());
        }
        self.closing_point.delete(ctx);
        self.current_id = None;
        self.samples.clear();
        self.base.settle();
        ctx.set_cursor(self.options.cursors.start);
        complete_drawing(ctx, id, self.base.name())
    }
}

impl DrawMode for FreehandMode {
    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn mode_type(&self) -> ModeType {
        ModeType::Drawing
    }

    fn start(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.base.set_started()?;
        ctx.set_cursor(self.options.cursors.start);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if let Some(id) = self.current_id.take() {
            ctx.store.delete_if_present(&[id], Origin::Interaction);
            ctx.adapter.set_double_click_to_zoom(true);
        }
        self.closing_point.delete(ctx);
        self.samples.clear();
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        if self.current_id.is_some() {
            return self.close(ctx);
        }
        let position = ctx.limit(event.position());
        let geometry = Geometry::Polygon(vec![vec![position; 4]]);
        self.current_id = begin_drawing(ctx, geometry, drawing_properties(self.name()))?;
        self.closing_point.create(ctx, &[position], self.base.name());
        self.samples = vec![position];
        self.base.set_drawing()
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        let Some(&last) = self.samples.last() else {
            return Ok(());
        };
        let closing = self.closing_point.hit_test(ctx, event).is_closing;
        ctx.set_cursor(if closing {
            self.options.cursors.close
        } else {
            self.options.cursors.start
        });
        if self.options.auto_close && closing && self.samples.len() >= 3 {
            return self.close(ctx);
        }

        let position = ctx.limit(event.position());
        if pixel_distance_between(&*ctx.adapter, last, position) < self.options.min_distance {
            return Ok(());
        }
        self.samples.push(position);
        let ring = ring_through(&self.samples);
        if !write_validated(&*self, ctx, &id, Geometry::Polygon(vec![ring]), UpdateType::Provisional)? {
            self.samples.pop();
        }
        Ok(())
    }

    fn on_key_up(&mut self, event: &DrawKeyboardEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.matches(&self.options.key_events.cancel) {
            self.cleanup(ctx)
        } else if event.matches(&self.options.key_events.finish) {
            self.close(ctx)
        } else {
            Ok(())
        }
    }

    fn style_feature(&self, feature: &Feature) -> FeatureStyle {
        self.options.styles.resolve(feature)
    }

    fn validate_feature(&self, feature: &Feature, ctx: &ValidationContext<'_>) -> Validation {
        let builtin = validate_owned(feature, self.name(), GeometryType::Polygon, ctx)
            .and_then(|| self.options.area_limits.validate(feature, ctx.update_type));
        compose(builtin, self.validation.as_ref(), feature, ctx)
    }

    fn update_options(&mut self, partial: &Value) -> DrawResult<()> {
        let options: FreehandOptions = merge_options(self.name(), &self.options, partial)?;
        self.closing_point.set_pointer_distance(options.pointer_distance);
        self.options = options;
        Ok(())
    }

    fn options(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }

    fn drawing_feature_id(&self) -> Option<&FeatureId> {
        self.current_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::store::GeoJsonStore;
    use std::collections::HashMap;

    fn ring_len(store: &GeoJsonStore, id: &FeatureId) -> usize {
        match store.get_geometry_copy(id).unwrap() {
            Geometry::Polygon(rings) => rings[0].len(),
            _ => 0,
        }
    }

    #[test]
    fn test_samples_respect_min_distance_and_auto_close() {
        let mut mode = FreehandMode::new(FreehandOptions {
            auto_close: true,
            ..Default::default()
        });
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let start = adapter.pointer_event(0.0, 0.0);
        // ~1456 px per degree at the default viewport
        let too_close = adapter.pointer_event(0.005, 0.0);
        let path = [
            adapter.pointer_event(0.1, 0.0),
            adapter.pointer_event(0.1, 0.1),
            adapter.pointer_event(0.0, 0.1),
            adapter.pointer_event(0.001, 0.001),
        ];
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();

        mode.on_click(&start, &mut ctx).unwrap();
        let id = mode.drawing_feature_id().cloned().unwrap();
        mode.on_mouse_move(&too_close, &mut ctx).unwrap();
        assert_eq!(ring_len(ctx.store, &id), 4);
        assert_eq!(
            ctx.store.get_geometry_copy(&id).unwrap(),
            Geometry::Polygon(vec![vec![[0.0, 0.0]; 4]])
        );

        for event in &path {
            mode.on_mouse_move(event, &mut ctx).unwrap();
        }
        assert!(mode.drawing_feature_id().is_none(), "closed on returning to start");
        assert_eq!(ring_len(ctx.store, &id), 5);
        assert_eq!(ctx.store.size(), 1, "closing point removed");
    }

    #[test]
    fn test_smoothing_cuts_corners() {
        let square = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
        let smooth = smooth_ring(&square);
        assert_eq!(smooth.len(), 9);
        assert_eq!(smooth.first(), smooth.last());
        assert!(!smooth.contains(&[1.0, 0.0]));
    }
}
