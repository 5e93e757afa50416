//! Click-by-click line drawing.

use super::editable::EditableDrag;
use super::{
    default_pointer_distance, drawing_properties, merge_options, validate_owned, DrawMode, DrawingCursors,
    KeyEvents, ModeBase, ModeContext,
};
use crate::behaviors::{coordinate_point, snap, ClosingPoints, CustomSnap, SnappingOptions, SnappingPoint};
use crate::common::{
    property, DrawKeyboardEvent, DrawPointerEvent, FinishAction, ModeType, MouseButton, UpdateType,
};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::store::{NewFeature, Origin};
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LineStringOptions {
    pub pointer_distance: f64,
    pub snapping: SnappingOptions,
    pub key_events: KeyEvents,
    pub cursors: DrawingCursors,
    pub editable: bool,
    pub show_coordinate_points: bool,
    pub styles: StyleOptions,
}

impl Default for LineStringOptions {
    fn default() -> Self {
        Self {
            pointer_distance: default_pointer_distance(),
            snapping: SnappingOptions::default(),
            key_events: KeyEvents::default(),
            cursors: DrawingCursors::default(),
            editable: false,
            show_coordinate_points: false,
            styles: StyleOptions::default(),
        }
    }
}

pub struct LineStringMode {
    base: ModeBase,
    options: LineStringOptions,
    validation: Option<Validator>,
    custom_snap: Option<CustomSnap>,
    current_id: Option<FeatureId>,
    /// Sits on the last committed vertex; clicking it finishes the line.
    closing_point: ClosingPoints,
    snapping_point: SnappingPoint,
    editable: EditableDrag,
}

impl Default for LineStringMode {
    fn default() -> Self {
        Self::new(LineStringOptions::default())
    }
}

impl LineStringMode {
    pub fn new(options: LineStringOptions) -> Self {
        Self {
            base: ModeBase::new("linestring"),
            closing_point: ClosingPoints::new(options.pointer_distance),
            editable: EditableDrag::new(options.pointer_distance),
            options,
            validation: None,
            custom_snap: None,
            current_id: None,
            snapping_point: SnappingPoint::new(),
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

    pub fn with_custom_snapping(mut self, custom: CustomSnap) -> Self {
        self.options.snapping.to_custom = true;
        self.custom_snap = Some(custom);
        self
    }

    fn snapped(&self, ctx: &ModeContext<'_>, event: &DrawPointerEvent, exclude: Option<&FeatureId>) -> Option<Position> {
        if !self.options.snapping.is_enabled() {
            return None;
        }
        snap(
            &self.options.snapping,
            self.custom_snap.as_ref(),
            &*ctx.store,
            &*ctx.adapter,
            event,
            self.options.pointer_distance,
            self.name(),
            exclude,
        )
    }

    fn coordinates(ctx: &ModeContext<'_>, id: &FeatureId) -> DrawResult<Vec<Position>> {
        match ctx.store.get_geometry_copy(id)? {
            Geometry::LineString(coords) => Ok(coords),
            _ => Ok(Vec::new()),
        }
    }

    fn write(&self, ctx: &mut ModeContext<'_>, id: &FeatureId, coords: Vec<Position>, update_type: UpdateType) -> DrawResult<bool> {
        let mut feature = ctx.store.copy(id)?;
        feature.geometry = Geometry::LineString(coords);
        let verdict = self.validate_feature(&feature, &ctx.validation_context(update_type));
        if !verdict.valid {
            log::debug!("line {id} rejected: {:?}", verdict.reason);
            return Ok(false);
        }
        ctx.store
            .update_geometry(vec![(id.clone(), feature.geometry)], Origin::Interaction)?;
        Ok(true)
    }

    fn finish_line(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        let mut coords = Self::coordinates(ctx, &id)?;
        // The trailing coordinate follows the pointer
        coords.pop();
        if coords.len() < 2 {
            return Ok(());
        }
        if !self.write(ctx, &id, coords, UpdateType::Finish)? {
            return Ok(());
        }
        ctx.store
            .update_property(vec![(id.clone(), property::CURRENTLY_DRAWING, None)], Origin::Interaction)?;
        self.closing_point.delete(ctx);
        self.snapping_point.hide(ctx);
        if self.options.show_coordinate_points {
            coordinate_point::create_or_update(ctx, &id)?;
        }

        self.current_id = None;
        self.base.settle();
        ctx.adapter.set_double_click_to_zoom(true);
        ctx.set_cursor(self.options.cursors.start);
        ctx.finish(id, self.base.name(), FinishAction::Draw);
        Ok(())
    }
}

impl DrawMode for LineStringMode {
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
        self.snapping_point.hide(ctx);
        self.editable.stop();
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        let current = self.current_id.clone();
        let position = ctx.limit(self.snapped(ctx, event, current.as_ref()).unwrap_or(event.position()));

        let Some(id) = current else {
            let entry = NewFeature::new(
                Geometry::LineString(vec![position, position]),
                drawing_properties(self.name()),
            );
            self.current_id = ctx.store.create(vec![entry], Origin::Interaction).into_iter().next();
            self.base.set_drawing()?;
            ctx.adapter.set_double_click_to_zoom(false);
            return Ok(());
        };

        if self.closing_point.hit_test(ctx, event).is_closing {
            return self.finish_line(ctx);
        }
        let mut coords = Self::coordinates(ctx, &id)?;
        coords.pop();
        coords.extend([position, position]);
        if self.write(ctx, &id, coords, UpdateType::Commit)? {
            if self.closing_point.is_empty() {
                self.closing_point.create(ctx, &[position], self.base.name());
            } else {
                self.closing_point.update(ctx, &[position])?;
            }
        }
        Ok(())
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.base.pointer_moved(&*ctx.adapter, event) {
            return Ok(());
        }
        let current = self.current_id.clone();
        let snapped = self.snapped(ctx, event, current.as_ref());
        match snapped {
            Some(position) => self.snapping_point.show(ctx, position, self.base.name())?,
            None => self.snapping_point.hide(ctx),
        }
        let Some(id) = current else {
            ctx.set_cursor(self.options.cursors.start);
            return Ok(());
        };

        let closing = self.closing_point.hit_test(ctx, event).is_closing;
        ctx.set_cursor(if closing {
            self.options.cursors.close
        } else {
            self.options.cursors.start
        });
        let mut coords = Self::coordinates(ctx, &id)?;
        if let Some(last) = coords.last_mut() {
            *last = ctx.limit(snapped.unwrap_or(event.position()));
        }
        self.write(ctx, &id, coords, UpdateType::Provisional)?;
        Ok(())
    }

    fn on_key_up(&mut self, event: &DrawKeyboardEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.matches(&self.options.key_events.cancel) {
            self.cleanup(ctx)
        } else if event.matches(&self.options.key_events.finish) {
            self.finish_line(ctx)
        } else {
            Ok(())
        }
    }

    fn on_drag_start(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.options.editable || self.current_id.is_some() {
            return Ok(());
        }
        if self.editable.start(ctx, event, self.base.name()) {
            ctx.set_cursor(self.options.cursors.drag_start);
            ctx.adapter.set_draggability(false);
        }
        Ok(())
    }

    fn on_drag(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.editable.feature_id().cloned() else {
            return Ok(());
        };
        let target = self.snapped(ctx, event, Some(&id)).unwrap_or(event.position());
        self.editable
            .drag(ctx, target, &|f: &Feature, v: &ValidationContext<'_>| self.validate_feature(f, v))?;
        Ok(())
    }

    fn on_drag_end(&mut self, _event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if let Some(id) = self.editable.stop() {
            ctx.set_cursor(self.options.cursors.drag_end);
            ctx.adapter.set_draggability(true);
            ctx.finish(id, self.base.name(), FinishAction::DragCoordinate);
        }
        Ok(())
    }

    fn style_feature(&self, feature: &Feature) -> FeatureStyle {
        self.options.styles.resolve(feature)
    }

    fn validate_feature(&self, feature: &Feature, ctx: &ValidationContext<'_>) -> Validation {
        let builtin = validate_owned(feature, self.name(), GeometryType::LineString, ctx);
        compose(builtin, self.validation.as_ref(), feature, ctx)
    }

    fn update_options(&mut self, partial: &Value) -> DrawResult<()> {
        let options: LineStringOptions = merge_options(self.name(), &self.options, partial)?;
        self.closing_point.set_pointer_distance(options.pointer_distance);
        self.editable.set_pointer_distance(options.pointer_distance);
        self.options = options;
        Ok(())
    }

    fn options(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }

    fn after_feature_added(&mut self, feature: &Feature, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.options.show_coordinate_points {
            coordinate_point::create_or_update(ctx, &feature.id)?;
        }
        Ok(())
    }

    fn after_feature_updated(&mut self, feature: &Feature, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.after_feature_added(feature, ctx)
    }

    fn drawing_feature_id(&self) -> Option<&FeatureId> {
        self.current_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::events::DrawEvent;
    use crate::feature::properties;
    use crate::store::GeoJsonStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn run(
        mode: &mut LineStringMode,
        store: &mut GeoJsonStore,
        adapter: &mut HeadlessAdapter,
        f: impl FnOnce(&mut LineStringMode, &mut ModeContext<'_>) -> DrawResult<()>,
    ) -> Vec<DrawEvent> {
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(store, adapter, &modes, &mut events);
        f(mode, &mut ctx).unwrap();
        ctx.flush_store_changes();
        events
    }

    fn click(mode: &mut LineStringMode, store: &mut GeoJsonStore, adapter: &mut HeadlessAdapter, lng: f64, lat: f64) -> Vec<DrawEvent> {
        let event = adapter.pointer_event(lng, lat);
        run(mode, store, adapter, |m, ctx| {
            m.on_mouse_move(&event, ctx)?;
            m.on_click(&event, ctx)
        })
    }

    #[test]
    fn test_click_last_point_finishes() {
        let mut mode = LineStringMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        mode.register().unwrap();
        run(&mut mode, &mut store, &mut adapter, |m, ctx| m.start(ctx));

        click(&mut mode, &mut store, &mut adapter, 0.0, 0.0);
        click(&mut mode, &mut store, &mut adapter, 0.1, 0.0);
        click(&mut mode, &mut store, &mut adapter, 0.1, 0.1);
        let events = click(&mut mode, &mut store, &mut adapter, 0.1, 0.1);
        assert!(events.iter().any(|e| matches!(e, DrawEvent::Finish { .. })));

        let lines = store.copy_all_where(|f| matches!(f.geometry, Geometry::LineString(_)));
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].geometry,
            Geometry::LineString(vec![[0.0, 0.0], [0.1, 0.0], [0.1, 0.1]])
        );
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_snaps_to_existing_line_vertex() {
        let options = LineStringOptions {
            snapping: SnappingOptions {
                to_coordinate: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut mode = LineStringMode::new(options);
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        store.create(
            vec![NewFeature::new(
                Geometry::LineString(vec![[0.0, 0.0], [0.2, 0.0]]),
                properties([(property::MODE, json!("linestring"))]),
            )],
            Origin::Api,
        );
        mode.register().unwrap();
        run(&mut mode, &mut store, &mut adapter, |m, ctx| m.start(ctx));

        click(&mut mode, &mut store, &mut adapter, 0.003, 0.002);
        let drawn = mode.drawing_feature_id().cloned().unwrap();
        let Geometry::LineString(coords) = store.get_geometry_copy(&drawn).unwrap() else {
            unreachable!()
        };
        assert_eq!(coords[0], [0.0, 0.0]);
    }

    #[test]
    fn test_escape_leaves_nothing_behind() {
        let mut mode = LineStringMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        mode.register().unwrap();
        run(&mut mode, &mut store, &mut adapter, |m, ctx| m.start(ctx));
        click(&mut mode, &mut store, &mut adapter, 0.0, 0.0);
        click(&mut mode, &mut store, &mut adapter, 0.1, 0.0);
        run(&mut mode, &mut store, &mut adapter, |m, ctx| {
            m.on_key_up(&DrawKeyboardEvent::new("Escape"), ctx)
        });
        assert_eq!(store.size(), 0);
        assert!(adapter.double_click_to_zoom());
    }
}
