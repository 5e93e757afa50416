//! One click, one point.

use super::editable::EditableDrag;
use super::{default_pointer_distance, merge_options, validate_owned, DrawMode, ModeBase, ModeContext};
use crate::behaviors::{snap, CustomSnap, SnappingOptions};
use crate::common::{property, Cursor, DrawPointerEvent, FinishAction, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{properties, Feature, FeatureId, Geometry, GeometryType};
use crate::store::{NewFeature, Origin};
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PointCursors {
    pub create: Cursor,
    pub drag_start: Cursor,
    pub drag_end: Cursor,
}

impl Default for PointCursors {
    fn default() -> Self {
        Self {
            create: Cursor::Crosshair,
            drag_start: Cursor::Grabbing,
            drag_end: Cursor::Crosshair,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PointOptions {
    pub pointer_distance: f64,
    pub snapping: SnappingOptions,
    pub cursors: PointCursors,
    pub editable: bool,
    pub styles: StyleOptions,
}

impl Default for PointOptions {
    fn default() -> Self {
        Self {
            pointer_distance: default_pointer_distance(),
            snapping: SnappingOptions::default(),
            cursors: PointCursors::default(),
            editable: false,
            styles: StyleOptions::default(),
        }
    }
}

pub struct PointMode {
    base: ModeBase,
    options: PointOptions,
    validation: Option<Validator>,
    custom_snap: Option<CustomSnap>,
    editable: EditableDrag,
}

impl Default for PointMode {
    fn default() -> Self {
        Self::new(PointOptions::default())
    }
}

impl PointMode {
    pub fn new(options: PointOptions) -> Self {
        Self {
            base: ModeBase::new("point"),
            editable: EditableDrag::new(options.pointer_distance),
            options,
            validation: None,
            custom_snap: None,
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

    fn target(&self, ctx: &ModeContext<'_>, event: &DrawPointerEvent, exclude: Option<&FeatureId>) -> [f64; 2] {
        let snapped = if self.options.snapping.is_enabled() {
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
        } else {
            None
        };
        ctx.limit(snapped.unwrap_or(event.position()))
    }
}

impl DrawMode for PointMode {
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
        ctx.set_cursor(self.options.cursors.create);
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.editable.stop();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        let position = self.target(ctx, event, None);
        let candidate = Feature::new(
            ctx.store.get_id(),
            Geometry::Point(position),
            properties([(property::MODE, json!(self.name()))]),
        );
        let verdict = self.validate_feature(&candidate, &ctx.validation_context(UpdateType::Finish));
        if !verdict.valid {
            log::debug!("point rejected: {:?}", verdict.reason);
            return Ok(());
        }
        let id = ctx
            .store
            .create(vec![NewFeature::new(candidate.geometry, candidate.properties)], Origin::Interaction)
            .into_iter()
            .next();
        if let Some(id) = id {
            ctx.finish(id, self.base.name(), FinishAction::Draw);
        }
        Ok(())
    }

    fn on_drag_start(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.options.editable && self.editable.start(ctx, event, self.base.name()) {
            ctx.set_cursor(self.options.cursors.drag_start);
            ctx.adapter.set_draggability(false);
        }
        Ok(())
    }

    fn on_drag(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.editable.feature_id().cloned() else {
            return Ok(());
        };
        let target = self.target(ctx, event, Some(&id));
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
        let builtin = validate_owned(feature, self.name(), GeometryType::Point, ctx);
        compose(builtin, self.validation.as_ref(), feature, ctx)
    }

    fn update_options(&mut self, partial: &Value) -> DrawResult<()> {
        let options: PointOptions = merge_options(self.name(), &self.options, partial)?;
        self.editable.set_pointer_distance(options.pointer_distance);
        self.options = options;
        Ok(())
    }

    fn options(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::events::DrawEvent;
    use crate::store::GeoJsonStore;
    use std::collections::HashMap;

    #[test]
    fn test_click_creates_finished_point() {
        let mut mode = PointMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let event = adapter.pointer_event(1.5, -2.25);
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&event, &mut ctx).unwrap();
        mode.on_click(&event.clone().with_button(MouseButton::Right), &mut ctx).unwrap();
        drop(ctx);

        assert_eq!(store.size(), 1);
        let point = &store.copy_all()[0];
        assert_eq!(point.geometry, Geometry::Point([1.5, -2.25]));
        assert!(matches!(events.last(), Some(DrawEvent::Finish { .. })));
    }

    #[test]
    fn test_editable_point_drags() {
        let mut mode = PointMode::new(PointOptions {
            editable: true,
            ..Default::default()
        });
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let ids = store.create(
            vec![NewFeature::new(
                Geometry::Point([0.0, 0.0]),
                properties([(property::MODE, json!("point"))]),
            )],
            Origin::Api,
        );
        let grab = adapter.pointer_event(0.0, 0.0);
        let drop_at = adapter.pointer_event(0.05, 0.05);
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_drag_start(&grab, &mut ctx).unwrap();
        mode.on_drag(&drop_at, &mut ctx).unwrap();
        mode.on_drag_end(&drop_at, &mut ctx).unwrap();
        assert_eq!(ctx.store.get_geometry_copy(&ids[0]).unwrap(), Geometry::Point([0.05, 0.05]));
    }
}
