//! Axis-aligned rectangles from two opposite corners.

use super::{
    begin_drawing, complete_drawing, drawing_properties, merge_options, validate_owned, write_validated, DrawMode,
    KeyEvents, ModeBase, ModeContext,
};
use crate::common::{Cursor, DrawKeyboardEvent, DrawPointerEvent, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::geometry::ensure_right_hand_rule;
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, AreaLimits, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RectangleOptions {
    pub key_events: KeyEvents,
    pub cursor: Cursor,
    /// Geodesic area bounds in square meters.
    pub area_limits: AreaLimits,
    pub styles: StyleOptions,
}

impl Default for RectangleOptions {
    fn default() -> Self {
        Self {
            key_events: KeyEvents::default(),
            cursor: Cursor::Crosshair,
            area_limits: AreaLimits::default(),
            styles: StyleOptions::default(),
        }
    }
}

pub struct RectangleMode {
    base: ModeBase,
    options: RectangleOptions,
    validation: Option<Validator>,
    current_id: Option<FeatureId>,
    anchor: Option<Position>,
}

impl Default for RectangleMode {
    fn default() -> Self {
        Self::new(RectangleOptions::default())
    }
}

/// Counter-clockwise ring spanning two opposite corners.
fn rectangle(a: Position, b: Position) -> Geometry {
    let ring = vec![a, [b[0], a[1]], b, [a[0], b[1]], a];
    let geometry = Geometry::Polygon(vec![ring]);
    ensure_right_hand_rule(&geometry).unwrap_or(geometry)
}

impl RectangleMode {
    pub fn new(options: RectangleOptions) -> Self {
        Self {
            base: ModeBase::new("rectangle"),
            options,
            validation: None,
            current_id: None,
            anchor: None,
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

    fn stretch(&mut self, ctx: &mut ModeContext<'_>, event: &DrawPointerEvent, update_type: UpdateType) -> DrawResult<bool> {
        let (Some(id), Some(anchor)) = (self.current_id.clone(), self.anchor) else {
            return Ok(false);
        };
        let corner = ctx.limit(event.position());
        write_validated(&*self, ctx, &id, rectangle(anchor, corner), update_type)
    }

    fn close(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        let feature = ctx.store.copy(&id)?;
        if !self.validate_feature(&feature, &ctx.validation_context(UpdateType::Finish)).valid {
            return Ok(());
        }
        self.current_id = None;
        self.anchor = None;
        self.base.settle();
        complete_drawing(ctx, id, self.base.name())
    }
}

impl DrawMode for RectangleMode {
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
        ctx.set_cursor(self.options.cursor);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if let Some(id) = self.current_id.take() {
            ctx.store.delete_if_present(&[id], Origin::Interaction);
            ctx.adapter.set_double_click_to_zoom(true);
        }
        self.anchor = None;
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        if let Some(anchor) = self.anchor {
            let corner = ctx.limit(event.position());
            // A zero-width rectangle stays open
            if corner[0] == anchor[0] || corner[1] == anchor[1] {
                return Ok(());
            }
            if self.stretch(ctx, event, UpdateType::Commit)? {
                self.close(ctx)?;
            }
            return Ok(());
        }
        let anchor = ctx.limit(event.position());
        let geometry = Geometry::Polygon(vec![vec![anchor; 5]]);
        self.current_id = begin_drawing(ctx, geometry, drawing_properties(self.name()))?;
        self.anchor = Some(anchor);
        self.base.set_drawing()
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.base.pointer_moved(&*ctx.adapter, event) {
            return Ok(());
        }
        self.stretch(ctx, event, UpdateType::Provisional)?;
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
        self.options = merge_options(self.name(), &self.options, partial)?;
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
    use crate::geometry::ring_signed_area;
    use crate::store::GeoJsonStore;
    use std::collections::HashMap;

    #[test]
    fn test_rectangle_from_two_corners() {
        let mut mode = RectangleMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let a = adapter.pointer_event(0.0, 0.1);
        let b = adapter.pointer_event(0.2, 0.0);
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();

        mode.on_click(&a, &mut ctx).unwrap();
        // Second click on the anchor itself would be degenerate
        mode.on_click(&a, &mut ctx).unwrap();
        assert!(mode.drawing_feature_id().is_some());

        mode.on_mouse_move(&b, &mut ctx).unwrap();
        mode.on_click(&b, &mut ctx).unwrap();
        assert!(mode.drawing_feature_id().is_none());

        let Geometry::Polygon(rings) = &ctx.store.copy_all()[0].geometry else {
            unreachable!()
        };
        assert_eq!(rings[0].len(), 5);
        assert!(ring_signed_area(&rings[0]) > 0.0);
        assert!(rings[0].contains(&[0.2, 0.1]));
        assert!(rings[0].contains(&[0.0, 0.0]));
    }

    #[test]
    fn test_escape_discards_rectangle() {
        let mut mode = RectangleMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let a = adapter.pointer_event(0.0, 0.0);
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&a, &mut ctx).unwrap();
        mode.on_key_up(&DrawKeyboardEvent::new("Escape"), &mut ctx).unwrap();
        assert_eq!(ctx.store.size(), 0);
    }
}
