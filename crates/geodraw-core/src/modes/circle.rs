//! Geodesic circles: click the center, move to size, click to finish.

use super::{
    begin_drawing, complete_drawing, drawing_properties, merge_options, validate_owned, write_validated, DrawMode,
    KeyEvents, ModeBase, ModeContext,
};
use crate::common::{property, Cursor, DrawKeyboardEvent, DrawPointerEvent, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::geometry::{circle_polygon, haversine_distance_km, limit_position_precision};
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, AreaLimits, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Vertices of the ring approximating a circle.
const CIRCLE_STEPS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CircleOptions {
    pub key_events: KeyEvents,
    pub cursor: Cursor,
    /// Radius of the circle right after the first click.
    pub starting_radius_kilometers: f64,
    /// Geodesic area bounds in square meters.
    pub area_limits: AreaLimits,
    pub styles: StyleOptions,
}

impl Default for CircleOptions {
    fn default() -> Self {
        Self {
            key_events: KeyEvents::default(),
            cursor: Cursor::Crosshair,
            starting_radius_kilometers: 0.00001,
            area_limits: AreaLimits::default(),
            styles: StyleOptions::default(),
        }
    }
}

pub struct CircleMode {
    base: ModeBase,
    options: CircleOptions,
    validation: Option<Validator>,
    current_id: Option<FeatureId>,
    center: Option<Position>,
}

impl Default for CircleMode {
    fn default() -> Self {
        Self::new(CircleOptions::default())
    }
}

impl CircleMode {
    pub fn new(options: CircleOptions) -> Self {
        Self {
            base: ModeBase::new("circle"),
            options,
            validation: None,
            current_id: None,
            center: None,
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

    fn ring(ctx: &ModeContext<'_>, center: Position, radius_km: f64) -> Geometry {
        let precision = ctx.precision();
        let rings = circle_polygon(center, radius_km, CIRCLE_STEPS)
            .into_iter()
            .map(|ring| ring.into_iter().map(|p| limit_position_precision(p, precision)).collect())
            .collect();
        Geometry::Polygon(rings)
    }

    fn resize(&mut self, ctx: &mut ModeContext<'_>, event: &DrawPointerEvent, update_type: UpdateType) -> DrawResult<bool> {
        let (Some(id), Some(center)) = (self.current_id.clone(), self.center) else {
            return Ok(false);
        };
        let radius = haversine_distance_km(center, event.position());
        if write_validated(&*self, ctx, &id, Self::ring(ctx, center, radius), update_type)? {
            ctx.store.update_property(
                vec![(id, property::RADIUS_KILOMETERS, Some(json!(radius)))],
                Origin::Interaction,
            )?;
            return Ok(true);
        }
        Ok(false)
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
        self.center = None;
        self.base.settle();
        complete_drawing(ctx, id, self.base.name())
    }
}

impl DrawMode for CircleMode {
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
        self.center = None;
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        if self.current_id.is_some() {
            self.resize(ctx, event, UpdateType::Commit)?;
            return self.close(ctx);
        }
        let center = ctx.limit(event.position());
        let radius = self.options.starting_radius_kilometers;
        let mut props = drawing_properties(self.name());
        props.insert(property::RADIUS_KILOMETERS.into(), json!(radius));
        self.current_id = begin_drawing(ctx, Self::ring(ctx, center, radius), props)?;
        self.center = Some(center);
        self.base.set_drawing()
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.base.pointer_moved(&*ctx.adapter, event) {
            return Ok(());
        }
        self.resize(ctx, event, UpdateType::Provisional)?;
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
    use crate::store::GeoJsonStore;
    use std::collections::HashMap;

    #[test]
    fn test_circle_radius_follows_pointer() {
        let mut mode = CircleMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let center = adapter.pointer_event(0.0, 0.0);
        let edge = adapter.pointer_event(0.1, 0.0);
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();

        mode.on_click(&center, &mut ctx).unwrap();
        mode.on_mouse_move(&edge, &mut ctx).unwrap();
        mode.on_click(&edge, &mut ctx).unwrap();
        assert!(mode.drawing_feature_id().is_none());

        let circle = &ctx.store.copy_all()[0];
        let Geometry::Polygon(rings) = &circle.geometry else {
            unreachable!()
        };
        assert_eq!(rings[0].len(), CIRCLE_STEPS + 1);
        let radius = circle.properties[property::RADIUS_KILOMETERS].as_f64().unwrap();
        // 0.1 degrees of longitude at the equator
        assert!((radius - 11.12).abs() < 0.01);
        assert!(!circle.flag(property::CURRENTLY_DRAWING));
    }
}
