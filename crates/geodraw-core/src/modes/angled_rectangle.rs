//! Rotated rectangles: two clicks set one side, a third sets the width.

use super::{
    begin_drawing, complete_drawing, drawing_properties, merge_options, validate_owned, write_validated, DrawMode,
    KeyEvents, ModeBase, ModeContext,
};
use crate::common::{Cursor, DrawKeyboardEvent, DrawPointerEvent, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::geometry::{
    ensure_right_hand_rule, limit_position_precision, lng_lat_to_web_mercator, web_mercator_to_lng_lat,
};
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, AreaLimits, Validation, ValidationContext, Validator};
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AngledRectangleOptions {
    pub key_events: KeyEvents,
    pub cursor: Cursor,
    /// Geodesic area bounds in square meters.
    pub area_limits: AreaLimits,
    pub styles: StyleOptions,
}

impl Default for AngledRectangleOptions {
    fn default() -> Self {
        Self {
            key_events: KeyEvents::default(),
            cursor: Cursor::Crosshair,
            area_limits: AreaLimits::default(),
            styles: StyleOptions::default(),
        }
    }
}

pub struct AngledRectangleMode {
    base: ModeBase,
    options: AngledRectangleOptions,
    validation: Option<Validator>,
    current_id: Option<FeatureId>,
    /// Committed corners, at most two.
    corners: Vec<Position>,
}

impl Default for AngledRectangleMode {
    fn default() -> Self {
        Self::new(AngledRectangleOptions::default())
    }
}

/// Rectangle with side `a`-`b`, extruded towards `c` perpendicular to that
/// side. Computed in Web Mercator so the corners look square on the map.
fn extrude(a: Position, b: Position, c: Position) -> Option<Geometry> {
    let pa = lng_lat_to_web_mercator(a);
    let pb = lng_lat_to_web_mercator(b);
    let side = pb - pa;
    if side.hypot() == 0.0 {
        return None;
    }
    let normal = Vec2::new(-side.y, side.x) / side.hypot();
    let offset = normal * (lng_lat_to_web_mercator(c) - pa).dot(normal);
    if offset.hypot() == 0.0 {
        return None;
    }
    let ring = vec![
        a,
        b,
        web_mercator_to_lng_lat(pb + offset),
        web_mercator_to_lng_lat(pa + offset),
        a,
    ];
    let geometry = Geometry::Polygon(vec![ring]);
    Some(ensure_right_hand_rule(&geometry).unwrap_or(geometry))
}

impl AngledRectangleMode {
    pub fn new(options: AngledRectangleOptions) -> Self {
        Self {
            base: ModeBase::new("angled-rectangle"),
            options,
            validation: None,
            current_id: None,
            corners: Vec::new(),
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

    fn shape(&self, ctx: &ModeContext<'_>, cursor: Position) -> Option<Geometry> {
        let precision = ctx.precision();
        let geometry = match self.corners.as_slice() {
            [a] => Geometry::Polygon(vec![vec![*a, cursor, cursor, *a]]),
            [a, b] => extrude(*a, *b, cursor)?,
            _ => return None,
        };
        Some(geometry.map_positions(|p| limit_position_precision(p, precision)))
    }

    fn close(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        if self.corners.len() < 2 {
            return Ok(());
        }
        let feature = ctx.store.copy(&id)?;
        if !self.validate_feature(&feature, &ctx.validation_context(UpdateType::Finish)).valid {
            return Ok(());
        }
        self.current_id = None;
        self.corners.clear();
        self.base.settle();
        complete_drawing(ctx, id, self.base.name())
    }
}

impl DrawMode for AngledRectangleMode {
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
        self.corners.clear();
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        let position = ctx.limit(event.position());
        let Some(id) = self.current_id.clone() else {
            let geometry = Geometry::Polygon(vec![vec![position; 4]]);
            self.current_id = begin_drawing(ctx, geometry, drawing_properties(self.name()))?;
            self.corners = vec![position];
            return self.base.set_drawing();
        };
        match self.corners.len() {
            1 => {
                if self.corners[0] != position {
                    self.corners.push(position);
                }
                Ok(())
            }
            _ => {
                let Some(shape) = self.shape(ctx, position) else {
                    return Ok(());
                };
                if write_validated(&*self, ctx, &id, shape, UpdateType::Commit)? {
                    self.close(ctx)?;
                }
                Ok(())
            }
        }
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.base.pointer_moved(&*ctx.adapter, event) {
            return Ok(());
        }
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        let cursor = ctx.limit(event.position());
        if let Some(shape) = self.shape(ctx, cursor) {
            write_validated(&*self, ctx, &id, shape, UpdateType::Provisional)?;
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
    fn test_extrude_is_perpendicular() {
        let Some(Geometry::Polygon(rings)) = extrude([0.0, 0.0], [1.0, 0.0], [0.5, 0.5]) else {
            panic!("expected a polygon");
        };
        let ring = &rings[0];
        assert_eq!(ring.len(), 5);
        assert!(ring_signed_area(ring) > 0.0);
        assert!(ring.iter().any(|p| (p[0] - 1.0).abs() < 1e-9 && (p[1] - 0.5).abs() < 1e-9));
        assert!(extrude([0.0, 0.0], [1.0, 0.0], [0.5, 0.0]).is_none());
    }

    #[test]
    fn test_three_clicks_finish() {
        let mut mode = AngledRectangleMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let clicks = [
            adapter.pointer_event(0.0, 0.0),
            adapter.pointer_event(0.1, 0.1),
            adapter.pointer_event(0.0, 0.2),
        ];
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        for click in &clicks {
            mode.on_mouse_move(click, &mut ctx).unwrap();
            mode.on_click(click, &mut ctx).unwrap();
        }
        assert!(mode.drawing_feature_id().is_none());
        let feature = &ctx.store.copy_all()[0];
        assert_eq!(feature.mode(), Some("angled-rectangle"));
        let Geometry::Polygon(rings) = &feature.geometry else {
            unreachable!()
        };
        assert_eq!(rings[0].len(), 5);
    }
}
