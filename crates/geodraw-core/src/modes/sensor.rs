//! Annular sectors, the footprint of a directional sensor.
//!
//! Clicks set the center, the inner radius and start bearing, the end
//! bearing, and finally the outer radius.

use super::sector::sector_ring;
use super::{
    begin_drawing, complete_drawing, drawing_properties, merge_options, validate_owned, write_validated, DrawMode,
    KeyEvents, ModeBase, ModeContext,
};
use crate::common::{Cursor, DrawKeyboardEvent, DrawPointerEvent, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::geometry::{bearing, ensure_right_hand_rule, geodesic_arc, haversine_distance_km, limit_position_precision};
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, AreaLimits, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SensorOptions {
    pub key_events: KeyEvents,
    pub cursor: Cursor,
    pub arc_points: usize,
    /// Geodesic area bounds in square meters.
    pub area_limits: AreaLimits,
    pub styles: StyleOptions,
}

impl Default for SensorOptions {
    fn default() -> Self {
        Self {
            key_events: KeyEvents::default(),
            cursor: Cursor::Crosshair,
            arc_points: 64,
            area_limits: AreaLimits::default(),
            styles: StyleOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Inner,
    Sweep { inner_km: f64, start: f64 },
    Outer { inner_km: f64, start: f64, end: f64 },
}

pub struct SensorMode {
    base: ModeBase,
    options: SensorOptions,
    validation: Option<Validator>,
    current_id: Option<FeatureId>,
    center: Option<Position>,
    stage: Stage,
}

impl Default for SensorMode {
    fn default() -> Self {
        Self::new(SensorOptions::default())
    }
}

impl SensorMode {
    pub fn new(options: SensorOptions) -> Self {
        Self {
            base: ModeBase::new("sensor"),
            options,
            validation: None,
            current_id: None,
            center: None,
            stage: Stage::Inner,
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
        let center = self.center?;
        let arc_points = self.options.arc_points;
        let ring = match self.stage {
            Stage::Inner => vec![center, cursor, cursor, center],
            Stage::Sweep { inner_km, start } => {
                let end = bearing(center, cursor);
                if (end - start).rem_euclid(360.0) == 0.0 {
                    return None;
                }
                sector_ring(center, inner_km, start, end, arc_points)
            }
            Stage::Outer { inner_km, start, end } => {
                let outer_km = haversine_distance_km(center, cursor);
                if outer_km <= inner_km {
                    return None;
                }
                let mut ring = geodesic_arc(center, inner_km, start, end, arc_points);
                let mut outer = geodesic_arc(center, outer_km, start, end, arc_points);
                outer.reverse();
                ring.extend(outer);
                ring.push(ring[0]);
                ring
            }
        };
        let precision = ctx.precision();
        let geometry = Geometry::Polygon(vec![ring]).map_positions(|p| limit_position_precision(p, precision));
        Some(ensure_right_hand_rule(&geometry).unwrap_or(geometry))
    }

    fn close(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        if !matches!(self.stage, Stage::Outer { .. }) {
            return Ok(());
        }
        let feature = ctx.store.copy(&id)?;
        if !self.validate_feature(&feature, &ctx.validation_context(UpdateType::Finish)).valid {
            return Ok(());
        }
        self.reset();
        self.base.settle();
        complete_drawing(ctx, id, self.base.name())
    }

    fn reset(&mut self) {
        self.current_id = None;
        self.center = None;
        self.stage = Stage::Inner;
    }
}

impl DrawMode for SensorMode {
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
        self.reset();
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        let position = ctx.limit(event.position());
        let (Some(id), Some(center)) = (self.current_id.clone(), self.center) else {
            let geometry = Geometry::Polygon(vec![vec![position; 4]]);
            self.current_id = begin_drawing(ctx, geometry, drawing_properties(self.name()))?;
            self.center = Some(position);
            self.stage = Stage::Inner;
            return self.base.set_drawing();
        };
        match self.stage {
            Stage::Inner => {
                let inner_km = haversine_distance_km(center, position);
                if inner_km > 0.0 {
                    self.stage = Stage::Sweep {
                        inner_km,
                        start: bearing(center, position),
                    };
                }
            }
            Stage::Sweep { inner_km, start } => {
                let end = bearing(center, position);
                if (end - start).rem_euclid(360.0) != 0.0 {
                    self.stage = Stage::Outer { inner_km, start, end };
                }
            }
            Stage::Outer { .. } => {
                if let Some(shape) = self.shape(ctx, position) {
                    if write_validated(&*self, ctx, &id, shape, UpdateType::Commit)? {
                        self.close(ctx)?;
                    }
                }
            }
        }
        Ok(())
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
    use crate::geometry::point_in_polygon;
    use crate::store::GeoJsonStore;
    use std::collections::HashMap;

    #[test]
    fn test_four_clicks_draw_annular_sector() {
        let mut mode = SensorMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let clicks = [
            adapter.pointer_event(0.0, 0.0),
            adapter.pointer_event(0.0, 0.05),
            adapter.pointer_event(0.05, 0.0),
            adapter.pointer_event(0.1, 0.0),
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

        let Geometry::Polygon(rings) = &ctx.store.copy_all()[0].geometry else {
            unreachable!()
        };
        // Between the two radii, inside the sweep
        assert!(point_in_polygon([0.05, 0.05], rings));
        // Inside the inner radius
        assert!(!point_in_polygon([0.01, 0.01], rings));
    }

    #[test]
    fn test_outer_radius_must_exceed_inner() {
        let mut mode = SensorMode::default();
        let mut store = GeoJsonStore::default();
        let mut adapter = HeadlessAdapter::default();
        let clicks = [
            adapter.pointer_event(0.0, 0.0),
            adapter.pointer_event(0.0, 0.05),
            adapter.pointer_event(0.05, 0.0),
            adapter.pointer_event(0.01, 0.0),
        ];
        let modes = HashMap::new();
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        for click in &clicks {
            mode.on_click(click, &mut ctx).unwrap();
        }
        assert!(mode.drawing_feature_id().is_some());
    }
}
