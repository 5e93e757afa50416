//! Freehand lines sampled from pointer movement. A second click finishes.

use super::{
    begin_drawing, complete_drawing, drawing_properties, merge_options, validate_owned, write_validated, DrawMode,
    DrawingCursors, KeyEvents, ModeBase, ModeContext,
};
use crate::behaviors::pixel_distance_between;
use crate::common::{DrawKeyboardEvent, DrawPointerEvent, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FreehandLineStringOptions {
    pub min_distance: f64,
    pub key_events: KeyEvents,
    pub cursors: DrawingCursors,
    pub styles: StyleOptions,
}

impl Default for FreehandLineStringOptions {
    fn default() -> Self {
        Self {
            min_distance: 20.0,
            key_events: KeyEvents::default(),
            cursors: DrawingCursors::default(),
            styles: StyleOptions::default(),
        }
    }
}

pub struct FreehandLineStringMode {
    base: ModeBase,
    options: FreehandLineStringOptions,
    validation: Option<Validator>,
    current_id: Option<FeatureId>,
    samples: Vec<Position>,
}

impl Default for FreehandLineStringMode {
    fn default() -> Self {
        Self::new(FreehandLineStringOptions::default())
    }
}

fn line_through(samples: &[Position]) -> Geometry {
    match samples {
        [only] => Geometry::LineString(vec![*only, *only]),
        _ => Geometry::LineString(samples.to_vec()),
    }
}

impl FreehandLineStringMode {
    pub fn new(options: FreehandLineStringOptions) -> Self {
        Self {
            base: ModeBase::new("freehand-linestring"),
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

    fn finish_line(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        if self.samples.len() < 2 {
            return Ok(());
        }
        if !write_validated(&*self, ctx, &id, line_through(&self.samples), UpdateType::Finish)? {
            return Ok(());
        }
        self.current_id = None;
        self.samples.clear();
        self.base.settle();
        complete_drawing(ctx, id, self.base.name())
    }
}

impl DrawMode for FreehandLineStringMode {
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
        self.samples.clear();
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        if self.current_id.is_some() {
            return self.finish_line(ctx);
        }
        let position = ctx.limit(event.position());
        self.current_id = begin_drawing(ctx, line_through(&[position]), drawing_properties(self.name()))?;
        self.samples = vec![position];
        self.base.set_drawing()
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let (Some(id), Some(&last)) = (self.current_id.clone(), self.samples.last()) else {
            return Ok(());
        };
        let position = ctx.limit(event.position());
        if pixel_distance_between(&*ctx.adapter, last, position) < self.options.min_distance {
            return Ok(());
        }
        self.samples.push(position);
        if !write_validated(&*self, ctx, &id, line_through(&self.samples), UpdateType::Provisional)? {
            self.samples.pop();
        }
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

    fn style_feature(&self, feature: &Feature) -> FeatureStyle {
        self.options.styles.resolve(feature)
    }

    fn validate_feature(&self, feature: &Feature, ctx: &ValidationContext<'_>) -> Validation {
        let builtin = validate_owned(feature, self.name(), GeometryType::LineString, ctx);
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
