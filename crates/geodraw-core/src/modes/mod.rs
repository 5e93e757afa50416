//! Interaction modes.
//!
//! Every mode implements [`DrawMode`]. The closed set of modes is wrapped in
//! [`Mode`] so the orchestrator can own them by name without boxing.

mod angled_rectangle;
mod base;
mod circle;
mod editable;
mod freehand;
mod freehand_linestring;
mod linestring;
mod point;
mod polygon;
mod rectangle;
mod render;
mod sector;
mod select;
mod sensor;
mod static_mode;

pub use angled_rectangle::{AngledRectangleMode, AngledRectangleOptions};
pub use base::{
    merge_options, DrawingCursors, KeyEvents, ModeBase, ModeContext, ModeState, DEFAULT_POINTER_DISTANCE,
};
pub(crate) use base::default_pointer_distance;
pub use circle::{CircleMode, CircleOptions};
pub use freehand::{FreehandMode, FreehandOptions};
pub use freehand_linestring::{FreehandLineStringMode, FreehandLineStringOptions};
pub use linestring::{LineStringMode, LineStringOptions};
pub use point::{PointCursors, PointMode, PointOptions};
pub use polygon::{PolygonMode, PolygonOptions};
pub use rectangle::{RectangleMode, RectangleOptions};
pub use render::{RenderMode, RenderOptions};
pub use sector::{SectorMode, SectorOptions};
pub use select::{
    CoordinateFlags, FeatureFlags, ModeFlags, SelectCursors, SelectKeyEvents, SelectMode, SelectOptions,
};
pub use sensor::{SensorMode, SensorOptions};
pub use static_mode::{StaticMode, STATIC_MODE_NAME};

use crate::common::{property, DrawKeyboardEvent, DrawPointerEvent, FinishAction, ModeType, UpdateType};
use crate::error::DrawResult;
use crate::feature::{properties, Feature, FeatureId, Geometry, GeometryType, Properties};
use crate::store::{NewFeature, Origin};
use crate::styling::FeatureStyle;
use crate::validation::{
    validate_linestring, validate_non_self_intersecting, validate_point, validate_polygon, Validation,
    ValidationContext,
};
use serde_json::Value;
use std::fmt;

/// Common capability interface of all modes.
///
/// Event handlers default to doing nothing so a mode only implements the
/// events it reacts to.
pub trait DrawMode {
    fn base(&self) -> &ModeBase;

    fn base_mut(&mut self) -> &mut ModeBase;

    fn mode_type(&self) -> ModeType;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn state(&self) -> ModeState {
        self.base().state()
    }

    fn register(&mut self) -> DrawResult<()> {
        self.base_mut().set_registered()
    }

    fn start(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()>;

    /// Discard in-progress interaction and return to registered.
    fn stop(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.cleanup(ctx)?;
        self.base_mut().set_stopped()?;
        ctx.set_cursor(crate::common::Cursor::Unset);
        Ok(())
    }

    /// Remove any provisional and guidance features. Safe to call when idle.
    fn cleanup(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()>;

    fn on_click(&mut self, _event: &DrawPointerEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn on_mouse_move(&mut self, _event: &DrawPointerEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn on_key_down(&mut self, _event: &DrawKeyboardEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn on_key_up(&mut self, _event: &DrawKeyboardEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn on_drag_start(&mut self, _event: &DrawPointerEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn on_drag(&mut self, _event: &DrawPointerEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn on_drag_end(&mut self, _event: &DrawPointerEvent, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn style_feature(&self, feature: &Feature) -> FeatureStyle;

    /// Built-in checks for features this mode owns, composed with the user
    /// validator if one was set.
    fn validate_feature(&self, feature: &Feature, ctx: &ValidationContext<'_>) -> Validation;

    /// Merge a partial JSON object into the mode's options.
    fn update_options(&mut self, partial: &Value) -> DrawResult<()>;

    /// Current options as JSON.
    fn options(&self) -> Value;

    /// Called after a feature owned by this mode was added through the API.
    fn after_feature_added(&mut self, _feature: &Feature, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    /// Called after the geometry of a feature owned by this mode was replaced
    /// through the API.
    fn after_feature_updated(&mut self, _feature: &Feature, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    /// Id of the feature currently being drawn, if any.
    fn drawing_feature_id(&self) -> Option<&FeatureId> {
        None
    }
}

/// Ownership and shape checks shared by every drawing mode.
pub(crate) fn validate_owned(
    feature: &Feature,
    mode: &str,
    expected: GeometryType,
    ctx: &ValidationContext<'_>,
) -> Validation {
    if feature.mode() != Some(mode) {
        return Validation::invalid(format!("Feature is not owned by mode '{mode}'"));
    }
    let shape = match expected {
        GeometryType::Point => validate_point(feature, ctx.coordinate_precision),
        GeometryType::LineString => validate_linestring(feature, ctx.coordinate_precision),
        GeometryType::Polygon => validate_polygon(feature, ctx.coordinate_precision),
    };
    shape.and_then(|| {
        // Self-intersection is only worth checking once a change settles
        if expected == GeometryType::Polygon && ctx.update_type != UpdateType::Provisional {
            validate_non_self_intersecting(feature)
        } else {
            Validation::valid()
        }
    })
}

/// Properties for a feature a drawing mode has just started.
pub(crate) fn drawing_properties(mode: &str) -> Properties {
    properties([
        (property::MODE, Value::from(mode)),
        (property::CURRENTLY_DRAWING, Value::Bool(true)),
    ])
}

/// Create the provisional feature a drawing mode works on.
pub(crate) fn begin_drawing(
    ctx: &mut ModeContext<'_>,
    geometry: Geometry,
    props: Properties,
) -> DrawResult<Option<FeatureId>> {
    let id = ctx
        .store
        .create(vec![NewFeature::new(geometry, props)], Origin::Interaction)
        .into_iter()
        .next();
    ctx.adapter.set_double_click_to_zoom(false);
    Ok(id)
}

/// Validate `geometry` as the new geometry of `id` and write it only if it
/// passes. Returns whether it was written.
pub(crate) fn write_validated(
    mode: &dyn DrawMode,
    ctx: &mut ModeContext<'_>,
    id: &FeatureId,
    geometry: Geometry,
    update_type: UpdateType,
) -> DrawResult<bool> {
    let mut feature = ctx.store.copy(id)?;
    feature.geometry = geometry;
    let verdict = mode.validate_feature(&feature, &ctx.validation_context(update_type));
    if !verdict.valid {
        log::debug!("{} rejected change to {id}: {:?}", mode.name(), verdict.reason);
        return Ok(false);
    }
    ctx.store
        .update_geometry(vec![(id.clone(), feature.geometry)], Origin::Interaction)?;
    Ok(true)
}

/// Turn the provisional feature into a finished one and announce it.
pub(crate) fn complete_drawing(ctx: &mut ModeContext<'_>, id: FeatureId, mode: &str) -> DrawResult<()> {
    ctx.store
        .update_property(vec![(id.clone(), property::CURRENTLY_DRAWING, None)], Origin::Interaction)?;
    ctx.adapter.set_double_click_to_zoom(true);
    ctx.finish(id, mode, FinishAction::Draw);
    Ok(())
}

/// A registered mode.
pub enum Mode {
    Point(PointMode),
    LineString(LineStringMode),
    Polygon(PolygonMode),
    Circle(CircleMode),
    Rectangle(RectangleMode),
    AngledRectangle(AngledRectangleMode),
    Sector(SectorMode),
    Sensor(SensorMode),
    Freehand(FreehandMode),
    FreehandLineString(FreehandLineStringMode),
    Select(SelectMode),
    Render(RenderMode),
    Static(StaticMode),
}

impl Mode {
    pub fn as_mode(&self) -> &dyn DrawMode {
        match self {
            Mode::Point(m) => m,
            Mode::LineString(m) => m,
            Mode::Polygon(m) => m,
            Mode::Circle(m) => m,
            Mode::Rectangle(m) => m,
            Mode::AngledRectangle(m) => m,
            Mode::Sector(m) => m,
            Mode::Sensor(m) => m,
            Mode::Freehand(m) => m,
            Mode::FreehandLineString(m) => m,
            Mode::Select(m) => m,
            Mode::Render(m) => m,
            Mode::Static(m) => m,
        }
    }

    pub fn as_mode_mut(&mut self) -> &mut dyn DrawMode {
        match self {
            Mode::Point(m) => m,
            Mode::LineString(m) => m,
            Mode::Polygon(m) => m,
            Mode::Circle(m) => m,
            Mode::Rectangle(m) => m,
            Mode::AngledRectangle(m) => m,
            Mode::Sector(m) => m,
            Mode::Sensor(m) => m,
            Mode::Freehand(m) => m,
            Mode::FreehandLineString(m) => m,
            Mode::Select(m) => m,
            Mode::Render(m) => m,
            Mode::Static(m) => m,
        }
    }

    pub fn name(&self) -> &str {
        self.as_mode().name()
    }

    pub fn mode_type(&self) -> ModeType {
        self.as_mode().mode_type()
    }

    pub fn state(&self) -> ModeState {
        self.as_mode().state()
    }

    pub fn as_select(&self) -> Option<&SelectMode> {
        match self {
            Mode::Select(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut SelectMode> {
        match self {
            Mode::Select(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mode")
            .field("name", &self.name())
            .field("type", &self.mode_type())
            .field("state", &self.state())
            .finish()
    }
}

macro_rules! impl_from_mode {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Mode {
                fn from(mode: $ty) -> Self {
                    Mode::$variant(mode)
                }
            }
        )*
    };
}

impl_from_mode! {
    Point => PointMode,
    LineString => LineStringMode,
    Polygon => PolygonMode,
    Circle => CircleMode,
    Rectangle => RectangleMode,
    AngledRectangle => AngledRectangleMode,
    Sector => SectorMode,
    Sensor => SensorMode,
    Freehand => FreehandMode,
    FreehandLineString => FreehandLineStringMode,
    Select => SelectMode,
    Render => RenderMode,
    Static => StaticMode,
}
