//! Types shared by modes, behaviors and the orchestrator.

use crate::feature::Position;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property keys used for ownership and guidance metadata.
///
/// Any feature that is persisted or exchanged must use exactly these keys.
pub mod property {
    pub const MODE: &str = "mode";
    pub const SELECTED: &str = "selected";
    pub const MID_POINT: &str = "midPoint";
    pub const SELECTION_POINT: &str = "selectionPoint";
    pub const COORDINATE_POINT: &str = "coordinatePoint";
    pub const COORDINATE_POINT_IDS: &str = "coordinatePointIds";
    pub const CLOSING_POINT: &str = "closingPoint";
    pub const CURRENTLY_DRAWING: &str = "currentlyDrawing";
    pub const SNAPPING_POINT: &str = "snappingPoint";

    /// Parent feature of a midpoint, selection point or coordinate point.
    pub const MID_POINT_FEATURE_ID: &str = "midPointFeatureId";
    pub const MID_POINT_SEGMENT: &str = "midPointSegment";
    pub const SELECTION_POINT_FEATURE_ID: &str = "selectionPointFeatureId";
    pub const COORDINATE_POINT_FEATURE_ID: &str = "coordinatePointFeatureId";
    pub const INDEX: &str = "index";

    pub const RADIUS_KILOMETERS: &str = "radiusKilometers";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Category of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeType {
    Drawing,
    Select,
    Static,
    Render,
}

/// How final a geometry change is, so validators can skip expensive checks
/// on intermediate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Provisional,
    Commit,
    Finish,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    Neither,
}

/// A pointer event already normalized by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawPointerEvent {
    pub lng: f64,
    pub lat: f64,
    /// Position relative to the map container, in pixels.
    pub container_x: f64,
    pub container_y: f64,
    pub button: MouseButton,
    /// Keys held while the event fired.
    #[serde(default)]
    pub held_keys: Vec<String>,
}

impl DrawPointerEvent {
    pub fn new(lng: f64, lat: f64, container_x: f64, container_y: f64) -> Self {
        Self {
            lng,
            lat,
            container_x,
            container_y,
            button: MouseButton::Left,
            held_keys: Vec::new(),
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_held_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.held_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn position(&self) -> Position {
        [self.lng, self.lat]
    }

    /// Container position as a pixel point.
    pub fn point(&self) -> Point {
        Point::new(self.container_x, self.container_y)
    }

    /// Whether every key in `keys` is currently held. An empty set never matches.
    pub fn holds_all(&self, keys: &[String]) -> bool {
        !keys.is_empty() && keys.iter().all(|k| self.held_keys.contains(k))
    }
}

/// A keyboard event already normalized by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawKeyboardEvent {
    pub key: String,
    #[serde(default)]
    pub held_keys: Vec<String>,
}

impl DrawKeyboardEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            held_keys: Vec::new(),
        }
    }

    /// Whether the event matches an optional key binding.
    pub fn matches(&self, binding: &Option<String>) -> bool {
        binding.as_deref() == Some(self.key.as_str())
    }
}

/// Cursor styles a mode may ask the adapter to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    #[default]
    Unset,
    Crosshair,
    Pointer,
    Move,
    Grab,
    Grabbing,
    Wait,
}

/// The interaction that produced a `finish` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishAction {
    Draw,
    DragFeature,
    DragCoordinate,
    DragCoordinateResize,
    InsertMidpoint,
    DeleteCoordinate,
    Rotate,
    Scale,
}

impl fmt::Display for FinishAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinishAction::Draw => "draw",
            FinishAction::DragFeature => "dragFeature",
            FinishAction::DragCoordinate => "dragCoordinate",
            FinishAction::DragCoordinateResize => "dragCoordinateResize",
            FinishAction::InsertMidpoint => "insertMidpoint",
            FinishAction::DeleteCoordinate => "deleteCoordinate",
            FinishAction::Rotate => "rotate",
            FinishAction::Scale => "scale",
        };
        f.write_str(name)
    }
}

/// Context attached to a `finish` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishContext {
    pub mode: String,
    pub action: FinishAction,
}
