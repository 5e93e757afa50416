//! Lifecycle, context and option plumbing shared by every mode.

use crate::adapter::DrawAdapter;
use crate::behaviors::PointerMovement;
use crate::common::DrawPointerEvent;
use crate::common::{Cursor, FinishAction, FinishContext, UpdateType};
use crate::error::{DrawError, DrawResult};
use crate::events::DrawEvent;
use crate::feature::{FeatureId, Position};
use crate::geometry::limit_position_precision;
use crate::modes::Mode;
use crate::store::GeoJsonStore;
use crate::validation::ValidationContext;
use kurbo::Point;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Lifecycle state of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeState {
    #[default]
    Unregistered,
    Registered,
    Started,
    Drawing,
    Selecting,
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeState::Unregistered => "unregistered",
            ModeState::Registered => "registered",
            ModeState::Started => "started",
            ModeState::Drawing => "drawing",
            ModeState::Selecting => "selecting",
        };
        f.write_str(name)
    }
}

/// Name, lifecycle state and pointer-move threshold common to all modes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeBase {
    name: String,
    state: ModeState,
    movement: PointerMovement,
}

impl ModeBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ModeState::Unregistered,
            movement: PointerMovement::default(),
        }
    }

    /// Whether a pointer move travelled far enough to be worth redrawing for.
    pub fn pointer_moved(&mut self, adapter: &dyn DrawAdapter, event: &DrawPointerEvent) -> bool {
        self.movement.accept(adapter, event)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    fn transition(&mut self, allowed: &[ModeState], to: ModeState) -> DrawResult<()> {
        if !allowed.contains(&self.state) {
            return Err(DrawError::InvalidModeState {
                mode: self.name.clone(),
                from: self.state,
                to,
            });
        }
        log::debug!("mode '{}': {} -> {}", self.name, self.state, to);
        self.state = to;
        self.movement.reset();
        Ok(())
    }

    pub fn set_registered(&mut self) -> DrawResult<()> {
        self.transition(&[ModeState::Unregistered], ModeState::Registered)
    }

    pub fn set_started(&mut self) -> DrawResult<()> {
        self.transition(
            &[
                ModeState::Registered,
                ModeState::Started,
                ModeState::Drawing,
                ModeState::Selecting,
            ],
            ModeState::Started,
        )
    }

    pub fn set_drawing(&mut self) -> DrawResult<()> {
        self.transition(&[ModeState::Started, ModeState::Drawing], ModeState::Drawing)
    }

    pub fn set_selecting(&mut self) -> DrawResult<()> {
        self.transition(&[ModeState::Started, ModeState::Selecting], ModeState::Selecting)
    }

    pub fn set_stopped(&mut self) -> DrawResult<()> {
        self.transition(
            &[
                ModeState::Registered,
                ModeState::Started,
                ModeState::Drawing,
                ModeState::Selecting,
            ],
            ModeState::Registered,
        )
    }

    /// Return to started after a finished or cancelled interaction.
    pub fn settle(&mut self) {
        if matches!(self.state, ModeState::Drawing | ModeState::Selecting) {
            self.state = ModeState::Started;
        }
        self.movement.reset();
    }
}

/// Everything a mode may touch while handling one call.
pub struct ModeContext<'a> {
    pub store: &'a mut GeoJsonStore,
    pub adapter: &'a mut dyn DrawAdapter,
    /// The other registered modes, keyed by name.
    pub modes: &'a HashMap<String, Mode>,
    events: &'a mut Vec<DrawEvent>,
}

impl<'a> ModeContext<'a> {
    pub fn new(
        store: &'a mut GeoJsonStore,
        adapter: &'a mut dyn DrawAdapter,
        modes: &'a HashMap<String, Mode>,
        events: &'a mut Vec<DrawEvent>,
    ) -> Self {
        Self {
            store,
            adapter,
            modes,
            events,
        }
    }

    /// Move journaled store changes into the event queue so they stay ordered
    /// with the events a mode emits.
    pub fn flush_store_changes(&mut self) {
        for change in self.store.take_changes() {
            self.events.push(DrawEvent::Change {
                ids: change.ids,
                kind: change.kind,
                origin: change.origin,
            });
        }
    }

    pub fn emit(&mut self, event: DrawEvent) {
        self.flush_store_changes();
        self.events.push(event);
    }

    pub fn finish(&mut self, id: FeatureId, mode: &str, action: FinishAction) {
        self.emit(DrawEvent::Finish {
            id,
            context: FinishContext {
                mode: mode.to_string(),
                action,
            },
        });
    }

    pub fn project(&self, lng: f64, lat: f64) -> Point {
        self.adapter.project(lng, lat)
    }

    pub fn project_position(&self, position: Position) -> Point {
        self.adapter.project(position[0], position[1])
    }

    pub fn unproject(&self, point: Point) -> Option<Position> {
        self.adapter.unproject(point.x, point.y)
    }

    pub fn precision(&self) -> u32 {
        self.adapter.coordinate_precision()
    }

    /// Round a position to the adapter's coordinate precision.
    pub fn limit(&self, position: Position) -> Position {
        limit_position_precision(position, self.precision())
    }

    pub fn validation_context(&self, update_type: UpdateType) -> ValidationContext<'_> {
        ValidationContext::new(&*self.adapter, update_type)
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.adapter.set_cursor(cursor);
    }
}

/// Key bindings shared by drawing modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyEvents {
    pub cancel: Option<String>,
    pub finish: Option<String>,
}

impl Default for KeyEvents {
    fn default() -> Self {
        Self {
            cancel: Some("Escape".into()),
            finish: Some("Enter".into()),
        }
    }
}

/// Cursors shown by drawing modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DrawingCursors {
    pub start: Cursor,
    pub close: Cursor,
    pub drag_start: Cursor,
    pub drag_end: Cursor,
}

impl Default for DrawingCursors {
    fn default() -> Self {
        Self {
            start: Cursor::Crosshair,
            close: Cursor::Pointer,
            drag_start: Cursor::Grabbing,
            drag_end: Cursor::Crosshair,
        }
    }
}

/// Pixel tolerance used for hit tests when a mode does not override it.
pub const DEFAULT_POINTER_DISTANCE: f64 = 40.0;

pub(crate) fn default_pointer_distance() -> f64 {
    DEFAULT_POINTER_DISTANCE
}

fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = target.get_mut(key) {
                        merge_json(existing, value);
                    }
                } else {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Merge a partial JSON object over the current options and parse the
/// result. Unknown keys and mistyped values are rejected.
pub fn merge_options<T: Serialize + DeserializeOwned>(mode: &str, current: &T, partial: &Value) -> DrawResult<T> {
    let invalid = |reason: String| DrawError::InvalidOptions {
        mode: mode.to_string(),
        reason,
    };
    if !partial.is_object() {
        return Err(invalid("options must be a JSON object".into()));
    }
    let mut merged = serde_json::to_value(current).map_err(|e| invalid(e.to_string()))?;
    merge_json(&mut merged, partial);
    serde_json::from_value(merged).map_err(|e| invalid(e.to_string()))
}
