//! Selecting and editing finished features.
//!
//! What can be done to a feature is decided per owning mode through
//! [`ModeFlags`]. Features of modes without flags cannot be selected by
//! clicking. Edits are validated by the owning mode, not by select.

use super::{default_pointer_distance, merge_options, DrawMode, Mode, ModeBase, ModeContext};
use crate::behaviors::{
    coordinate_point, features_at_pointer, pixel_distance, snap, DragCoordinate, DragCoordinateResize, DragFeature,
    FeatureQueryOptions, Guidance, MidPoints, ResizeOrigin, RotateFeature, ScaleFeature, SelectionPoints,
    SnappingOptions,
};
use crate::common::{property, Cursor, DrawKeyboardEvent, DrawPointerEvent, FinishAction, ModeType, MouseButton, UpdateType};
use crate::error::DrawResult;
use crate::events::DrawEvent;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType};
use crate::store::Origin;
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{Validation, ValidationContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// Editing allowed on the vertices of a selected feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CoordinateFlags {
    pub draggable: bool,
    /// Right click removes a vertex.
    pub deletable: bool,
    pub midpoints: bool,
    /// Dragged vertices snap to vertices of other features of the same mode.
    pub snappable: bool,
    /// Dragging a vertex resizes the whole feature instead of moving one vertex.
    pub resizable: Option<ResizeOrigin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureFlags {
    pub draggable: bool,
    pub rotateable: bool,
    pub scaleable: bool,
    pub self_intersectable: bool,
    pub coordinates: Option<CoordinateFlags>,
}

/// Select behaviour for the features of one mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ModeFlags {
    pub feature: Option<FeatureFlags>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SelectKeyEvents {
    pub deselect: Option<String>,
    pub delete: Option<String>,
    /// Keys held while dragging to rotate.
    pub rotate: Vec<String>,
    /// Keys held while dragging to scale.
    pub scale: Vec<String>,
}

impl Default for SelectKeyEvents {
    fn default() -> Self {
        Self {
            deselect: Some("Escape".into()),
            delete: Some("Delete".into()),
            rotate: vec!["Control".into(), "r".into()],
            scale: vec!["Control".into(), "s".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SelectCursors {
    pub pointer_over: Cursor,
    pub drag_start: Cursor,
    pub drag_end: Cursor,
    pub insert_midpoint: Cursor,
}

impl Default for SelectCursors {
    fn default() -> Self {
        Self {
            pointer_over: Cursor::Move,
            drag_start: Cursor::Grabbing,
            drag_end: Cursor::Move,
            insert_midpoint: Cursor::Crosshair,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SelectOptions {
    pub pointer_distance: f64,
    /// Keyed by owning mode name.
    pub flags: BTreeMap<String, ModeFlags>,
    pub key_events: SelectKeyEvents,
    pub cursors: SelectCursors,
    /// Clicking empty map or pressing the deselect key clears the selection.
    pub allow_manual_deselection: bool,
    /// Applied to selected features and to select guidance points.
    pub styles: StyleOptions,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            pointer_distance: default_pointer_distance(),
            flags: BTreeMap::new(),
            key_events: SelectKeyEvents::default(),
            cursors: SelectCursors::default(),
            allow_manual_deselection: true,
            styles: StyleOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dragging {
    Coordinate,
    Resize(ResizeOrigin),
    Feature,
    Rotate,
    Scale,
}

impl Dragging {
    fn action(self) -> FinishAction {
        match self {
            Dragging::Coordinate => FinishAction::DragCoordinate,
            Dragging::Resize(_) => FinishAction::DragCoordinateResize,
            Dragging::Feature => FinishAction::DragFeature,
            Dragging::Rotate => FinishAction::Rotate,
            Dragging::Scale => FinishAction::Scale,
        }
    }
}

/// Validation of a feature by the mode that owns it.
fn owner_validation(
    modes: &HashMap<String, Mode>,
) -> impl Fn(&Feature, &ValidationContext<'_>) -> Validation + '_ {
    move |feature: &Feature, ctx: &ValidationContext<'_>| match feature.mode().and_then(|name| modes.get(name)) {
        Some(owner) => owner.as_mode().validate_feature(feature, ctx),
        None => Validation::invalid("Feature has no registered owning mode"),
    }
}

/// Fewest editable vertices a geometry may be left with.
fn min_vertices(geometry: &Geometry) -> usize {
    match geometry {
        Geometry::Point(_) => usize::MAX,
        Geometry::LineString(_) => 2,
        Geometry::Polygon(_) => 3,
    }
}

pub struct SelectMode {
    base: ModeBase,
    options: SelectOptions,
    selected: Option<FeatureId>,
    dragging: Option<Dragging>,
    selection_points: SelectionPoints,
    mid_points: MidPoints,
    drag_coordinate: DragCoordinate,
    resize: DragCoordinateResize,
    drag_feature: DragFeature,
    rotate: RotateFeature,
    scale: ScaleFeature,
}

impl Default for SelectMode {
    fn default() -> Self {
        Self::new(SelectOptions::default())
    }
}

impl SelectMode {
    pub fn new(options: SelectOptions) -> Self {
        Self {
            base: ModeBase::new("select"),
            drag_coordinate: DragCoordinate::new(options.pointer_distance),
            options,
            selected: None,
            dragging: None,
            selection_points: SelectionPoints::new(),
            mid_points: MidPoints::new(),
            resize: DragCoordinateResize::new(),
            drag_feature: DragFeature::new(),
            rotate: RotateFeature::new(),
            scale: ScaleFeature::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base = ModeBase::new(name);
        self
    }

    pub fn selected(&self) -> Option<&FeatureId> {
        self.selected.as_ref()
    }

    fn feature_flags(&self, mode: Option<&str>) -> Option<&FeatureFlags> {
        self.options.flags.get(mode?)?.feature.as_ref()
    }

    fn query_options(&self) -> FeatureQueryOptions {
        FeatureQueryOptions {
            pointer_distance: self.options.pointer_distance,
            ignore_select_features: true,
            ignore_coordinate_points: true,
            ignore_currently_drawing: true,
            ignore_closing_points: true,
            include_polygons_within_pointer_distance: false,
        }
    }

    /// Topmost selectable feature under the pointer. Points win over lines
    /// and lines over polygons.
    fn hit(&self, ctx: &ModeContext<'_>, event: &DrawPointerEvent) -> Option<Feature> {
        let hits: Vec<Feature> = features_at_pointer(ctx.store, &*ctx.adapter, event, &self.query_options())
            .into_iter()
            .filter(|f| self.feature_flags(f.mode()).is_some())
            .collect();
        [GeometryType::Point, GeometryType::LineString, GeometryType::Polygon]
            .into_iter()
            .find_map(|t| hits.iter().rev().find(|f| f.geometry.geometry_type() == t).cloned())
    }

    fn midpoint_at(&self, ctx: &ModeContext<'_>, event: &DrawPointerEvent) -> Option<FeatureId> {
        self.mid_points
            .ids()
            .iter()
            .filter_map(|id| match ctx.store.get(id)?.geometry {
                Geometry::Point(p) => Some((id, pixel_distance(&*ctx.adapter, event, p))),
                _ => None,
            })
            .filter(|(_, d)| *d <= self.options.pointer_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id.clone())
    }

    /// Select `id`, replacing any current selection.
    pub fn select_feature(&mut self, id: &FeatureId, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.selected.as_ref() == Some(id) {
            return Ok(());
        }
        let feature = ctx.store.copy(id)?;
        self.deselect(ctx)?;

        ctx.store
            .update_property(vec![(id.clone(), property::SELECTED, Some(json!(true)))], Origin::Interaction)?;
        let coordinates = self.feature_flags(feature.mode()).and_then(|f| f.coordinates.clone());
        if let Some(coordinates) = coordinates {
            let name = self.base.name().to_string();
            self.selection_points.create(ctx, id, &feature.geometry, &name);
            if coordinates.midpoints {
                self.mid_points.create(ctx, id, &feature.geometry, &name);
            }
        }
        self.selected = Some(id.clone());
        self.base.set_selecting()?;
        ctx.emit(DrawEvent::Select { id: id.clone() });
        Ok(())
    }

    /// Deselect `id` if it is the current selection.
    pub fn deselect_feature(&mut self, id: &FeatureId, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.selected.as_ref() == Some(id) {
            self.deselect(ctx)?;
        }
        Ok(())
    }

    /// Drop the selection and its guidance. Missing features are skipped.
    fn deselect(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.selected.take() else {
            return Ok(());
        };
        self.stop_drags();
        self.selection_points.delete(ctx);
        self.mid_points.delete(ctx);
        if ctx.store.has(&id) {
            ctx.store
                .update_property(vec![(id.clone(), property::SELECTED, None)], Origin::Interaction)?;
        } else {
            log::warn!("deselected {id} which is no longer stored");
        }
        self.base.settle();
        ctx.emit(DrawEvent::Deselect { id });
        Ok(())
    }

    fn stop_drags(&mut self) {
        self.dragging = None;
        self.drag_coordinate.stop();
        self.resize.stop();
        self.drag_feature.stop();
        self.rotate.reset();
        self.scale.reset();
    }

    /// Rebuild guidance after the selected geometry was replaced from outside.
    pub(crate) fn refresh_guidance(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.selected.clone() else {
            return Ok(());
        };
        let feature = ctx.store.copy(&id)?;
        let coordinates = self.feature_flags(feature.mode()).and_then(|f| f.coordinates.clone());
        let name = self.base.name().to_string();
        self.selection_points.delete(ctx);
        self.mid_points.delete(ctx);
        if let Some(coordinates) = coordinates {
            self.selection_points.create(ctx, &id, &feature.geometry, &name);
            if coordinates.midpoints {
                self.mid_points.create(ctx, &id, &feature.geometry, &name);
            }
        }
        Ok(())
    }

    /// Remove the vertex under the pointer from the selected feature.
    fn delete_coordinate(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.selected.clone() else {
            return Ok(());
        };
        let feature = ctx.store.copy(&id)?;
        let Some(coordinates) = self.feature_flags(feature.mode()).and_then(|f| f.coordinates.clone()) else {
            return Ok(());
        };
        if !coordinates.deletable {
            return Ok(());
        }
        let Some(index) = self.drag_coordinate.draggable_index(ctx, event, &id) else {
            return Ok(());
        };
        let mut positions = feature.geometry.editable_positions();
        if positions.len() <= min_vertices(&feature.geometry) {
            log::debug!("not deleting vertex {index} of {id}: too few vertices");
            return Ok(());
        }
        positions.remove(index);
        let mut candidate = feature.clone();
        candidate.geometry = feature.geometry.with_editable_positions(positions);

        let validate = owner_validation(ctx.modes);
        let verdict = validate(&candidate, &ctx.validation_context(UpdateType::Commit));
        if !verdict.valid {
            log::debug!("vertex delete on {id} rejected: {:?}", verdict.reason);
            return Ok(());
        }
        ctx.store
            .update_geometry(vec![(id.clone(), candidate.geometry.clone())], Origin::Interaction)?;
        self.selection_points.remove_at(ctx, index)?;
        if coordinates.midpoints {
            let name = self.base.name().to_string();
            self.mid_points.create(ctx, &id, &candidate.geometry, &name);
        }
        if !feature.coordinate_point_ids().is_empty() {
            coordinate_point::create_or_update(ctx, &id)?;
        }
        ctx.finish(id, self.base.name(), FinishAction::DeleteCoordinate);
        Ok(())
    }

    fn insert_midpoint(&mut self, midpoint: &FeatureId, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.selected.clone() else {
            return Ok(());
        };
        let validate = owner_validation(ctx.modes);
        if self
            .mid_points
            .insert(ctx, midpoint, &mut self.selection_points, &validate)?
            .is_none()
        {
            return Ok(());
        }
        let tracked = ctx.store.get(&id).is_some_and(|f| !f.coordinate_point_ids().is_empty());
        if tracked {
            coordinate_point::create_or_update(ctx, &id)?;
        }
        ctx.finish(id, self.base.name(), FinishAction::InsertMidpoint);
        Ok(())
    }
}

impl DrawMode for SelectMode {
    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn mode_type(&self) -> ModeType {
        ModeType::Select
    }

    fn start(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.base.set_started()?;
        ctx.set_cursor(Cursor::Unset);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.dragging.is_some() {
            ctx.adapter.set_draggability(true);
        }
        self.deselect(ctx)?;
        self.stop_drags();
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        match event.button {
            MouseButton::Right => return self.delete_coordinate(event, ctx),
            MouseButton::Left => {}
            _ => return Ok(()),
        }

        if let Some(selected) = self.selected.clone() {
            if let Some(midpoint) = self.midpoint_at(ctx, event) {
                return self.insert_midpoint(&midpoint, ctx);
            }
            // Clicks on a vertex of the selection keep it selected
            if !self.selection_points.ids().is_empty()
                && self.drag_coordinate.draggable_index(ctx, event, &selected).is_some()
            {
                return Ok(());
            }
        }

        match self.hit(ctx, event) {
            Some(feature) => self.select_feature(&feature.id, ctx),
            None if self.options.allow_manual_deselection => self.deselect(ctx),
            None => Ok(()),
        }
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.dragging.is_some() {
            return Ok(());
        }
        let cursor = if self.selected.is_some() && self.midpoint_at(ctx, event).is_some() {
            self.options.cursors.insert_midpoint
        } else if self.hit(ctx, event).is_some() {
            self.options.cursors.pointer_over
        } else {
            Cursor::Unset
        };
        ctx.set_cursor(cursor);
        Ok(())
    }

    fn on_key_up(&mut self, event: &DrawKeyboardEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.matches(&self.options.key_events.delete) {
            let Some(id) = self.selected.clone() else {
                return Ok(());
            };
            self.deselect(ctx)?;
            coordinate_point::delete_for(ctx, &id)?;
            ctx.store.delete_if_present(&[id], Origin::Interaction);
            Ok(())
        } else if event.matches(&self.options.key_events.deselect) && self.options.allow_manual_deselection {
            self.deselect(ctx)
        } else {
            Ok(())
        }
    }

    fn on_drag_start(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.selected.clone() else {
            return Ok(());
        };
        let Some(feature) = ctx.store.get(&id) else {
            return Ok(());
        };
        let Some(flags) = self.feature_flags(feature.mode()).cloned() else {
            return Ok(());
        };

        let mut dragging = None;
        if let Some(coordinates) = &flags.coordinates {
            if let Some(index) = self.drag_coordinate.draggable_index(ctx, event, &id) {
                if let Some(origin) = coordinates.resizable {
                    self.resize.start(id.clone(), index);
                    dragging = Some(Dragging::Resize(origin));
                } else if coordinates.draggable {
                    self.drag_coordinate.start(id.clone(), index);
                    dragging = Some(Dragging::Coordinate);
                }
            }
        }
        if dragging.is_none() {
            let over_feature = features_at_pointer(ctx.store, &*ctx.adapter, event, &self.query_options())
                .iter()
                .any(|f| f.id == id);
            if over_feature {
                let keys = &self.options.key_events;
                if flags.rotateable && event.holds_all(&keys.rotate) {
                    self.rotate.reset();
                    dragging = Some(Dragging::Rotate);
                } else if flags.scaleable && event.holds_all(&keys.scale) {
                    self.scale.reset();
                    dragging = Some(Dragging::Scale);
                } else if flags.draggable {
                    self.drag_feature.start(id.clone(), event);
                    dragging = Some(Dragging::Feature);
                }
            }
        }

        if dragging.is_some() {
            self.dragging = dragging;
            ctx.set_cursor(self.options.cursors.drag_start);
            ctx.adapter.set_draggability(false);
        }
        Ok(())
    }

    fn on_drag(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let (Some(id), Some(dragging)) = (self.selected.clone(), self.dragging) else {
            return Ok(());
        };
        let Some(feature) = ctx.store.get(&id) else {
            return Ok(());
        };
        let owner = feature.mode().unwrap_or_default().to_string();
        let flags = self.feature_flags(Some(&owner)).cloned().unwrap_or_default();
        let validate = owner_validation(ctx.modes);
        let guidance = Guidance::new(&self.selection_points, &self.mid_points);

        match dragging {
            Dragging::Coordinate => {
                let snappable = flags.coordinates.as_ref().is_some_and(|c| c.snappable);
                let snapped = snappable
                    .then(|| {
                        let to_coordinate = SnappingOptions {
                            to_coordinate: true,
                            ..Default::default()
                        };
                        snap(
                            &to_coordinate,
                            None,
                            ctx.store,
                            &*ctx.adapter,
                            event,
                            self.options.pointer_distance,
                            &owner,
                            Some(&id),
                        )
                    })
                    .flatten();
                let target = snapped.unwrap_or(event.position());
                self.drag_coordinate
                    .drag(ctx, target, flags.self_intersectable, guidance, &validate)?;
            }
            Dragging::Resize(origin) => {
                self.resize.drag(ctx, event, origin, guidance, &validate)?;
            }
            Dragging::Feature => {
                self.drag_feature.drag(ctx, event, guidance, &validate)?;
            }
            Dragging::Rotate => {
                self.rotate.rotate(ctx, event, &id, guidance, &validate)?;
            }
            Dragging::Scale => {
                self.scale.scale(ctx, event, &id, guidance, &validate)?;
            }
        }
        Ok(())
    }

    fn on_drag_end(&mut self, _event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(dragging) = self.dragging.take() else {
            return Ok(());
        };
        let id = match dragging {
            Dragging::Coordinate => self.drag_coordinate.stop(),
            Dragging::Resize(_) => self.resize.stop(),
            Dragging::Feature => self.drag_feature.stop(),
            Dragging::Rotate => {
                self.rotate.reset();
                self.selected.clone()
            }
            Dragging::Scale => {
                self.scale.reset();
                self.selected.clone()
            }
        };
        ctx.set_cursor(self.options.cursors.drag_end);
        ctx.adapter.set_draggability(true);
        if let Some(id) = id {
            ctx.finish(id, self.base.name(), dragging.action());
        }
        Ok(())
    }

    fn style_feature(&self, feature: &Feature) -> FeatureStyle {
        self.options.styles.resolve(feature)
    }

    fn validate_feature(&self, _feature: &Feature, _ctx: &ValidationContext<'_>) -> Validation {
        Validation::invalid(format!("Mode '{}' does not own features", self.name()))
    }

    fn update_options(&mut self, partial: &Value) -> DrawResult<()> {
        let options: SelectOptions = merge_options(self.name(), &self.options, partial)?;
        self.drag_coordinate.set_pointer_distance(options.pointer_distance);
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
    use crate::feature::properties;
    use crate::modes::PolygonMode;
    use crate::store::{GeoJsonStore, NewFeature};

    fn editable_flags() -> BTreeMap<String, ModeFlags> {
        let feature = FeatureFlags {
            draggable: true,
            coordinates: Some(CoordinateFlags {
                draggable: true,
                deletable: true,
                midpoints: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        BTreeMap::from([("polygon".to_string(), ModeFlags { feature: Some(feature) })])
    }

    fn fixture() -> (GeoJsonStore, FeatureId, HashMap<String, Mode>) {
        let mut store = GeoJsonStore::default();
        let square = Geometry::Polygon(vec![vec![[0.0, 0.0], [0.1, 0.0], [0.1, 0.1], [0.0, 0.1], [0.0, 0.0]]]);
        let id = store.create(
            vec![NewFeature::new(square, properties([(property::MODE, json!("polygon"))]))],
            Origin::Api,
        )[0]
        .clone();
        store.take_changes();
        let modes = HashMap::from([("polygon".to_string(), Mode::from(PolygonMode::default()))]);
        (store, id, modes)
    }

    fn vertex_count(store: &GeoJsonStore, id: &FeatureId) -> usize {
        store.get_geometry_copy(id).unwrap().editable_positions().len()
    }

    #[test]
    fn test_click_selects_and_creates_guidance() {
        let (mut store, id, modes) = fixture();
        let mut adapter = HeadlessAdapter::default();
        let inside = adapter.pointer_event(0.05, 0.05);
        let outside = adapter.pointer_event(1.0, 1.0);
        let mut events = Vec::new();
        let mut mode = SelectMode::new(SelectOptions {
            flags: editable_flags(),
            ..Default::default()
        });
        {
            let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
            mode.register().unwrap();
            mode.start(&mut ctx).unwrap();
            mode.on_click(&inside, &mut ctx).unwrap();
            assert_eq!(mode.selected(), Some(&id));
            assert_eq!(mode.state(), crate::modes::ModeState::Selecting);
            assert_eq!(ctx.store.size(), 9);
            assert!(ctx.store.get(&id).unwrap().flag(property::SELECTED));

            mode.on_click(&outside, &mut ctx).unwrap();
            assert_eq!(mode.selected(), None);
            assert_eq!(ctx.store.size(), 1);
            assert!(!ctx.store.get(&id).unwrap().flag(property::SELECTED));
        }
        assert!(events.contains(&DrawEvent::Select { id: id.clone() }));
        assert!(events.contains(&DrawEvent::Deselect { id }));
    }

    #[test]
    fn test_features_without_flags_are_not_selectable() {
        let (mut store, _, modes) = fixture();
        let mut adapter = HeadlessAdapter::default();
        let inside = adapter.pointer_event(0.05, 0.05);
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        let mut mode = SelectMode::default();
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&inside, &mut ctx).unwrap();
        assert!(mode.selected().is_none());
    }

    #[test]
    fn test_midpoint_click_inserts_vertex() {
        let (mut store, id, modes) = fixture();
        let mut adapter = HeadlessAdapter::default();
        let inside = adapter.pointer_event(0.05, 0.05);
        let bottom_mid = adapter.pointer_event(0.05, 0.0);
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        let mut mode = SelectMode::new(SelectOptions {
            flags: editable_flags(),
            ..Default::default()
        });
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&inside, &mut ctx).unwrap();
        mode.on_click(&bottom_mid, &mut ctx).unwrap();

        assert_eq!(vertex_count(ctx.store, &id), 5);
        assert_eq!(mode.selection_points.ids().len(), 5);
        assert_eq!(mode.mid_points.ids().len(), 5);
        assert_eq!(ctx.store.size(), 11);
        let ring = ctx.store.get_geometry_copy(&id).unwrap();
        assert!(ring.editable_positions().contains(&[0.05, 0.0]));
    }

    #[test]
    fn test_right_click_deletes_vertex_down_to_triangle() {
        let (mut store, id, modes) = fixture();
        let mut adapter = HeadlessAdapter::default();
        let inside = adapter.pointer_event(0.05, 0.05);
        let corner = adapter.pointer_event(0.1, 0.1).with_button(MouseButton::Right);
        let other_corner = adapter.pointer_event(0.0, 0.1).with_button(MouseButton::Right);
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        let mut mode = SelectMode::new(SelectOptions {
            flags: editable_flags(),
            ..Default::default()
        });
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&inside, &mut ctx).unwrap();

        mode.on_click(&corner, &mut ctx).unwrap();
        assert_eq!(vertex_count(ctx.store, &id), 3);
        assert_eq!(mode.selection_points.ids().len(), 3);
        assert_eq!(mode.mid_points.ids().len(), 3);

        mode.on_click(&other_corner, &mut ctx).unwrap();
        assert_eq!(vertex_count(ctx.store, &id), 3, "a triangle keeps its vertices");
    }

    #[test]
    fn test_drag_feature_moves_guidance() {
        let (mut store, id, modes) = fixture();
        let mut adapter = HeadlessAdapter::default();
        let inside = adapter.pointer_event(0.05, 0.05);
        let moved = adapter.pointer_event(0.06, 0.05);
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        let mut mode = SelectMode::new(SelectOptions {
            flags: editable_flags(),
            ..Default::default()
        });
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&inside, &mut ctx).unwrap();
        mode.on_drag_start(&inside, &mut ctx).unwrap();
        mode.on_drag(&moved, &mut ctx).unwrap();
        mode.on_drag_end(&moved, &mut ctx).unwrap();

        let first = ctx.store.get_geometry_copy(&id).unwrap().editable_positions()[0];
        assert!((first[0] - 0.01).abs() < 1e-6);
        let point_id = mode.selection_points.id_at(0).cloned().unwrap();
        assert_eq!(ctx.store.get_geometry_copy(&point_id).unwrap(), Geometry::Point(first));
        drop(ctx);
        assert!(events.iter().any(|e| matches!(
            e,
            DrawEvent::Finish { context, .. } if context.action == FinishAction::DragFeature
        )));
    }

    #[test]
    fn test_delete_key_removes_feature_and_guidance() {
        let (mut store, _, modes) = fixture();
        let mut adapter = HeadlessAdapter::default();
        let inside = adapter.pointer_event(0.05, 0.05);
        let mut events = Vec::new();
        let mut ctx = ModeContext::new(&mut store, &mut adapter, &modes, &mut events);
        let mut mode = SelectMode::new(SelectOptions {
            flags: editable_flags(),
            ..Default::default()
        });
        mode.register().unwrap();
        mode.start(&mut ctx).unwrap();
        mode.on_click(&inside, &mut ctx).unwrap();
        mode.on_key_up(&DrawKeyboardEvent::new("Delete"), &mut ctx).unwrap();
        assert_eq!(ctx.store.size(), 0);
        assert!(mode.selected().is_none());
    }
}
