//! The engine: owns the store, the registered modes and the adapter.

use crate::adapter::{DrawAdapter, RenderChangeset};
use crate::behaviors::{features_at_pointer, FeatureQueryOptions};
use crate::common::{property, DrawKeyboardEvent, DrawPointerEvent, ModeType, UpdateType};
use crate::error::{DrawError, DrawResult};
use crate::events::{DrawEvent, DrawEventKind, EventRegistry, Listener};
use crate::feature::{Feature, FeatureId, Geometry, Position};
use crate::modes::{DrawMode, Mode, ModeContext, ModeState, StaticMode, STATIC_MODE_NAME};
use crate::store::{ChangeKind, GeoJsonStore, IdStrategy, Origin, UuidStrategy};
use crate::styling::FeatureStyle;
use crate::validation::{FeatureValidationResult, Validation, ValidationContext};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Engine-level settings.
pub struct DrawConfig {
    pub id_strategy: Box<dyn IdStrategy>,
    /// Stamp `createdAt`/`updatedAt` on stored features.
    pub tracked: bool,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            id_strategy: Box::new(UuidStrategy),
            tracked: true,
        }
    }
}

impl fmt::Debug for DrawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawConfig").field("tracked", &self.tracked).finish_non_exhaustive()
    }
}

/// Style of `feature`: the select mode's when selected, otherwise its owner's.
fn resolve_style(modes: &HashMap<String, Mode>, select_mode: Option<&str>, feature: &Feature) -> FeatureStyle {
    let owner = if feature.flag(property::SELECTED) {
        select_mode.or(feature.mode())
    } else {
        feature.mode()
    };
    owner
        .and_then(|name| modes.get(name))
        .map(|mode| mode.as_mode().style_feature(feature))
        .unwrap_or_default()
}

/// Drawing and editing of GeoJSON features on top of a [`DrawAdapter`].
///
/// Every public call runs to completion: store changes are rendered and
/// listeners are notified before it returns.
pub struct GeoDraw<A: DrawAdapter> {
    adapter: A,
    store: GeoJsonStore,
    modes: HashMap<String, Mode>,
    active: String,
    select_mode: Option<String>,
    enabled: bool,
    events: EventRegistry,
}

impl<A: DrawAdapter> fmt::Debug for GeoDraw<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoDraw")
            .field("store", &self.store)
            .field("modes", &self.modes)
            .field("active", &self.active)
            .field("enabled", &self.enabled)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl<A: DrawAdapter> GeoDraw<A> {
    /// Register `modes` with the adapter. A static mode is added when none is
    /// given and is active until [`GeoDraw::set_mode`] is called.
    pub fn new(adapter: A, modes: Vec<Mode>, config: DrawConfig) -> DrawResult<Self> {
        let select_count = modes.iter().filter(|m| m.mode_type() == ModeType::Select).count();
        if select_count > 1 {
            return Err(DrawError::MultipleSelectModes(select_count));
        }

        let mut registered = HashMap::with_capacity(modes.len() + 1);
        let mut select_mode = None;
        for mut mode in modes {
            let name = mode.name().to_string();
            if registered.contains_key(&name) {
                return Err(DrawError::DuplicateModeName(name));
            }
            mode.as_mode_mut().register()?;
            if mode.mode_type() == ModeType::Select {
                select_mode = Some(name.clone());
            }
            registered.insert(name, mode);
        }
        if !registered.contains_key(STATIC_MODE_NAME) {
            let mut fallback = Mode::from(StaticMode::new());
            fallback.as_mode_mut().register()?;
            registered.insert(STATIC_MODE_NAME.to_string(), fallback);
        }

        Ok(Self {
            adapter,
            store: GeoJsonStore::new(config.id_strategy, config.tracked),
            modes: registered,
            active: STATIC_MODE_NAME.to_string(),
            select_mode,
            enabled: false,
            events: EventRegistry::new(),
        })
    }

    fn ensure_enabled(&self) -> DrawResult<()> {
        if self.enabled { Ok(()) } else { Err(DrawError::NotEnabled) }
    }

    /// Run `f` against one mode with a context over everything else, then
    /// publish what it did.
    fn with_mode<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Mode, &mut ModeContext<'_>) -> DrawResult<T>,
    ) -> DrawResult<T> {
        let mut mode = self
            .modes
            .remove(name)
            .ok_or_else(|| DrawError::UnknownMode(name.to_string()))?;
        let mut queued = Vec::new();
        let result = {
            let mut ctx = ModeContext::new(&mut self.store, &mut self.adapter, &self.modes, &mut queued);
            let result = f(&mut mode, &mut ctx);
            ctx.flush_store_changes();
            result
        };
        self.modes.insert(name.to_string(), mode);
        self.publish(queued);
        result
    }

    /// Publish store changes made outside of a mode.
    fn flush(&mut self) {
        let queued = self
            .store
            .take_changes()
            .into_iter()
            .map(|change| DrawEvent::Change {
                ids: change.ids,
                kind: change.kind,
                origin: change.origin,
            })
            .collect();
        self.publish(queued);
    }

    fn publish(&mut self, queued: Vec<DrawEvent>) {
        for event in queued {
            if let DrawEvent::Change { ids, kind, .. } = &event {
                self.render(ids, *kind);
            }
            self.events.dispatch(&event);
        }
    }

    fn render(&mut self, ids: &[FeatureId], kind: ChangeKind) {
        let mut changes = RenderChangeset::default();
        let current = || -> Vec<Feature> { ids.iter().filter_map(|id| self.store.get(id).cloned()).collect() };
        match kind {
            ChangeKind::Create => changes.created = current(),
            ChangeKind::Update => changes.updated = current(),
            ChangeKind::Delete => changes.deleted_ids = ids.to_vec(),
        }
        if changes.is_empty() {
            return;
        }
        let modes = &self.modes;
        let select_mode = self.select_mode.as_deref();
        let resolver = move |feature: &Feature| resolve_style(modes, select_mode, feature);
        self.adapter.render(&changes, &resolver);
    }

    /// Begin listening to input and start the active mode.
    pub fn start(&mut self) -> DrawResult<()> {
        if self.enabled {
            return Ok(());
        }
        self.adapter.register();
        self.enabled = true;
        let active = self.active.clone();
        self.with_mode(&active, |mode, ctx| mode.as_mode_mut().start(ctx))?;
        log::info!("GeoDraw started in mode '{active}'");
        self.events.dispatch(&DrawEvent::Ready);
        Ok(())
    }

    /// Stop the active mode, discarding anything in progress.
    pub fn stop(&mut self) -> DrawResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let active = self.active.clone();
        self.with_mode(&active, |mode, ctx| mode.as_mode_mut().stop(ctx))?;
        self.adapter.unregister();
        self.enabled = false;
        log::info!("GeoDraw stopped");
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Switch the active mode. The previous mode is stopped first.
    pub fn set_mode(&mut self, name: &str) -> DrawResult<()> {
        self.ensure_enabled()?;
        if name == self.active {
            return Ok(());
        }
        if !self.modes.contains_key(name) {
            return Err(DrawError::UnknownMode(name.to_string()));
        }
        let previous = self.active.clone();
        self.with_mode(&previous, |mode, ctx| mode.as_mode_mut().stop(ctx))?;
        if let Err(err) = self.with_mode(name, |mode, ctx| mode.as_mode_mut().start(ctx)) {
            log::warn!("mode '{name}' failed to start, staying in '{previous}': {err}");
            self.with_mode(&previous, |mode, ctx| mode.as_mode_mut().start(ctx))?;
            return Err(err);
        }
        self.active = name.to_string();
        Ok(())
    }

    /// Name of the active mode.
    pub fn get_mode(&self) -> &str {
        &self.active
    }

    pub fn get_mode_state(&self) -> ModeState {
        self.modes.get(&self.active).map(Mode::state).unwrap_or_default()
    }

    /// Add features built outside the engine. Each is validated by the mode
    /// named in its `mode` property; invalid ones are reported and skipped.
    pub fn add_features(&mut self, features: Vec<Feature>) -> DrawResult<Vec<FeatureValidationResult>> {
        self.ensure_enabled()?;
        let adapter = &self.adapter;
        let modes = &self.modes;
        let results = self.store.load(features, |feature| {
            let Some(owner) = feature.mode().and_then(|name| modes.get(name)) else {
                return Validation::invalid(format!("Feature {} has no registered mode", feature.id));
            };
            owner
                .as_mode()
                .validate_feature(feature, &ValidationContext::new(adapter, UpdateType::Commit))
        })?;

        for result in results.iter().filter(|r| r.valid) {
            let Ok(feature) = self.store.copy(&result.id) else {
                continue;
            };
            let Some(owner) = feature.mode().map(str::to_string) else {
                continue;
            };
            self.with_mode(&owner, |mode, ctx| mode.as_mode_mut().after_feature_added(&feature, ctx))?;
        }
        self.flush();
        Ok(results)
    }

    /// Remove features and everything that hangs off them. Every id must exist.
    pub fn remove_features(&mut self, ids: &[FeatureId]) -> DrawResult<()> {
        self.ensure_enabled()?;
        if let Some(missing) = ids.iter().find(|id| !self.store.has(id)) {
            return Err(DrawError::FeatureNotFound(missing.clone()));
        }

        if let Some(select) = self.select_mode.clone() {
            for id in ids {
                self.with_mode(&select, |mode, ctx| match mode.as_select_mut() {
                    Some(select) => select.deselect_feature(id, ctx),
                    None => Ok(()),
                })?;
            }
        }
        let active = self.active.clone();
        let drawing = self
            .modes
            .get(&active)
            .and_then(|m| m.as_mode().drawing_feature_id().cloned());
        if drawing.is_some_and(|id| ids.contains(&id)) {
            self.with_mode(&active, |mode, ctx| mode.as_mode_mut().cleanup(ctx))?;
        }

        let mut doomed = Vec::new();
        for id in ids {
            if let Some(feature) = self.store.get(id) {
                doomed.extend(feature.coordinate_point_ids());
                doomed.push(id.clone());
            }
        }
        self.store.delete_if_present(&doomed, Origin::Api);
        self.flush();
        Ok(())
    }

    /// Replace the geometry of a feature after its owning mode accepts it.
    /// An invalid geometry is reported, not written.
    pub fn update_feature_geometry(&mut self, id: &FeatureId, geometry: Geometry) -> DrawResult<Validation> {
        self.ensure_enabled()?;
        let mut feature = self.store.copy(id)?;
        let expected = feature.geometry.geometry_type();
        let actual = geometry.geometry_type();
        if expected != actual {
            return Err(DrawError::GeometryTypeMismatch {
                id: id.clone(),
                expected,
                actual,
            });
        }
        feature.geometry = geometry;

        let Some(owner) = feature.mode().map(str::to_string) else {
            return Ok(Validation::invalid("Feature has no mode"));
        };
        let verdict = match self.modes.get(&owner) {
            Some(mode) => mode
                .as_mode()
                .validate_feature(&feature, &ValidationContext::new(&self.adapter, UpdateType::Commit)),
            None => Validation::invalid(format!("Mode '{owner}' is not registered")),
        };
        if !verdict.valid {
            return Ok(verdict);
        }

        self.store
            .update_geometry(vec![(id.clone(), feature.geometry.clone())], Origin::Api)?;
        self.with_mode(&owner, |mode, ctx| mode.as_mode_mut().after_feature_updated(&feature, ctx))?;
        if let Some(select) = self.select_mode.clone() {
            self.with_mode(&select, |mode, ctx| match mode.as_select_mut() {
                Some(select) if select.selected() == Some(id) => select.refresh_guidance(ctx),
                _ => Ok(()),
            })?;
        }
        self.flush();
        Ok(verdict)
    }

    /// Copies of every stored feature, back to front.
    pub fn get_snapshot(&self) -> Vec<Feature> {
        self.store.copy_all()
    }

    pub fn get_snapshot_feature(&self, id: &FeatureId) -> Option<Feature> {
        self.store.copy(id).ok()
    }

    pub fn has_feature(&self, id: &FeatureId) -> bool {
        self.store.has(id)
    }

    /// A fresh id from the configured strategy, for features built outside
    /// the engine.
    pub fn get_feature_id(&mut self) -> FeatureId {
        self.store.get_id()
    }

    /// Read-only access to the store.
    pub fn store(&self) -> &GeoJsonStore {
        &self.store
    }

    /// Select a feature, switching to the select mode if needed.
    pub fn select_feature(&mut self, id: &FeatureId) -> DrawResult<()> {
        self.ensure_enabled()?;
        let select = self.select_mode.clone().ok_or(DrawError::NoSelectMode)?;
        if !self.store.has(id) {
            return Err(DrawError::FeatureNotFound(id.clone()));
        }
        self.set_mode(&select)?;
        self.with_mode(&select, |mode, ctx| match mode.as_select_mut() {
            Some(select) => select.select_feature(id, ctx),
            None => Ok(()),
        })
    }

    pub fn deselect_feature(&mut self, id: &FeatureId) -> DrawResult<()> {
        self.ensure_enabled()?;
        let select = self.select_mode.clone().ok_or(DrawError::NoSelectMode)?;
        self.with_mode(&select, |mode, ctx| match mode.as_select_mut() {
            Some(select) => select.deselect_feature(id, ctx),
            None => Ok(()),
        })
    }

    /// Features under a geographic position, back to front.
    pub fn get_features_at_lng_lat(
        &self,
        position: Position,
        options: &FeatureQueryOptions,
    ) -> DrawResult<Vec<Feature>> {
        let pixel = self.adapter.project(position[0], position[1]);
        let event = DrawPointerEvent::new(position[0], position[1], pixel.x, pixel.y);
        self.get_features_at_pointer_event(&event, options)
    }

    /// Features under a pointer event, back to front.
    pub fn get_features_at_pointer_event(
        &self,
        event: &DrawPointerEvent,
        options: &FeatureQueryOptions,
    ) -> DrawResult<Vec<Feature>> {
        self.ensure_enabled()?;
        Ok(features_at_pointer(&self.store, &self.adapter, event, options))
    }

    /// Merge a partial JSON object into a mode's options.
    pub fn update_mode_options(&mut self, name: &str, partial: &Value) -> DrawResult<()> {
        let mode = self
            .modes
            .get_mut(name)
            .ok_or_else(|| DrawError::UnknownMode(name.to_string()))?;
        mode.as_mode_mut().update_options(partial)
    }

    pub fn mode_options(&self, name: &str) -> DrawResult<Value> {
        self.modes
            .get(name)
            .map(|mode| mode.as_mode().options())
            .ok_or_else(|| DrawError::UnknownMode(name.to_string()))
    }

    pub fn on(&self, kind: DrawEventKind, listener: Listener) {
        self.events.on(kind, listener);
    }

    pub fn off(&self, kind: DrawEventKind, listener: &Listener) -> bool {
        self.events.off(kind, listener)
    }

    /// Handle to the listener registry, for listeners that unsubscribe
    /// themselves.
    pub fn events(&self) -> EventRegistry {
        self.events.clone()
    }

    /// Discard in-progress work and every stored feature.
    pub fn clear(&mut self) -> DrawResult<()> {
        self.ensure_enabled()?;
        let active = self.active.clone();
        self.with_mode(&active, |mode, ctx| mode.as_mode_mut().cleanup(ctx))?;
        self.store.clear(Origin::Api);
        self.flush();
        self.adapter.clear();
        Ok(())
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    fn dispatch_input(&mut self, f: impl FnOnce(&mut dyn DrawMode, &mut ModeContext<'_>) -> DrawResult<()>) -> DrawResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let active = self.active.clone();
        self.with_mode(&active, |mode, ctx| f(mode.as_mode_mut(), ctx))
    }

    pub fn handle_click(&mut self, event: &DrawPointerEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_click(event, ctx))
    }

    pub fn handle_mouse_move(&mut self, event: &DrawPointerEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_mouse_move(event, ctx))
    }

    pub fn handle_key_down(&mut self, event: &DrawKeyboardEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_key_down(event, ctx))
    }

    pub fn handle_key_up(&mut self, event: &DrawKeyboardEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_key_up(event, ctx))
    }

    pub fn handle_drag_start(&mut self, event: &DrawPointerEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_drag_start(event, ctx))
    }

    pub fn handle_drag(&mut self, event: &DrawPointerEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_drag(event, ctx))
    }

    pub fn handle_drag_end(&mut self, event: &DrawPointerEvent) -> DrawResult<()> {
        self.dispatch_input(|mode, ctx| mode.on_drag_end(event, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::feature::properties;
    use crate::modes::{PointMode, PolygonMode, SelectMode};
    use crate::store::IncrementingStrategy;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine(modes: Vec<Mode>) -> GeoDraw<HeadlessAdapter> {
        let config = DrawConfig {
            id_strategy: Box::new(IncrementingStrategy::new()),
            tracked: false,
        };
        GeoDraw::new(HeadlessAdapter::default(), modes, config).unwrap()
    }

    #[test]
    fn test_construction_checks_mode_names() {
        let err = GeoDraw::new(
            HeadlessAdapter::default(),
            vec![PointMode::default().into(), PointMode::default().into()],
            DrawConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, DrawError::DuplicateModeName("point".into()));
    }

    #[test]
    fn test_failed_mode_start_keeps_previous_mode() {
        let mut draw = engine(vec![PointMode::default().into()]);
        draw.start().unwrap();
        // Never registered, so it refuses to start
        draw.modes.insert("polygon".into(), PolygonMode::default().into());

        let err = draw.set_mode("polygon").unwrap_err();
        assert!(matches!(err, DrawError::InvalidModeState { .. }));
        assert_eq!(draw.get_mode(), "static");
        assert_eq!(draw.get_mode_state(), ModeState::Started);

        draw.set_mode("point").unwrap();
        assert_eq!(draw.get_mode(), "point");
        assert_eq!(draw.modes["static"].state(), ModeState::Registered);
    }

    #[test]
    fn test_calls_before_start_fail() {
        let mut draw = engine(vec![PointMode::default().into()]);
        assert_eq!(draw.set_mode("point"), Err(DrawError::NotEnabled));
        assert_eq!(draw.add_features(Vec::new()), Err(DrawError::NotEnabled));
        assert_eq!(draw.get_mode(), "static");
        // Input is ignored rather than rejected
        let event = draw.adapter().pointer_event(0.0, 0.0);
        assert!(draw.handle_click(&event).is_ok());
        assert!(draw.get_snapshot().is_empty());
    }

    #[test]
    fn test_set_mode_and_unknown_mode() {
        let mut draw = engine(vec![PointMode::default().into()]);
        draw.start().unwrap();
        assert_eq!(draw.get_mode_state(), ModeState::Started);
        draw.set_mode("point").unwrap();
        assert_eq!(draw.get_mode(), "point");
        assert_eq!(draw.modes["static"].state(), ModeState::Registered);
        assert_eq!(draw.set_mode("nope"), Err(DrawError::UnknownMode("nope".into())));
    }

    #[test]
    fn test_click_renders_and_notifies() {
        let mut draw = engine(vec![PointMode::default().into()]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let listener: Listener = Rc::new(move |e: &DrawEvent| sink.borrow_mut().push(e.kind()));
        draw.on(DrawEventKind::Change, listener.clone());
        draw.on(DrawEventKind::Finish, listener);
        draw.start().unwrap();
        draw.set_mode("point").unwrap();

        let event = draw.adapter().pointer_event(0.01, 0.02);
        draw.handle_click(&event).unwrap();
        assert_eq!(draw.get_snapshot().len(), 1);
        assert_eq!(draw.adapter().rendered().len(), 1);
        assert_eq!(*seen.borrow(), vec![DrawEventKind::Change, DrawEventKind::Finish]);
    }

    #[test]
    fn test_add_features_validates_against_owner() {
        let mut draw = engine(vec![PolygonMode::default().into()]);
        draw.start().unwrap();
        let owned = |id: u64, ring: Vec<Position>| {
            Feature::new(
                FeatureId::from(id),
                Geometry::Polygon(vec![ring]),
                properties([(property::MODE, json!("polygon"))]),
            )
        };
        let square = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
        let bowtie = vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let orphan = Feature::new(FeatureId::from(3), Geometry::Point([0.0, 0.0]), properties([(property::MODE, json!("ghost"))]));

        let results = draw
            .add_features(vec![owned(1, square), owned(2, bowtie), orphan])
            .unwrap();
        let valid: Vec<bool> = results.iter().map(|r| r.valid).collect();
        assert_eq!(valid, vec![true, false, false]);
        assert!(draw.has_feature(&FeatureId::from(1)));
        assert!(!draw.has_feature(&FeatureId::from(2)));

        let err = draw
            .add_features(vec![owned(1, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]])])
            .unwrap_err();
        assert_eq!(err, DrawError::DuplicateFeatureId(FeatureId::from(1)));
    }

    #[test]
    fn test_update_feature_geometry() {
        let mut draw = engine(vec![PolygonMode::default().into()]);
        draw.start().unwrap();
        let square = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]);
        let feature = Feature::new(FeatureId::from(1), square, properties([(property::MODE, json!("polygon"))]));
        draw.add_features(vec![feature]).unwrap();
        let id = FeatureId::from(1);

        let err = draw.update_feature_geometry(&id, Geometry::Point([0.0, 0.0])).unwrap_err();
        assert!(matches!(err, DrawError::GeometryTypeMismatch { .. }));

        let bowtie = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]);
        assert!(!draw.update_feature_geometry(&id, bowtie).unwrap().valid);

        let triangle = Geometry::Polygon(vec![vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [0.0, 0.0]]]);
        assert!(draw.update_feature_geometry(&id, triangle.clone()).unwrap().valid);
        assert_eq!(draw.get_snapshot_feature(&id).unwrap().geometry, triangle);
    }

    #[test]
    fn test_selected_features_use_select_style() {
        let mut select = SelectMode::default();
        select
            .update_options(&json!({
                "flags": { "polygon": { "feature": { "draggable": true } } },
                "styles": { "fillColor": "#ff0000" }
            }))
            .unwrap();
        let mut draw = engine(vec![PolygonMode::default().into(), select.into()]);
        draw.start().unwrap();
        let square = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]);
        let feature = Feature::new(FeatureId::from(1), square, properties([(property::MODE, json!("polygon"))]));
        draw.add_features(vec![feature]).unwrap();
        let id = FeatureId::from(1);

        draw.select_feature(&id).unwrap();
        assert_eq!(draw.get_mode(), "select");
        let rendered = &draw.adapter().rendered()[&id];
        assert_eq!(rendered.style.polygon_fill_color.to_string(), "#ff0000");

        draw.deselect_feature(&id).unwrap();
        let rendered = &draw.adapter().rendered()[&id];
        assert_eq!(rendered.style, FeatureStyle::default());
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut draw = engine(vec![PointMode::default().into()]);
        draw.start().unwrap();
        draw.set_mode("point").unwrap();
        let event = draw.adapter().pointer_event(0.0, 0.0);
        draw.handle_click(&event).unwrap();
        draw.clear().unwrap();
        assert!(draw.get_snapshot().is_empty());
        assert!(draw.adapter().rendered().is_empty());
    }
}
