//! Click-by-click polygon drawing.

// Use web-time on WASM, std::time otherwise
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};
#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

use super::editable::EditableDrag;
use super::{
    default_pointer_distance, drawing_properties, merge_options, validate_owned, DrawMode, DrawingCursors,
    KeyEvents, ModeBase, ModeContext,
};
use crate::behaviors::{coordinate_point, snap, ClosingPoints, CustomSnap, SnappingOptions, SnappingPoint};
use crate::common::{
    property, DrawKeyboardEvent, DrawPointerEvent, FinishAction, ModeType, MouseButton, UpdateType,
};
use crate::error::DrawResult;
use crate::feature::{Feature, FeatureId, Geometry, GeometryType, Position};
use crate::geometry::ensure_right_hand_rule;
use crate::store::{NewFeature, Origin};
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{compose, AreaLimits, Validation, ValidationContext, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PolygonOptions {
    pub pointer_distance: f64,
    pub snapping: SnappingOptions,
    pub key_events: KeyEvents,
    pub cursors: DrawingCursors,
    /// Allow dragging the vertices of finished polygons.
    pub editable: bool,
    pub show_coordinate_points: bool,
    /// Close the polygon as soon as the pointer reaches the first vertex.
    pub auto_close: bool,
    /// Milliseconds after an auto-close during which clicks are ignored.
    pub auto_close_timeout: u64,
    /// Geodesic area bounds in square meters.
    pub area_limits: AreaLimits,
    pub styles: StyleOptions,
}

impl Default for PolygonOptions {
    fn default() -> Self {
        Self {
            pointer_distance: default_pointer_distance(),
            snapping: SnappingOptions::default(),
            key_events: KeyEvents::default(),
            cursors: DrawingCursors::default(),
            editable: false,
            show_coordinate_points: false,
            auto_close: false,
            auto_close_timeout: 500,
            area_limits: AreaLimits::default(),
            styles: StyleOptions::default(),
        }
    }
}

pub struct PolygonMode {
    base: ModeBase,
    options: PolygonOptions,
    validation: Option<Validator>,
    custom_snap: Option<CustomSnap>,
    current_id: Option<FeatureId>,
    /// Committed vertices of the polygon being drawn.
    click_count: usize,
    closing_points: ClosingPoints,
    snapping_point: SnappingPoint,
    editable: EditableDrag,
    auto_closed_at: Option<Instant>,
}

impl Default for PolygonMode {
    fn default() -> Self {
        Self::new(PolygonOptions::default())
    }
}

impl PolygonMode {
    pub fn new(options: PolygonOptions) -> Self {
        Self {
            base: ModeBase::new("polygon"),
            closing_points: ClosingPoints::new(options.pointer_distance),
            editable: EditableDrag::new(options.pointer_distance),
            options,
            validation: None,
            custom_snap: None,
            current_id: None,
            click_count: 0,
            snapping_point: SnappingPoint::new(),
            auto_closed_at: None,
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

    /// Snap with a user function, tried before coordinate and line snapping.
    pub fn with_custom_snapping(mut self, custom: CustomSnap) -> Self {
        self.options.snapping.to_custom = true;
        self.custom_snap = Some(custom);
        self
    }

    fn snapped(&self, ctx: &ModeContext<'_>, event: &DrawPointerEvent, exclude: Option<&FeatureId>) -> Option<Position> {
        if !self.options.snapping.is_enabled() {
            return None;
        }
        snap(
            &self.options.snapping,
            self.custom_snap.as_ref(),
            &*ctx.store,
            &*ctx.adapter,
            event,
            self.options.pointer_distance,
            self.name(),
            exclude,
        )
    }

    fn outer_ring(ctx: &ModeContext<'_>, id: &FeatureId) -> DrawResult<Vec<Position>> {
        match ctx.store.get_geometry_copy(id)? {
            Geometry::Polygon(mut rings) if !rings.is_empty() => Ok(rings.swap_remove(0)),
            _ => Ok(Vec::new()),
        }
    }

    fn write_ring(ctx: &mut ModeContext<'_>, id: &FeatureId, ring: Vec<Position>) -> DrawResult<()> {
        ctx.store
            .update_geometry(vec![(id.clone(), Geometry::Polygon(vec![ring]))], Origin::Interaction)
    }

    /// Validate `ring` as the geometry of the drawn feature.
    fn check(&self, ctx: &ModeContext<'_>, id: &FeatureId, ring: Vec<Position>, update_type: UpdateType) -> DrawResult<bool> {
        let mut feature = ctx.store.copy(id)?;
        feature.geometry = Geometry::Polygon(vec![ring]);
        let verdict = self.validate_feature(&feature, &ctx.validation_context(update_type));
        if !verdict.valid {
            log::debug!("polygon {id} rejected: {:?}", verdict.reason);
        }
        Ok(verdict.valid)
    }

    fn begin(&mut self, ctx: &mut ModeContext<'_>, position: Position) -> DrawResult<()> {
        let entry = NewFeature::new(
            Geometry::Polygon(vec![vec![position; 4]]),
            drawing_properties(self.name()),
        );
        self.current_id = ctx.store.create(vec![entry], Origin::Interaction).into_iter().next();
        self.click_count = 1;
        self.base.set_drawing()?;
        ctx.adapter.set_double_click_to_zoom(false);
        Ok(())
    }

    fn close(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        if self.click_count < 3 {
            return Ok(());
        }
        let mut ring = Self::outer_ring(ctx, &id)?;
        if ring.len() < 5 {
            return Ok(());
        }
        // Drop the vertex following the pointer
        ring.remove(ring.len() - 2);

        let mut feature = ctx.store.copy(&id)?;
        feature.geometry = Geometry::Polygon(vec![ring]);
        if let Some(corrected) = ensure_right_hand_rule(&feature.geometry) {
            feature.geometry = corrected;
        }
        let verdict = self.validate_feature(&feature, &ctx.validation_context(UpdateType::Finish));
        if !verdict.valid {
            log::debug!("polygon {id} not closed: {:?}", verdict.reason);
            return Ok(());
        }

        ctx.store
            .update_geometry(vec![(id.clone(), feature.geometry)], Origin::Interaction)?;
        ctx.store
            .update_property(vec![(id.clone(), property::CURRENTLY_DRAWING, None)], Origin::Interaction)?;
        self.closing_points.delete(ctx);
        self.snapping_point.hide(ctx);
        if self.options.show_coordinate_points {
            coordinate_point::create_or_update(ctx, &id)?;
        }

        self.current_id = None;
        self.click_count = 0;
        self.base.settle();
        ctx.adapter.set_double_click_to_zoom(true);
        ctx.set_cursor(self.options.cursors.start);
        ctx.finish(id, self.base.name(), FinishAction::Draw);
        Ok(())
    }

    fn in_auto_close_guard(&mut self) -> bool {
        match self.auto_closed_at.take() {
            Some(at) if at.elapsed() < Duration::from_millis(self.options.auto_close_timeout) => {
                self.auto_closed_at = Some(at);
                true
            }
            _ => false,
        }
    }
}

impl DrawMode for PolygonMode {
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
        self.closing_points.delete(ctx);
        self.snapping_point.hide(ctx);
        self.editable.stop();
        self.click_count = 0;
        self.auto_closed_at = None;
        self.base.settle();
        Ok(())
    }

    fn on_click(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if event.button != MouseButton::Left || self.in_auto_close_guard() {
            return Ok(());
        }
        let current = self.current_id.clone();
        let position = ctx.limit(self.snapped(ctx, event, current.as_ref()).unwrap_or(event.position()));

        let Some(id) = current else {
            return self.begin(ctx, position);
        };
        let ring = Self::outer_ring(ctx, &id)?;
        let Some(&first) = ring.first() else {
            return Ok(());
        };

        match self.click_count {
            1 => {
                Self::write_ring(ctx, &id, vec![first, position, position, first])?;
                self.click_count = 2;
            }
            2 => {
                let candidate = vec![first, ring[1], position, first];
                if !self.check(ctx, &id, candidate, UpdateType::Commit)? {
                    return Ok(());
                }
                Self::write_ring(ctx, &id, vec![first, ring[1], position, position, first])?;
                self.closing_points.create(ctx, &[first, position], self.base.name());
                self.click_count = 3;
            }
            _ => {
                if self.closing_points.hit_test(ctx, event).any() {
                    return self.close(ctx);
                }
                let committed = &ring[..ring.len().saturating_sub(2)];
                let mut candidate = committed.to_vec();
                candidate.extend([position, first]);
                if !self.check(ctx, &id, candidate, UpdateType::Commit)? {
                    return Ok(());
                }
                let mut next = committed.to_vec();
                next.extend([position, position, first]);
                Self::write_ring(ctx, &id, next)?;
                self.closing_points.update(ctx, &[first, position])?;
                self.click_count += 1;
            }
        }
        Ok(())
    }

    fn on_mouse_move(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.base.pointer_moved(&*ctx.adapter, event) {
            return Ok(());
        }
        let current = self.current_id.clone();
        let snapped = self.snapped(ctx, event, current.as_ref());
        match snapped {
            Some(position) => self.snapping_point.show(ctx, position, self.base.name())?,
            None => self.snapping_point.hide(ctx),
        }

        let Some(id) = current else {
            ctx.set_cursor(self.options.cursors.start);
            return Ok(());
        };
        let position = ctx.limit(snapped.unwrap_or(event.position()));
        let mut ring = Self::outer_ring(ctx, &id)?;
        let Some(&first) = ring.first() else {
            return Ok(());
        };

        let updated = match self.click_count {
            1 => vec![first, position, position, first],
            2 => vec![first, ring[1], position, first],
            _ => {
                let hit = self.closing_points.hit_test(ctx, event);
                ctx.set_cursor(if hit.any() {
                    self.options.cursors.close
                } else {
                    self.options.cursors.start
                });
                if self.options.auto_close && hit.is_closing {
                    self.close(ctx)?;
                    if self.current_id.is_none() {
                        self.auto_closed_at = Some(Instant::now());
                    }
                    return Ok(());
                }
                let moving = ring.len() - 2;
                ring[moving] = position;
                ring
            }
        };
        if self.check(ctx, &id, updated.clone(), UpdateType::Provisional)? {
            Self::write_ring(ctx, &id, updated)?;
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

    fn on_drag_start(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if !self.options.editable || self.current_id.is_some() {
            return Ok(());
        }
        if self.editable.start(ctx, event, self.base.name()) {
            ctx.set_cursor(self.options.cursors.drag_start);
            ctx.adapter.set_draggability(false);
        }
        Ok(())
    }

    fn on_drag(&mut self, event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        let Some(id) = self.editable.feature_id().cloned() else {
            return Ok(());
        };
        let target = self.snapped(ctx, event, Some(&id)).unwrap_or(event.position());
        self.editable
            .drag(ctx, target, &|f: &Feature, v: &ValidationContext<'_>| self.validate_feature(f, v))?;
        Ok(())
    }

    fn on_drag_end(&mut self, _event: &DrawPointerEvent, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if let Some(id) = self.editable.stop() {
            ctx.set_cursor(self.options.cursors.drag_end);
            ctx.adapter.set_draggability(true);
            ctx.finish(id, self.base.name(), FinishAction::DragCoordinate);
        }
        Ok(())
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
        let options: PolygonOptions = merge_options(self.name(), &self.options, partial)?;
        self.closing_points.set_pointer_distance(options.pointer_distance);
        self.editable.set_pointer_distance(options.pointer_distance);
        self.options = options;
        Ok(())
    }

    fn options(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }

    fn after_feature_added(&mut self, feature: &Feature, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        if self.options.show_coordinate_points {
            coordinate_point::create_or_update(ctx, &feature.id)?;
        }
        Ok(())
    }

    fn after_feature_updated(&mut self, feature: &Feature, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.after_feature_added(feature, ctx)
    }

    fn drawing_feature_id(&self) -> Option<&FeatureId> {
        self.current_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::common::DrawKeyboardEvent;
    use crate::events::DrawEvent;
    use crate::store::GeoJsonStore;
    use std::collections::HashMap;

    struct Harness {
        store: GeoJsonStore,
        adapter: HeadlessAdapter,
        modes: HashMap<String, super::super::Mode>,
        events: Vec<DrawEvent>,
        mode: PolygonMode,
    }

    impl Harness {
        fn new(mode: PolygonMode) -> Self {
            let mut harness = Self {
                store: GeoJsonStore::default(),
                adapter: HeadlessAdapter::default(),
                modes: HashMap::new(),
                events: Vec::new(),
                mode,
            };
            harness.mode.register().unwrap();
            harness.with(|mode, ctx| mode.start(ctx));
            harness
        }

        fn with(&mut self, f: impl FnOnce(&mut PolygonMode, &mut ModeContext<'_>) -> DrawResult<()>) {
            let mut ctx = ModeContext::new(&mut self.store, &mut self.adapter, &self.modes, &mut self.events);
            f(&mut self.mode, &mut ctx).unwrap();
            ctx.flush_store_changes();
        }

        fn click(&mut self, lng: f64, lat: f64) {
            let event = self.adapter.pointer_event(lng, lat);
            self.with(|mode, ctx| {
                mode.on_mouse_move(&event, ctx)?;
                mode.on_click(&event, ctx)
            });
        }

        fn key(&mut self, key: &str) {
            let event = DrawKeyboardEvent::new(key);
            self.with(|mode, ctx| mode.on_key_up(&event, ctx));
        }

        fn polygons(&self) -> Vec<Feature> {
            self.store
                .copy_all_where(|f| matches!(f.geometry, Geometry::Polygon(_)))
        }
    }

    #[test]
    fn test_draws_square_and_closes_on_first_point() {
        let mut h = Harness::new(PolygonMode::default());
        h.click(0.0, 0.0);
        h.click(0.1, 0.0);
        h.click(0.1, 0.1);
        assert_eq!(h.store.size(), 3, "polygon plus two closing points");
        h.click(0.0, 0.1);
        h.click(0.0, 0.0);

        let polygons = h.polygons();
        assert_eq!(polygons.len(), 1);
        let Geometry::Polygon(rings) = &polygons[0].geometry else {
            unreachable!()
        };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0].first(), rings[0].last());
        assert_eq!(polygons[0].mode(), Some("polygon"));
        assert!(!polygons[0].flag(property::CURRENTLY_DRAWING));
        assert_eq!(h.store.size(), 1, "closing points removed");
        assert!(h.events.iter().any(|e| matches!(e, DrawEvent::Finish { .. })));
        assert_eq!(h.mode.state(), super::super::ModeState::Started);
    }

    #[test]
    fn test_enter_finishes_and_escape_discards() {
        let mut h = Harness::new(PolygonMode::default());
        h.click(0.0, 0.0);
        h.click(0.1, 0.0);
        h.click(0.1, 0.1);
        h.key("Enter");
        assert_eq!(h.polygons().len(), 1);
        assert!(h.mode.drawing_feature_id().is_none());

        h.click(1.0, 1.0);
        h.click(1.1, 1.0);
        h.key("Escape");
        assert_eq!(h.polygons().len(), 1);
        assert_eq!(h.store.size(), 1);
    }

    #[test]
    fn test_closed_ring_follows_right_hand_rule() {
        let mut h = Harness::new(PolygonMode::default());
        // Clockwise clicks
        h.click(0.0, 0.0);
        h.click(0.0, 0.1);
        h.click(0.1, 0.1);
        h.click(0.1, 0.0);
        h.key("Enter");
        let Geometry::Polygon(rings) = &h.polygons()[0].geometry else {
            unreachable!()
        };
        assert!(crate::geometry::ring_signed_area(&rings[0]) > 0.0);
    }

    #[test]
    fn test_self_intersecting_vertex_refused() {
        let mut h = Harness::new(PolygonMode::default());
        h.click(0.0, 0.0);
        h.click(0.1, 0.0);
        h.click(0.1, 0.1);
        h.click(0.0, 0.1);
        // Crosses the edge from (0.1, 0) to (0.1, 0.1)
        h.click(0.2, 0.05);
        let ring = PolygonMode::outer_ring(
            &ModeContext::new(&mut h.store, &mut h.adapter, &h.modes, &mut h.events),
            h.mode.drawing_feature_id().unwrap(),
        )
        .unwrap();
        assert_eq!(ring.len(), 6);
    }

    #[test]
    fn test_user_validation_blocks_finish() {
        let reject: Validator = std::rc::Rc::new(|_, ctx| {
            if ctx.update_type == UpdateType::Finish {
                Validation::invalid("nope")
            } else {
                Validation::valid()
            }
        });
        let mut h = Harness::new(PolygonMode::default().with_validation(reject));
        h.click(0.0, 0.0);
        h.click(0.1, 0.0);
        h.click(0.1, 0.1);
        h.key("Enter");
        assert!(h.mode.drawing_feature_id().is_some());
        assert!(!h.events.iter().any(|e| matches!(e, DrawEvent::Finish { .. })));
    }

    #[test]
    fn test_sub_pixel_moves_do_not_redraw() {
        let mut h = Harness::new(PolygonMode::default());
        h.click(0.0, 0.0);
        h.events.clear();

        for step in 0..50 {
            let event = h.adapter.pointer_event(0.1 + f64::from(step) * 1e-9, 0.0);
            h.with(|mode, ctx| mode.on_mouse_move(&event, ctx));
        }
        let changes = h
            .events
            .iter()
            .filter(|e| matches!(e, DrawEvent::Change { .. }))
            .count();
        assert_eq!(changes, 1);

        let far = h.adapter.pointer_event(0.2, 0.0);
        h.with(|mode, ctx| mode.on_mouse_move(&far, ctx));
        let Geometry::Polygon(rings) = &h.polygons()[0].geometry else {
            unreachable!()
        };
        assert_eq!(rings[0][1], [0.2, 0.0]);
    }

    #[test]
    fn test_area_limits_gate_finish() {
        let mut mode = PolygonMode::default();
        mode.update_options(&serde_json::json!({ "areaLimits": { "minArea": 1.0e9 } }))
            .unwrap();
        let mut h = Harness::new(mode);
        // About 62 km^2
        h.click(0.0, 0.0);
        h.click(0.1, 0.0);
        h.click(0.1, 0.1);
        h.key("Enter");
        assert!(h.mode.drawing_feature_id().is_some());

        h.mode
            .update_options(&serde_json::json!({ "areaLimits": { "minArea": 1.0e6 } }))
            .unwrap();
        h.key("Enter");
        assert!(h.mode.drawing_feature_id().is_none());
        assert_eq!(h.polygons().len(), 1);
    }

    #[test]
    fn test_update_options_rejects_unknown_keys() {
        let mut mode = PolygonMode::default();
        mode.update_options(&serde_json::json!({ "pointerDistance": 10.0 })).unwrap();
        assert_eq!(mode.options()["pointerDistance"], 10.0);
        assert!(mode.update_options(&serde_json::json!({ "nope": true })).is_err());
    }
}
