//! In-memory adapter for tests and map-less hosts.

use super::{DrawAdapter, RenderChangeset, StyleResolver};
use crate::common::{Cursor, DrawPointerEvent};
use crate::feature::{Feature, FeatureId, Position};
use crate::geometry::{lng_lat_to_web_mercator, web_mercator_to_lng_lat, WEB_MERCATOR_RADIUS_M};
use crate::styling::FeatureStyle;
use kurbo::{Point, Vec2};
use std::collections::HashMap;
use std::f64::consts::PI;

/// A Web Mercator viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Position,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    pub tile_size: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 10.0,
            width: 1000.0,
            height: 1000.0,
            tile_size: 512.0,
        }
    }
}

impl Viewport {
    /// Screen pixels per Web Mercator meter.
    fn scale(&self) -> f64 {
        self.tile_size * 2f64.powf(self.zoom) / (2.0 * PI * WEB_MERCATOR_RADIUS_M)
    }

    fn half_size(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// What the adapter last drew for a feature.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub feature: Feature,
    pub style: FeatureStyle,
}

/// Records everything it is asked to draw instead of drawing it.
#[derive(Debug, Clone)]
pub struct HeadlessAdapter {
    pub viewport: Viewport,
    precision: u32,
    cursor: Cursor,
    double_click_to_zoom: bool,
    draggable: bool,
    registered: bool,
    rendered: HashMap<FeatureId, RenderedFeature>,
    render_calls: usize,
}

impl Default for HeadlessAdapter {
    fn default() -> Self {
        Self::new(Viewport::default(), 9)
    }
}

impl HeadlessAdapter {
    pub fn new(viewport: Viewport, precision: u32) -> Self {
        Self {
            viewport,
            precision,
            cursor: Cursor::Unset,
            double_click_to_zoom: true,
            draggable: true,
            registered: false,
            rendered: HashMap::new(),
            render_calls: 0,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn double_click_to_zoom(&self) -> bool {
        self.double_click_to_zoom
    }

    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn rendered(&self) -> &HashMap<FeatureId, RenderedFeature> {
        &self.rendered
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls
    }

    /// A left-button pointer event at a geographic position.
    pub fn pointer_event(&self, lng: f64, lat: f64) -> DrawPointerEvent {
        let p = self.project(lng, lat);
        DrawPointerEvent::new(lng, lat, p.x, p.y)
    }

    /// A left-button pointer event at a container pixel position.
    pub fn pointer_event_at_pixel(&self, x: f64, y: f64) -> Option<DrawPointerEvent> {
        let [lng, lat] = self.unproject(x, y)?;
        Some(DrawPointerEvent::new(lng, lat, x, y))
    }
}

impl DrawAdapter for HeadlessAdapter {
    fn project(&self, lng: f64, lat: f64) -> Point {
        let scale = self.viewport.scale();
        let m = lng_lat_to_web_mercator([lng, lat]);
        let c = lng_lat_to_web_mercator(self.viewport.center);
        let offset = Vec2::new((m.x - c.x) * scale, (c.y - m.y) * scale);
        Point::ZERO + self.viewport.half_size() + offset
    }

    fn unproject(&self, x: f64, y: f64) -> Option<Position> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let scale = self.viewport.scale();
        let c = lng_lat_to_web_mercator(self.viewport.center);
        let offset = Point::new(x, y) - (Point::ZERO + self.viewport.half_size());
        let m = Point::new(c.x + offset.x / scale, c.y - offset.y / scale);
        Some(web_mercator_to_lng_lat(m))
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn set_double_click_to_zoom(&mut self, enabled: bool) {
        self.double_click_to_zoom = enabled;
    }

    fn set_draggability(&mut self, enabled: bool) {
        self.draggable = enabled;
    }

    fn coordinate_precision(&self) -> u32 {
        self.precision
    }

    fn register(&mut self) {
        self.registered = true;
    }

    fn unregister(&mut self) {
        self.registered = false;
        self.clear();
    }

    fn clear(&mut self) {
        self.rendered.clear();
        self.cursor = Cursor::Unset;
    }

    fn render(&mut self, changes: &RenderChangeset, styles: &StyleResolver<'_>) {
        self.render_calls += 1;
        for id in &changes.deleted_ids {
            self.rendered.remove(id);
        }
        for feature in changes.created.iter().chain(&changes.updated).chain(&changes.unchanged) {
            let style = styles(feature);
            self.rendered.insert(
                feature.id.clone(),
                RenderedFeature {
                    feature: feature.clone(),
                    style,
                },
            );
        }
    }
}
