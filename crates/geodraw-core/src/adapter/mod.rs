//! The boundary between the engine and a map renderer.
//!
//! An adapter converts between geographic and screen coordinates, applies
//! UI side effects (cursor, double-click zoom, map dragging) and draws
//! styled features. The host feeds normalized input events to
//! [`GeoDraw`](crate::GeoDraw) through its `handle_*` methods.

mod headless;

pub use headless::{HeadlessAdapter, RenderedFeature, Viewport};

use crate::common::Cursor;
use crate::feature::{Feature, FeatureId, Position};
use crate::styling::FeatureStyle;
use kurbo::Point;

/// Diff of features to draw, computed from store changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderChangeset {
    pub created: Vec<Feature>,
    pub updated: Vec<Feature>,
    pub deleted_ids: Vec<FeatureId>,
    pub unchanged: Vec<Feature>,
}

impl RenderChangeset {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted_ids.is_empty()
    }
}

/// Resolves the style of any feature, dispatching on its owning mode.
pub type StyleResolver<'a> = dyn Fn(&Feature) -> FeatureStyle + 'a;

/// Contract a map renderer implements for the engine.
pub trait DrawAdapter {
    /// Geographic position to container pixels.
    fn project(&self, lng: f64, lat: f64) -> Point;

    /// Container pixels to a geographic position, if the point is on the map.
    fn unproject(&self, x: f64, y: f64) -> Option<Position>;

    /// Geographic position under a container pixel position of a raw event.
    fn lng_lat_from_event(&self, x: f64, y: f64) -> Option<Position> {
        self.unproject(x, y)
    }

    fn set_cursor(&mut self, cursor: Cursor);

    fn set_double_click_to_zoom(&mut self, enabled: bool);

    /// Lock or unlock map panning while a feature is being dragged.
    fn set_draggability(&mut self, enabled: bool);

    /// Decimal places coordinates are limited to.
    fn coordinate_precision(&self) -> u32;

    /// Called once when the engine starts listening.
    fn register(&mut self);

    /// Called when the engine stops.
    fn unregister(&mut self);

    /// Remove everything the adapter has drawn.
    fn clear(&mut self);

    fn render(&mut self, changes: &RenderChangeset, styles: &StyleResolver<'_>);
}
