//! Coordinate and line snapping.

use super::pointer::{pixel_distance, ClickBoundingBox};
use crate::adapter::DrawAdapter;
use crate::common::{property, DrawPointerEvent};
use crate::error::DrawResult;
use crate::feature::{properties, Feature, FeatureId, Geometry, Position};
use crate::geometry::{cartesian_distance, nearest_point_on_segment};
use crate::modes::ModeContext;
use crate::store::{GeoJsonStore, NewFeature, Origin};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::rc::Rc;

/// User supplied snapping. Receives the raw event and read-only access to
/// the store, returns the position to use or `None` for no snap.
pub type CustomSnap = Rc<dyn Fn(&DrawPointerEvent, &GeoJsonStore) -> Option<Position>>;

/// Which snapping strategies a mode applies, tried custom first, then
/// coordinate, then line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SnappingOptions {
    pub to_line: bool,
    pub to_coordinate: bool,
    pub to_custom: bool,
}

impl SnappingOptions {
    pub fn is_enabled(&self) -> bool {
        self.to_line || self.to_coordinate || self.to_custom
    }
}

/// Features of `mode` that snapping may target. Guidance features and the
/// feature being edited are never candidates.
fn candidates(
    store: &GeoJsonStore,
    adapter: &dyn DrawAdapter,
    event: &DrawPointerEvent,
    pointer_distance: f64,
    mode: &str,
    exclude: Option<&FeatureId>,
) -> Vec<Feature> {
    let bbox = ClickBoundingBox::new(pointer_distance).around(adapter, event);
    store.search(&bbox, |f| {
        f.mode() == Some(mode) && !f.is_guidance() && Some(&f.id) != exclude
    })
}

fn segments(geometry: &Geometry) -> Vec<(Position, Position)> {
    let pairs = |coords: &[Position]| coords.windows(2).map(|w| (w[0], w[1])).collect::<Vec<_>>();
    match geometry {
        Geometry::Point(_) => Vec::new(),
        Geometry::LineString(coords) => pairs(coords),
        Geometry::Polygon(rings) => rings.iter().flat_map(|r| pairs(r)).collect(),
    }
}

/// Nearest vertex of a same-mode feature within `pointer_distance` pixels.
pub fn snap_to_coordinate(
    store: &GeoJsonStore,
    adapter: &dyn DrawAdapter,
    event: &DrawPointerEvent,
    pointer_distance: f64,
    mode: &str,
    exclude: Option<&FeatureId>,
) -> Option<Position> {
    candidates(store, adapter, event, pointer_distance, mode, exclude)
        .iter()
        .flat_map(|f| f.geometry.editable_positions())
        .map(|p| (p, pixel_distance(adapter, event, p)))
        .filter(|(_, d)| *d <= pointer_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
}

/// Nearest point on any segment of a same-mode feature within
/// `pointer_distance` pixels.
pub fn snap_to_line(
    store: &GeoJsonStore,
    adapter: &dyn DrawAdapter,
    event: &DrawPointerEvent,
    pointer_distance: f64,
    mode: &str,
    exclude: Option<&FeatureId>,
) -> Option<Position> {
    let pointer = event.point();
    candidates(store, adapter, event, pointer_distance, mode, exclude)
        .iter()
        .flat_map(|f| segments(&f.geometry))
        .map(|(a, b)| {
            let (nearest, _) = nearest_point_on_segment(
                pointer,
                adapter.project(a[0], a[1]),
                adapter.project(b[0], b[1]),
            );
            (nearest, cartesian_distance(pointer, nearest))
        })
        .filter(|(_, d)| *d <= pointer_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .and_then(|(p, _)| adapter.unproject(p.x, p.y))
}

/// Apply the configured strategies in priority order.
#[allow(clippy::too_many_arguments)]
pub fn snap(
    options: &SnappingOptions,
    custom: Option<&CustomSnap>,
    store: &GeoJsonStore,
    adapter: &dyn DrawAdapter,
    event: &DrawPointerEvent,
    pointer_distance: f64,
    mode: &str,
    exclude: Option<&FeatureId>,
) -> Option<Position> {
    if options.to_custom {
        if let Some(snapped) = custom.and_then(|f| f(event, store)) {
            return Some(snapped);
        }
    }
    if options.to_coordinate {
        if let Some(snapped) = snap_to_coordinate(store, adapter, event, pointer_distance, mode, exclude) {
            return Some(snapped);
        }
    }
    if options.to_line {
        return snap_to_line(store, adapter, event, pointer_distance, mode, exclude);
    }
    None
}

/// Guidance point showing where the pointer would snap to.
#[derive(Debug, Clone, Default)]
pub struct SnappingPoint {
    id: Option<FeatureId>,
}

impl SnappingPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&FeatureId> {
        self.id.as_ref()
    }

    /// Show the indicator at `position`, creating it on first use.
    pub fn show(&mut self, ctx: &mut ModeContext<'_>, position: Position, mode: &str) -> DrawResult<()> {
        match &self.id {
            Some(id) if ctx.store.has(id) => {
                ctx.store
                    .update_geometry(vec![(id.clone(), Geometry::Point(position))], Origin::Interaction)
            }
            _ => {
                let entry = NewFeature::new(
                    Geometry::Point(position),
                    properties([
                        (property::MODE, json!(mode)),
                        (property::SNAPPING_POINT, json!(true)),
                    ]),
                );
                self.id = ctx.store.create(vec![entry], Origin::Interaction).into_iter().next();
                Ok(())
            }
        }
    }

    pub fn hide(&mut self, ctx: &mut ModeContext<'_>) {
        if let Some(id) = self.id.take() {
            ctx.store.delete_if_present(&[id], Origin::Interaction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;

    fn setup() -> (GeoJsonStore, HeadlessAdapter, FeatureId) {
        let mut store = GeoJsonStore::default();
        let ids = store.create(
            vec![NewFeature::new(
                Geometry::LineString(vec![[0.0, 0.0], [0.1, 0.0]]),
                properties([(property::MODE, json!("linestring"))]),
            )],
            Origin::Api,
        );
        (store, HeadlessAdapter::default(), ids[0].clone())
    }

    #[test]
    fn test_coordinate_snap_within_threshold() {
        let (store, adapter, _) = setup();
        // ~7 px away from the vertex at the origin
        let event = adapter.pointer_event(0.005, 0.0);
        let snapped = snap_to_coordinate(&store, &adapter, &event, 40.0, "linestring", None);
        assert_eq!(snapped, Some([0.0, 0.0]));
    }

    #[test]
    fn test_coordinate_snap_beyond_threshold() {
        let (store, adapter, _) = setup();
        // ~73 px away from both vertices
        let event = adapter.pointer_event(0.05, 0.0);
        assert_eq!(snap_to_coordinate(&store, &adapter, &event, 40.0, "linestring", None), None);
    }

    #[test]
    fn test_never_snaps_to_itself_or_other_modes() {
        let (store, adapter, id) = setup();
        let event = adapter.pointer_event(0.005, 0.0);
        assert_eq!(snap_to_coordinate(&store, &adapter, &event, 40.0, "linestring", Some(&id)), None);
        assert_eq!(snap_to_coordinate(&store, &adapter, &event, 40.0, "polygon", None), None);
    }

    #[test]
    fn test_line_snap_projects_onto_segment() {
        let (store, adapter, _) = setup();
        let event = adapter.pointer_event(0.05, 0.005);
        let snapped = snap_to_line(&store, &adapter, &event, 40.0, "linestring", None).unwrap();
        assert!((snapped[0] - 0.05).abs() < 1e-6);
        assert!(snapped[1].abs() < 1e-6);
    }

    #[test]
    fn test_custom_snap_takes_priority() {
        let (store, adapter, _) = setup();
        let options = SnappingOptions {
            to_coordinate: true,
            to_custom: true,
            ..Default::default()
        };
        let custom: CustomSnap = Rc::new(|_, _| Some([1.0, 1.0]));
        let event = adapter.pointer_event(0.005, 0.0);
        let snapped = snap(&options, Some(&custom), &store, &adapter, &event, 40.0, "linestring", None);
        assert_eq!(snapped, Some([1.0, 1.0]));
        let snapped = snap(&options, None, &store, &adapter, &event, 40.0, "linestring", None);
        assert_eq!(snapped, Some([0.0, 0.0]));
    }
}
