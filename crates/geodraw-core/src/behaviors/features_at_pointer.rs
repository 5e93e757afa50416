//! Hit testing stored features against a pointer position.

use super::pointer::{pixel_distance, ClickBoundingBox};
use crate::adapter::DrawAdapter;
use crate::common::{property, DrawPointerEvent};
use crate::feature::{Feature, Geometry, Position};
use crate::geometry::{point_in_polygon, point_to_segment_distance};
use crate::store::GeoJsonStore;
use serde::{Deserialize, Serialize};

/// Filters for [`features_at_pointer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureQueryOptions {
    pub pointer_distance: f64,
    pub ignore_select_features: bool,
    pub ignore_coordinate_points: bool,
    pub ignore_currently_drawing: bool,
    pub ignore_closing_points: bool,
    pub include_polygons_within_pointer_distance: bool,
}

impl Default for FeatureQueryOptions {
    fn default() -> Self {
        Self {
            pointer_distance: 30.0,
            ignore_select_features: true,
            ignore_coordinate_points: false,
            ignore_currently_drawing: false,
            ignore_closing_points: false,
            include_polygons_within_pointer_distance: false,
        }
    }
}

impl FeatureQueryOptions {
    fn excludes(&self, feature: &Feature) -> bool {
        (self.ignore_select_features
            && (feature.flag(property::SELECTION_POINT) || feature.flag(property::MID_POINT)))
            || (self.ignore_coordinate_points && feature.flag(property::COORDINATE_POINT))
            || (self.ignore_currently_drawing && feature.flag(property::CURRENTLY_DRAWING))
            || (self.ignore_closing_points && feature.flag(property::CLOSING_POINT))
    }
}

fn near_line(adapter: &dyn DrawAdapter, event: &DrawPointerEvent, coords: &[Position], radius: f64) -> bool {
    let pointer = event.point();
    coords.windows(2).any(|w| {
        let a = adapter.project(w[0][0], w[0][1]);
        let b = adapter.project(w[1][0], w[1][1]);
        point_to_segment_distance(pointer, a, b) < radius
    })
}

/// Features under the pointer, back to front. Points and lines match within
/// half the pointer distance; polygons match when they contain the pointer,
/// or when an edge is that close if the options allow it.
pub fn features_at_pointer(
    store: &GeoJsonStore,
    adapter: &dyn DrawAdapter,
    event: &DrawPointerEvent,
    options: &FeatureQueryOptions,
) -> Vec<Feature> {
    let radius = options.pointer_distance / 2.0;
    let bbox = ClickBoundingBox::new(radius).around(adapter, event);
    store.search(&bbox, |feature| {
        if options.excludes(feature) {
            return false;
        }
        match &feature.geometry {
            Geometry::Point(p) => pixel_distance(adapter, event, *p) < radius,
            Geometry::LineString(coords) => near_line(adapter, event, coords, radius),
            Geometry::Polygon(rings) => {
                point_in_polygon(event.position(), rings)
                    || (options.include_polygons_within_pointer_distance
                        && rings.iter().any(|ring| near_line(adapter, event, ring, radius)))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::feature::properties;
    use crate::store::{NewFeature, Origin};
    use serde_json::json;

    fn fixture() -> (GeoJsonStore, HeadlessAdapter) {
        let mut store = GeoJsonStore::default();
        let square = Geometry::Polygon(vec![vec![[0.0, 0.0], [0.1, 0.0], [0.1, 0.1], [0.0, 0.1], [0.0, 0.0]]]);
        store.create(
            vec![
                NewFeature::new(square, properties([(property::MODE, json!("polygon"))])),
                NewFeature::new(
                    Geometry::Point([0.0, 0.0]),
                    properties([(property::MODE, json!("select")), (property::SELECTION_POINT, json!(true))]),
                ),
            ],
            Origin::Api,
        );
        (store, HeadlessAdapter::default())
    }

    #[test]
    fn test_polygon_contains_pointer() {
        let (store, adapter) = fixture();
        let event = adapter.pointer_event(0.05, 0.05);
        let hits = features_at_pointer(&store, &adapter, &event, &FeatureQueryOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].mode(), Some("polygon"));
    }

    #[test]
    fn test_select_features_ignored_by_default() {
        let (store, adapter) = fixture();
        let event = adapter.pointer_event(0.0, 0.0);
        let hits = features_at_pointer(&store, &adapter, &event, &FeatureQueryOptions::default());
        assert!(hits.iter().all(|f| !f.flag(property::SELECTION_POINT)));

        let options = FeatureQueryOptions {
            ignore_select_features: false,
            ..Default::default()
        };
        let hits = features_at_pointer(&store, &adapter, &event, &options);
        assert!(hits.iter().any(|f| f.flag(property::SELECTION_POINT)));
    }

    #[test]
    fn test_polygon_edge_proximity_is_opt_in() {
        let (store, adapter) = fixture();
        let outside = adapter.project(0.05, 0.0);
        let event = adapter.pointer_event_at_pixel(outside.x, outside.y + 5.0).unwrap();
        let hits = features_at_pointer(&store, &adapter, &event, &FeatureQueryOptions::default());
        assert!(hits.is_empty());

        let options = FeatureQueryOptions {
            include_polygons_within_pointer_distance: true,
            ..Default::default()
        };
        assert_eq!(features_at_pointer(&store, &adapter, &event, &options).len(), 1);
    }
}
