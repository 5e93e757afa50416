//! GeoJSON feature model.

use crate::common::property;
use crate::geometry::Bounds;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A longitude/latitude pair in degrees.
pub type Position = [f64; 2];

/// Feature properties. Guidance and ownership metadata lives here too.
pub type Properties = serde_json::Map<String, Value>;

/// Unique identifier for a feature within one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(u64),
    String(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::String(value.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(value: String) -> Self {
        FeatureId::String(value)
    }
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        FeatureId::Number(value)
    }
}

impl From<&FeatureId> for Value {
    fn from(id: &FeatureId) -> Self {
        match id {
            FeatureId::Number(n) => Value::from(*n),
            FeatureId::String(s) => Value::from(s.clone()),
        }
    }
}

impl FeatureId {
    /// Parse an id stored inside a property value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(FeatureId::Number),
            Value::String(s) => Some(FeatureId::String(s.clone())),
            _ => None,
        }
    }
}

/// The geometry kinds the engine can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        };
        f.write_str(name)
    }
}

/// A GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
        }
    }

    /// Every position of the geometry, including closing ring positions.
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(coords) => coords.clone(),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
        }
    }

    /// The positions a user can grab: the outer ring without its closing
    /// position for polygons, every vertex for lines.
    pub fn editable_positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(coords) => coords.clone(),
            Geometry::Polygon(rings) => match rings.first() {
                Some(outer) if outer.len() > 1 => outer[..outer.len() - 1].to_vec(),
                Some(outer) => outer.clone(),
                None => Vec::new(),
            },
        }
    }

    /// Rebuild the geometry from a new list of editable positions, closing the
    /// outer ring again for polygons. Holes are preserved.
    pub fn with_editable_positions(&self, positions: Vec<Position>) -> Geometry {
        match self {
            Geometry::Point(_) => Geometry::Point(positions.first().copied().unwrap_or([0.0, 0.0])),
            Geometry::LineString(_) => Geometry::LineString(positions),
            Geometry::Polygon(rings) => {
                let mut outer = positions;
                if let Some(first) = outer.first().copied() {
                    outer.push(first);
                }
                let mut new_rings = vec![outer];
                new_rings.extend(rings.iter().skip(1).cloned());
                Geometry::Polygon(new_rings)
            }
        }
    }

    /// Apply a function to every position.
    pub fn map_positions(&self, mut f: impl FnMut(Position) -> Position) -> Geometry {
        match self {
            Geometry::Point(p) => Geometry::Point(f(*p)),
            Geometry::LineString(coords) => Geometry::LineString(coords.iter().map(|p| f(*p)).collect()),
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(|p| f(*p)).collect())
                    .collect(),
            ),
        }
    }

    /// Like [`Geometry::map_positions`] but the mapping may fail.
    pub fn try_map_positions(&self, mut f: impl FnMut(Position) -> Option<Position>) -> Option<Geometry> {
        Some(match self {
            Geometry::Point(p) => Geometry::Point(f(*p)?),
            Geometry::LineString(coords) => {
                Geometry::LineString(coords.iter().map(|p| f(*p)).collect::<Option<Vec<_>>>()?)
            }
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(|p| f(*p)).collect::<Option<Vec<_>>>())
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// Longitude/latitude bounding box.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_positions(&self.positions())
    }
}

/// A geometry with its properties, identified by a unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry, properties: Properties) -> Self {
        Self { id, geometry, properties }
    }

    /// Name of the mode that owns this feature.
    pub fn mode(&self) -> Option<&str> {
        self.properties.get(property::MODE).and_then(Value::as_str)
    }

    /// Read a boolean role flag, treating a missing key as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.properties.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether this feature is a helper feature rather than user-authored data.
    pub fn is_guidance(&self) -> bool {
        [
            property::MID_POINT,
            property::SELECTION_POINT,
            property::COORDINATE_POINT,
            property::CLOSING_POINT,
            property::SNAPPING_POINT,
        ]
        .iter()
        .any(|key| self.flag(key))
    }

    /// Ids stored in the `coordinatePointIds` back-reference, if any.
    pub fn coordinate_point_ids(&self) -> Vec<FeatureId> {
        self.properties
            .get(property::COORDINATE_POINT_IDS)
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(FeatureId::from_value).collect())
            .unwrap_or_default()
    }
}

/// Build a properties map from key/value pairs.
pub fn properties<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Properties {
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_serializes_as_geojson() {
        let feature = Feature::new(
            FeatureId::from("a"),
            Geometry::Point([1.0, 2.0]),
            properties([(property::MODE, json!("point"))]),
        );
        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Feature",
                "id": "a",
                "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                "properties": { "mode": "point" }
            })
        );
        let back: Feature = serde_json::from_value(value).unwrap();
        assert_eq!(back, feature);
    }

    #[test]
    fn test_numeric_ids_deserialize() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "id": 7,
            "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
            "properties": {}
        }))
        .unwrap();
        assert_eq!(feature.id, FeatureId::Number(7));
        assert_eq!(feature.geometry.geometry_type(), GeometryType::LineString);
    }

    #[test]
    fn test_editable_positions_skip_closing_vertex() {
        let polygon = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert_eq!(polygon.editable_positions().len(), 3);
        let rebuilt = polygon.with_editable_positions(polygon.editable_positions());
        assert_eq!(rebuilt, polygon);
    }

    #[test]
    fn test_guidance_flags() {
        let mut feature = Feature::new(FeatureId::from(1), Geometry::Point([0.0, 0.0]), Properties::new());
        assert!(!feature.is_guidance());
        feature.properties.insert(property::MID_POINT.into(), json!(true));
        assert!(feature.is_guidance());
    }
}
