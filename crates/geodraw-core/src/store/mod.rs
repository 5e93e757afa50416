//! The feature store: single source of truth for every drawn geometry.
//!
//! All reads hand out detached copies. Every mutation appends a
//! [`StoreChange`] to an in-order journal which the orchestrator drains to
//! render and to notify listeners.

mod id_strategy;
mod spatial_index;

pub use id_strategy::{IdStrategy, IncrementingStrategy, UuidStrategy};
pub use spatial_index::{SpatialIndex, SpatialIndexStats};

use crate::common::property;
use crate::error::{DrawError, DrawResult};
use crate::feature::{Feature, FeatureId, Geometry, Properties};
use crate::geometry::{point_in_polygon, segments_intersect, Bounds};
use crate::validation::{FeatureValidationResult, Validation};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

// Use web-time on WASM, std::time otherwise
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// Who issued a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The public API (`add_features`, `remove_features`, ...).
    Api,
    /// Mode or behavior logic reacting to user input.
    Interaction,
}

/// One journaled mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    pub ids: Vec<FeatureId>,
    pub kind: ChangeKind,
    pub origin: Origin,
}

/// A geometry and properties waiting for an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeature {
    pub geometry: Geometry,
    pub properties: Properties,
}

impl NewFeature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self { geometry, properties }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Exact test of a geometry against a box, used after the index narrows
/// candidates down.
fn geometry_intersects_bounds(geometry: &Geometry, bounds: &Bounds) -> bool {
    let inside = |p: &[f64; 2]| bounds.contains_point(p[0], p[1]);
    let ring = bounds.to_ring();
    let edges: Vec<(Point, Point)> = ring
        .windows(2)
        .map(|w| (Point::new(w[0][0], w[0][1]), Point::new(w[1][0], w[1][1])))
        .collect();
    let crosses_box = |coords: &[[f64; 2]]| {
        coords.windows(2).any(|w| {
            let a = Point::new(w[0][0], w[0][1]);
            let b = Point::new(w[1][0], w[1][1]);
            edges.iter().any(|(c, d)| segments_intersect(a, b, *c, *d))
        })
    };

    match geometry {
        Geometry::Point(p) => inside(p),
        Geometry::LineString(coords) => coords.iter().any(inside) || crosses_box(coords),
        Geometry::Polygon(rings) => {
            let (cx, cy) = bounds.center();
            rings.iter().flatten().any(inside)
                || rings.iter().any(|ring| crosses_box(ring))
                || point_in_polygon([cx, cy], rings)
        }
    }
}

/// Feature storage with a spatial index and a change journal.
pub struct GeoJsonStore {
    features: HashMap<FeatureId, Feature>,
    /// Insertion order (back to front), keyed by z position.
    z_order: BTreeMap<u64, FeatureId>,
    z_positions: HashMap<FeatureId, u64>,
    next_z: u64,
    index: SpatialIndex,
    id_strategy: Box<dyn IdStrategy>,
    tracked: bool,
    changes: Vec<StoreChange>,
}

impl Default for GeoJsonStore {
    fn default() -> Self {
        Self::new(Box::new(UuidStrategy), true)
    }
}

impl std::fmt::Debug for GeoJsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoJsonStore")
            .field("size", &self.features.len())
            .field("tracked", &self.tracked)
            .field("pending_changes", &self.changes.len())
            .finish()
    }
}

impl GeoJsonStore {
    /// Create an empty store. With `tracked` set, `createdAt` and `updatedAt`
    /// timestamps are stamped on features.
    pub fn new(id_strategy: Box<dyn IdStrategy>, tracked: bool) -> Self {
        Self {
            features: HashMap::new(),
            z_order: BTreeMap::new(),
            z_positions: HashMap::new(),
            next_z: 0,
            index: SpatialIndex::default(),
            id_strategy,
            tracked,
            changes: Vec::new(),
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Produce an unused id without inserting anything.
    pub fn get_id(&mut self) -> FeatureId {
        loop {
            let id = self.id_strategy.next_id();
            if !self.features.contains_key(&id) {
                return id;
            }
        }
    }

    /// Whether `id` is acceptable to the configured id strategy.
    pub fn is_valid_id(&self, id: &FeatureId) -> bool {
        self.id_strategy.is_valid_id(id)
    }

    pub fn has(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    pub fn size(&self) -> usize {
        self.features.len()
    }

    fn journal(&mut self, ids: Vec<FeatureId>, kind: ChangeKind, origin: Origin) {
        if ids.is_empty() {
            return;
        }
        log::debug!("store {:?} ({:?}): {} feature(s)", kind, origin, ids.len());
        self.changes.push(StoreChange { ids, kind, origin });
    }

    /// Drain the change journal in mutation order.
    pub fn take_changes(&mut self) -> Vec<StoreChange> {
        std::mem::take(&mut self.changes)
    }

    fn insert(&mut self, feature: Feature) {
        self.index.insert(feature.id.clone(), feature.geometry.bounds());
        let z = self.next_z;
        self.next_z += 1;
        self.z_order.insert(z, feature.id.clone());
        self.z_positions.insert(feature.id.clone(), z);
        self.features.insert(feature.id.clone(), feature);
    }

    fn stamp(&self, properties: &mut Properties, created: bool) {
        if !self.tracked {
            return;
        }
        let now = Value::from(now_millis());
        if created && !properties.contains_key(property::CREATED_AT) {
            properties.insert(property::CREATED_AT.into(), now.clone());
        }
        properties.insert(property::UPDATED_AT.into(), now);
    }

    /// Insert new features, assigning ids from the id strategy.
    pub fn create(&mut self, entries: Vec<NewFeature>, origin: Origin) -> Vec<FeatureId> {
        let mut ids = Vec::with_capacity(entries.len());
        for NewFeature { geometry, mut properties } in entries {
            let id = self.get_id();
            self.stamp(&mut properties, true);
            self.insert(Feature::new(id.clone(), geometry, properties));
            ids.push(id);
        }
        self.journal(ids.clone(), ChangeKind::Create, origin);
        ids
    }

    /// Bulk insert externally built features. Each feature is checked against
    /// the id strategy and `validate`; failures are reported and skipped. A
    /// duplicate id (against the store or within the batch) aborts the whole
    /// load before anything is inserted.
    pub fn load(
        &mut self,
        features: Vec<Feature>,
        mut validate: impl FnMut(&Feature) -> Validation,
    ) -> DrawResult<Vec<FeatureValidationResult>> {
        let mut seen = HashSet::new();
        for feature in &features {
            if self.features.contains_key(&feature.id) || !seen.insert(&feature.id) {
                return Err(DrawError::DuplicateFeatureId(feature.id.clone()));
            }
        }

        let mut results = Vec::with_capacity(features.len());
        let mut created = Vec::new();
        for mut feature in features {
            let verdict = if !self.id_strategy.is_valid_id(&feature.id) {
                Validation::invalid(format!("Feature has invalid id {}", feature.id))
            } else {
                validate(&feature)
            };
            results.push(FeatureValidationResult::new(feature.id.clone(), &verdict));
            if !verdict.valid {
                log::debug!("rejected feature {}: {:?}", feature.id, verdict.reason);
                continue;
            }
            self.stamp(&mut feature.properties, true);
            created.push(feature.id.clone());
            self.insert(feature);
        }
        self.journal(created, ChangeKind::Create, Origin::Api);
        Ok(results)
    }

    fn require(&self, id: &FeatureId) -> DrawResult<&Feature> {
        self.features
            .get(id)
            .ok_or_else(|| DrawError::FeatureNotFound(id.clone()))
    }

    /// Replace the geometry of one or more features as a single change. Every
    /// id and geometry type is checked before anything is written.
    pub fn update_geometry(&mut self, updates: Vec<(FeatureId, Geometry)>, origin: Origin) -> DrawResult<()> {
        for (id, geometry) in &updates {
            let existing = self.require(id)?;
            let expected = existing.geometry.geometry_type();
            let actual = geometry.geometry_type();
            if expected != actual {
                return Err(DrawError::GeometryTypeMismatch {
                    id: id.clone(),
                    expected,
                    actual,
                });
            }
        }

        let mut ids = Vec::with_capacity(updates.len());
        for (id, geometry) in updates {
            self.index.insert(id.clone(), geometry.bounds());
            let tracked = self.tracked;
            if let Some(feature) = self.features.get_mut(&id) {
                feature.geometry = geometry;
                if tracked {
                    feature
                        .properties
                        .insert(property::UPDATED_AT.into(), Value::from(now_millis()));
                }
            }
            ids.push(id);
        }
        self.journal(ids, ChangeKind::Update, origin);
        Ok(())
    }

    /// Set (`Some`) or remove (`None`) properties on one or more features as a
    /// single change.
    pub fn update_property(
        &mut self,
        updates: Vec<(FeatureId, &str, Option<Value>)>,
        origin: Origin,
    ) -> DrawResult<()> {
        for (id, _, _) in &updates {
            self.require(id)?;
        }

        let mut ids: Vec<FeatureId> = Vec::new();
        for (id, key, value) in updates {
            let tracked = self.tracked;
            if let Some(feature) = self.features.get_mut(&id) {
                match value {
                    Some(value) => {
                        feature.properties.insert(key.to_string(), value);
                    }
                    None => {
                        feature.properties.remove(key);
                    }
                }
                if tracked {
                    feature
                        .properties
                        .insert(property::UPDATED_AT.into(), Value::from(now_millis()));
                }
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.journal(ids, ChangeKind::Update, origin);
        Ok(())
    }

    /// Remove features. Fails without removing anything if any id is absent.
    pub fn delete(&mut self, ids: &[FeatureId], origin: Origin) -> DrawResult<()> {
        for id in ids {
            self.require(id)?;
        }
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if self.features.remove(id).is_some() {
                self.index.remove(id);
                if let Some(z) = self.z_positions.remove(id) {
                    self.z_order.remove(&z);
                }
                removed.push(id.clone());
            }
        }
        self.journal(removed, ChangeKind::Delete, origin);
        Ok(())
    }

    /// Delete whichever of `ids` still exist. Used for guidance cleanup, where
    /// a feature may already be gone as a side effect of an earlier change.
    pub fn delete_if_present(&mut self, ids: &[FeatureId], origin: Origin) {
        let present: Vec<FeatureId> = ids.iter().filter(|id| self.has(id)).cloned().collect();
        if present.len() != ids.len() {
            log::warn!(
                "skipping {} already removed guidance feature(s)",
                ids.len() - present.len()
            );
        }
        if let Err(err) = self.delete(&present, origin) {
            log::warn!("guidance cleanup failed: {err}");
        }
    }

    /// Remove everything.
    pub fn clear(&mut self, origin: Origin) {
        let ids: Vec<FeatureId> = std::mem::take(&mut self.z_order).into_values().collect();
        self.z_positions.clear();
        self.features.clear();
        self.index.clear();
        self.journal(ids, ChangeKind::Delete, origin);
    }

    /// Read-only view of a stored feature.
    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    /// A detached copy of one feature.
    pub fn copy(&self, id: &FeatureId) -> DrawResult<Feature> {
        self.require(id).cloned()
    }

    /// Detached copies of every feature, back to front.
    pub fn copy_all(&self) -> Vec<Feature> {
        self.copy_all_where(|_| true)
    }

    pub fn copy_all_where(&self, predicate: impl Fn(&Feature) -> bool) -> Vec<Feature> {
        self.z_order
            .values()
            .filter_map(|id| self.features.get(id))
            .filter(|f| predicate(f))
            .cloned()
            .collect()
    }

    pub fn get_geometry_copy(&self, id: &FeatureId) -> DrawResult<Geometry> {
        Ok(self.require(id)?.geometry.clone())
    }

    pub fn get_property_copy(&self, id: &FeatureId, key: &str) -> DrawResult<Option<Value>> {
        Ok(self.require(id)?.properties.get(key).cloned())
    }

    /// Features whose geometry intersects `bounds` and that pass `filter`,
    /// back to front.
    pub fn search(&self, bounds: &Bounds, filter: impl Fn(&Feature) -> bool) -> Vec<Feature> {
        self.candidates(bounds)
            .into_iter()
            .filter(|f| geometry_intersects_bounds(&f.geometry, bounds) && filter(f))
            .cloned()
            .collect()
    }

    /// Features whose bounds overlap `bounds`, back to front. Only the index
    /// hits are visited and sorted.
    fn candidates(&self, bounds: &Bounds) -> Vec<&Feature> {
        let mut hits: Vec<(u64, &Feature)> = self
            .index
            .query(bounds)
            .iter()
            .filter_map(|id| Some((*self.z_positions.get(id)?, self.features.get(id)?)))
            .collect();
        hits.sort_unstable_by_key(|(z, _)| *z);
        hits.dedup_by_key(|(z, _)| *z);
        hits.into_iter().map(|(_, f)| f).collect()
    }

    pub fn index_stats(&self) -> SpatialIndexStats {
        self.index.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::properties;
    use serde_json::json;

    fn square() -> Geometry {
        Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]])
    }

    fn polygon_entry() -> NewFeature {
        NewFeature::new(square(), properties([(property::MODE, json!("polygon"))]))
    }

    #[test]
    fn test_create_then_copy_is_deep_equal() {
        for strategy in [
            Box::new(UuidStrategy) as Box<dyn IdStrategy>,
            Box::new(IncrementingStrategy::new()),
        ] {
            let mut store = GeoJsonStore::new(strategy, false);
            let ids = store.create(vec![polygon_entry()], Origin::Api);
            let copy = store.copy(&ids[0]).unwrap();
            assert_eq!(copy.geometry, square());
            assert_eq!(copy.properties, polygon_entry().properties);

            let duplicate = store.load(vec![copy], |_| Validation::valid());
            assert_eq!(duplicate, Err(DrawError::DuplicateFeatureId(ids[0].clone())));
            assert_eq!(store.size(), 1);
        }
    }

    #[test]
    fn test_copies_are_detached() {
        let mut store = GeoJsonStore::default();
        let ids = store.create(vec![polygon_entry()], Origin::Api);
        let mut copy = store.copy(&ids[0]).unwrap();
        copy.properties.insert("mode".into(), json!("other"));
        assert_eq!(store.get_property_copy(&ids[0], "mode").unwrap(), Some(json!("polygon")));
    }

    #[test]
    fn test_tracked_timestamps() {
        let mut store = GeoJsonStore::default();
        let ids = store.create(vec![polygon_entry()], Origin::Api);
        let feature = store.copy(&ids[0]).unwrap();
        assert!(feature.properties.contains_key(property::CREATED_AT));
        assert!(feature.properties.contains_key(property::UPDATED_AT));

        let mut untracked = GeoJsonStore::new(Box::new(UuidStrategy), false);
        let ids = untracked.create(vec![polygon_entry()], Origin::Api);
        assert!(!untracked.copy(&ids[0]).unwrap().properties.contains_key(property::CREATED_AT));
    }

    #[test]
    fn test_load_reports_invalid_features() {
        let mut store = GeoJsonStore::new(Box::new(IncrementingStrategy::new()), false);
        let good = Feature::new(FeatureId::Number(10), square(), Properties::new());
        let bad_id = Feature::new(FeatureId::from("x"), square(), Properties::new());
        let rejected = Feature::new(FeatureId::Number(11), Geometry::Point([0.0, 0.0]), Properties::new());
        let results = store
            .load(vec![good, bad_id, rejected], |f| {
                if matches!(f.geometry, Geometry::Point(_)) {
                    Validation::invalid("no points")
                } else {
                    Validation::valid()
                }
            })
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].valid);
        assert!(!results[1].valid);
        assert_eq!(results[2].reason.as_deref(), Some("no points"));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_delete_missing_id_changes_nothing() {
        let mut store = GeoJsonStore::default();
        let ids = store.create(vec![polygon_entry()], Origin::Api);
        store.take_changes();
        let missing = FeatureId::from("missing");
        let result = store.delete(&[ids[0].clone(), missing.clone()], Origin::Api);
        assert_eq!(result, Err(DrawError::FeatureNotFound(missing)));
        assert!(store.has(&ids[0]));
        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn test_update_geometry_type_mismatch() {
        let mut store = GeoJsonStore::default();
        let ids = store.create(vec![polygon_entry()], Origin::Api);
        let err = store
            .update_geometry(vec![(ids[0].clone(), Geometry::Point([0.0, 0.0]))], Origin::Api)
            .unwrap_err();
        assert!(matches!(err, DrawError::GeometryTypeMismatch { .. }));
        assert_eq!(store.get_geometry_copy(&ids[0]).unwrap(), square());
    }

    #[test]
    fn test_search_uses_exact_geometry() {
        let mut store = GeoJsonStore::default();
        let line = NewFeature::new(
            Geometry::LineString(vec![[0.0, 0.0], [10.0, 10.0]]),
            Properties::new(),
        );
        let point = NewFeature::new(Geometry::Point([5.0, 5.0]), Properties::new());
        store.create(vec![polygon_entry(), line, point], Origin::Api);

        // Inside the square only
        assert_eq!(store.search(&Bounds::new(0.2, 0.6, 0.3, 0.7), |_| true).len(), 1);
        // Within the line's bbox but away from the line itself
        assert!(store.search(&Bounds::new(8.0, 1.0, 9.0, 2.0), |_| true).is_empty());
        // Crossing the line and covering the point
        assert_eq!(store.search(&Bounds::new(4.0, 4.5, 6.0, 5.5), |_| true).len(), 2);
        // Filter
        let points = store.search(&Bounds::world(), |f| matches!(f.geometry, Geometry::Point(_)));
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_search_visits_index_hits_only() {
        let mut store = GeoJsonStore::new(Box::new(IncrementingStrategy::new()), false);
        let grid: Vec<NewFeature> = (0..100)
            .flat_map(|i: i32| (0..100).map(move |j: i32| [f64::from(i) / 10.0, f64::from(j) / 10.0]))
            .map(|p| NewFeature::new(Geometry::Point(p), Properties::new()))
            .collect();
        store.create(grid, Origin::Api);
        assert_eq!(store.size(), 10_000);

        let around = Bounds::new(4.95, 4.95, 5.25, 5.05);
        assert!(store.candidates(&around).len() < 50);
        let hits = store.search(&around, |_| true);
        let positions: Vec<Geometry> = hits.into_iter().map(|f| f.geometry).collect();
        assert_eq!(
            positions,
            vec![Geometry::Point([5.0, 5.0]), Geometry::Point([5.1, 5.0]), Geometry::Point([5.2, 5.0])]
        );
    }

    #[test]
    fn test_search_and_snapshot_keep_insertion_order() {
        let mut store = GeoJsonStore::new(Box::new(IncrementingStrategy::new()), false);
        let ids = store.create(
            (0..5).map(|_| NewFeature::new(Geometry::Point([1.0, 1.0]), Properties::new())).collect(),
            Origin::Api,
        );
        store.delete(&[ids[1].clone(), ids[3].clone()], Origin::Api).unwrap();
        let more = store.create(vec![NewFeature::new(Geometry::Point([1.0, 1.0]), Properties::new())], Origin::Api);

        let expected = vec![ids[0].clone(), ids[2].clone(), ids[4].clone(), more[0].clone()];
        let searched: Vec<FeatureId> = store
            .search(&Bounds::new(0.0, 0.0, 2.0, 2.0), |_| true)
            .into_iter()
            .map(|f| f.id)
            .collect();
        let snapshot: Vec<FeatureId> = store.copy_all().into_iter().map(|f| f.id).collect();
        assert_eq!(searched, expected);
        assert_eq!(snapshot, expected);
    }

    #[test]
    fn test_change_journal_order() {
        let mut store = GeoJsonStore::default();
        let ids = store.create(vec![polygon_entry()], Origin::Interaction);
        store
            .update_property(vec![(ids[0].clone(), property::SELECTED, Some(json!(true)))], Origin::Interaction)
            .unwrap();
        store.delete(&ids, Origin::Api).unwrap();
        let kinds: Vec<_> = store.take_changes().into_iter().map(|c| (c.kind, c.origin)).collect();
        assert_eq!(
            kinds,
            vec![
                (ChangeKind::Create, Origin::Interaction),
                (ChangeKind::Update, Origin::Interaction),
                (ChangeKind::Delete, Origin::Api),
            ]
        );
        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn test_delete_if_present_tolerates_missing() {
        let mut store = GeoJsonStore::default();
        let ids = store.create(vec![polygon_entry()], Origin::Api);
        store.delete_if_present(&[ids[0].clone(), FeatureId::from("gone")], Origin::Interaction);
        assert_eq!(store.size(), 0);
    }
}
