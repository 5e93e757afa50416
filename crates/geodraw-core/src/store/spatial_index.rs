//! Quadtree spatial index over feature bounds.
//!
//! Backs every pointer hit test, so queries only visit nodes whose bounds
//! overlap the query box. Items that straddle a split line stay at the
//! deepest node that fully contains them; items outside the root extent
//! stay on the root.

use crate::feature::FeatureId;
use crate::geometry::Bounds;
use std::collections::HashMap;

/// Default maximum tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 12;
/// Default number of items a node holds before it splits.
pub const DEFAULT_MAX_ITEMS: usize = 16;

#[derive(Debug, Clone)]
struct QuadtreeNode {
    bounds: Bounds,
    depth: usize,
    items: Vec<(FeatureId, Bounds)>,
    children: Option<Box<[QuadtreeNode; 4]>>,
}

impl QuadtreeNode {
    fn new(bounds: Bounds, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, id: FeatureId, bounds: Bounds, max_items: usize, max_depth: usize) {
        if let Some(children) = &mut self.children {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains(&bounds)) {
                child.insert(id, bounds, max_items, max_depth);
                return;
            }
            self.items.push((id, bounds));
            return;
        }

        self.items.push((id, bounds));
        if self.items.len() > max_items && self.depth < max_depth {
            self.split(max_items, max_depth);
        }
    }

    fn split(&mut self, max_items: usize, max_depth: usize) {
        let depth = self.depth + 1;
        let quads = self.bounds.quadrants();
        self.children = Some(Box::new(quads.map(|q| QuadtreeNode::new(q, depth))));
        for (id, bounds) in std::mem::take(&mut self.items) {
            self.insert(id, bounds, max_items, max_depth);
        }
    }

    fn remove(&mut self, id: &FeatureId, bounds: &Bounds) -> bool {
        if let Some(pos) = self.items.iter().position(|(item, _)| item == id) {
            self.items.swap_remove(pos);
            return true;
        }
        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.bounds.contains(bounds) && child.remove(id, bounds) {
                    return true;
                }
            }
        }
        false
    }

    fn query(&self, query: &Bounds, out: &mut Vec<FeatureId>) {
        if self.depth > 0 && !self.bounds.intersects(query) {
            return;
        }
        out.extend(
            self.items
                .iter()
                .filter(|(_, b)| b.intersects(query))
                .map(|(id, _)| id.clone()),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(query, out);
            }
        }
    }

    fn count_nodes(&self, stats: &mut SpatialIndexStats) {
        stats.node_count += 1;
        stats.max_depth_reached = stats.max_depth_reached.max(self.depth);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.count_nodes(stats);
            }
        }
    }
}

/// Summary of the tree shape, mostly useful for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpatialIndexStats {
    pub total_items: usize,
    pub node_count: usize,
    pub max_depth_reached: usize,
}

/// Quadtree keyed by feature id.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    root: QuadtreeNode,
    max_depth: usize,
    max_items: usize,
    entries: HashMap<FeatureId, Bounds>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(Bounds::world(), DEFAULT_MAX_DEPTH, DEFAULT_MAX_ITEMS)
    }
}

impl SpatialIndex {
    pub fn new(bounds: Bounds, max_depth: usize, max_items: usize) -> Self {
        Self {
            root: QuadtreeNode::new(bounds, 0),
            max_depth,
            max_items: max_items.max(1),
            entries: HashMap::new(),
        }
    }

    /// Insert or replace the bounds stored for `id`.
    pub fn insert(&mut self, id: FeatureId, bounds: Bounds) {
        if self.entries.contains_key(&id) {
            self.remove(&id);
        }
        self.entries.insert(id.clone(), bounds);
        self.root.insert(id, bounds, self.max_items, self.max_depth);
    }

    pub fn remove(&mut self, id: &FeatureId) -> bool {
        match self.entries.remove(id) {
            Some(bounds) => self.root.remove(id, &bounds),
            None => false,
        }
    }

    /// Ids whose bounds overlap `query`.
    pub fn query(&self, query: &Bounds) -> Vec<FeatureId> {
        let mut out = Vec::new();
        self.root.query(query, &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.root = QuadtreeNode::new(self.root.bounds, 0);
        self.entries.clear();
    }

    pub fn stats(&self) -> SpatialIndexStats {
        let mut stats = SpatialIndexStats {
            total_items: self.entries.len(),
            ..Default::default()
        };
        self.root.count_nodes(&mut stats);
        stats
    }
}
