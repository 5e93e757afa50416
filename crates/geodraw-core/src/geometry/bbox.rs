//! Axis-aligned bounds.

use crate::feature::Position;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. Used for longitude/latitude extents and by the
/// spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create bounds, normalizing the corner order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// The whole longitude/latitude extent.
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Tightest bounds containing every position. Empty input yields an
    /// inverted box that intersects nothing.
    pub fn from_positions(positions: &[Position]) -> Self {
        positions.iter().fold(
            Self {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |acc, p| Self {
                min_x: acc.min_x.min(p[0]),
                min_y: acc.min_y.min(p[1]),
                max_x: acc.max_x.max(p[0]),
                max_y: acc.max_y.max(p[1]),
            },
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Inclusive point containment.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether `other` lies entirely inside these bounds.
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Inclusive overlap test, so zero-area boxes (points) still intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Split into four equal quadrants: SW, SE, NW, NE.
    pub fn quadrants(&self) -> [Bounds; 4] {
        let (cx, cy) = self.center();
        [
            Bounds::new(self.min_x, self.min_y, cx, cy),
            Bounds::new(cx, self.min_y, self.max_x, cy),
            Bounds::new(self.min_x, cy, cx, self.max_y),
            Bounds::new(cx, cy, self.max_x, self.max_y),
        ]
    }

    /// The closed ring of the box corners, counter-clockwise.
    pub fn to_ring(&self) -> Vec<Position> {
        vec![
            [self.min_x, self.min_y],
            [self.max_x, self.min_y],
            [self.max_x, self.max_y],
            [self.min_x, self.max_y],
            [self.min_x, self.min_y],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_intersection() {
        let b1 = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b2 = Bounds::new(5.0, 5.0, 15.0, 15.0);
        let b3 = Bounds::new(20.0, 20.0, 30.0, 30.0);
        assert!(b1.intersects(&b2));
        assert!(b2.intersects(&b1));
        assert!(!b1.intersects(&b3));
    }

    #[test]
    fn test_point_bounds_intersect() {
        let point = Bounds::from_positions(&[[5.0, 5.0]]);
        assert!(Bounds::new(0.0, 0.0, 10.0, 10.0).intersects(&point));
        assert!(Bounds::new(5.0, 5.0, 6.0, 6.0).intersects(&point));
    }

    #[test]
    fn test_empty_bounds() {
        let empty = Bounds::from_positions(&[]);
        assert!(empty.is_empty());
        assert!(!Bounds::world().intersects(&empty));
    }

    #[test]
    fn test_quadrants_cover_parent() {
        let parent = Bounds::new(-10.0, -10.0, 10.0, 10.0);
        let quads = parent.quadrants();
        let merged = quads.iter().skip(1).fold(quads[0], |acc, q| acc.union(q));
        assert_eq!(merged, parent);
    }
}
