//! Pointer hit areas and pixel distances.

use crate::adapter::DrawAdapter;
use crate::common::DrawPointerEvent;
use crate::feature::Position;
use crate::geometry::{cartesian_distance, Bounds};

/// Geographic box covering a square of pixels around the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickBoundingBox {
    /// Half the side of the square, in pixels.
    pub radius: f64,
}

impl ClickBoundingBox {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Box around `event`. Corners that cannot be unprojected collapse the
    /// box onto the event position.
    pub fn around(&self, adapter: &dyn DrawAdapter, event: &DrawPointerEvent) -> Bounds {
        let (x, y, r) = (event.container_x, event.container_y, self.radius);
        match (adapter.unproject(x - r, y - r), adapter.unproject(x + r, y + r)) {
            (Some(a), Some(b)) => Bounds::new(a[0], a[1], b[0], b[1]),
            _ => Bounds::new(event.lng, event.lat, event.lng, event.lat),
        }
    }
}

/// Pixel distance between the pointer and a geographic position.
pub fn pixel_distance(adapter: &dyn DrawAdapter, event: &DrawPointerEvent, position: Position) -> f64 {
    cartesian_distance(event.point(), adapter.project(position[0], position[1]))
}

/// Pixels the pointer must travel before a drawing mode redraws its
/// provisional feature.
pub const MIN_POINTER_MOVEMENT: f64 = 1.0;

/// Drops pointer moves shorter than a pixel threshold, measured from the last
/// move it let through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMovement {
    min_pixels: f64,
    last: Option<Position>,
}

impl Default for PointerMovement {
    fn default() -> Self {
        Self::new(MIN_POINTER_MOVEMENT)
    }
}

impl PointerMovement {
    pub fn new(min_pixels: f64) -> Self {
        Self { min_pixels, last: None }
    }

    /// Whether `event` is far enough from the last accepted move. Accepted
    /// positions become the new reference.
    pub fn accept(&mut self, adapter: &dyn DrawAdapter, event: &DrawPointerEvent) -> bool {
        if let Some(last) = self.last {
            if pixel_distance(adapter, event, last) < self.min_pixels {
                return false;
            }
        }
        self.last = Some(event.position());
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Pixel distance between two geographic positions.
pub fn pixel_distance_between(adapter: &dyn DrawAdapter, a: Position, b: Position) -> f64 {
    cartesian_distance(adapter.project(a[0], a[1]), adapter.project(b[0], b[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;

    #[test]
    fn test_bounding_box_contains_pointer() {
        let adapter = HeadlessAdapter::default();
        let event = adapter.pointer_event(0.05, 0.05);
        let bbox = ClickBoundingBox::new(20.0).around(&adapter, &event);
        assert!(bbox.contains_point(0.05, 0.05));
        // 40 px at ~1456 px/degree
        assert!((bbox.width() - 40.0 / 1456.36).abs() < 1e-3);
    }

    #[test]
    fn test_pointer_movement_threshold() {
        let adapter = HeadlessAdapter::default();
        let mut movement = PointerMovement::default();
        assert!(movement.accept(&adapter, &adapter.pointer_event(0.1, 0.0)));
        for step in 1..=50 {
            let jitter = adapter.pointer_event(0.1 + f64::from(step) * 1e-9, 0.0);
            assert!(!movement.accept(&adapter, &jitter));
        }
        // 0.001 degrees is about 1.5 px
        assert!(movement.accept(&adapter, &adapter.pointer_event(0.101, 0.0)));

        movement.reset();
        assert!(movement.accept(&adapter, &adapter.pointer_event(0.101, 0.0)));
    }

    #[test]
    fn test_pixel_distance() {
        let adapter = HeadlessAdapter::default();
        let event = adapter.pointer_event(0.0, 0.0);
        let d = pixel_distance(&adapter, &event, [0.01, 0.0]);
        assert!((d - 14.56).abs() < 0.05, "{d}");
        assert!((pixel_distance_between(&adapter, [0.0, 0.0], [0.01, 0.0]) - d).abs() < 1e-9);
    }
}
