//! Vertex dragging of finished features inside their own drawing mode.

use super::ModeContext;
use crate::behaviors::{ClickBoundingBox, DragCoordinate, Guidance, ValidateFn};
use crate::common::{property, DrawPointerEvent};
use crate::error::DrawResult;
use crate::feature::{FeatureId, Position};

#[derive(Debug, Clone, Default)]
pub(crate) struct EditableDrag {
    pointer_distance: f64,
    drag: DragCoordinate,
}

impl EditableDrag {
    pub fn new(pointer_distance: f64) -> Self {
        Self {
            pointer_distance,
            drag: DragCoordinate::new(pointer_distance),
        }
    }

    pub fn set_pointer_distance(&mut self, pointer_distance: f64) {
        self.pointer_distance = pointer_distance;
        self.drag.set_pointer_distance(pointer_distance);
    }

    pub fn feature_id(&self) -> Option<&FeatureId> {
        self.drag.feature_id()
    }

    /// Grab the vertex under the pointer of the topmost finished feature
    /// owned by `mode`. Returns whether a drag started.
    pub fn start(&mut self, ctx: &ModeContext<'_>, event: &DrawPointerEvent, mode: &str) -> bool {
        let bbox = ClickBoundingBox::new(self.pointer_distance).around(&*ctx.adapter, event);
        let candidates = ctx.store.search(&bbox, |f| {
            f.mode() == Some(mode) && !f.is_guidance() && !f.flag(property::CURRENTLY_DRAWING)
        });
        for feature in candidates.iter().rev() {
            if let Some(index) = self.drag.draggable_index(ctx, event, &feature.id) {
                self.drag.start(feature.id.clone(), index);
                return true;
            }
        }
        false
    }

    pub fn drag(&self, ctx: &mut ModeContext<'_>, target: Position, validate: ValidateFn<'_>) -> DrawResult<bool> {
        self.drag.drag(ctx, target, false, Guidance::none(), validate)
    }

    pub fn stop(&mut self) -> Option<FeatureId> {
        self.drag.stop()
    }
}
