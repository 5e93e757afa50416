//! Listener registry for engine events.

use crate::common::FinishContext;
use crate::feature::FeatureId;
use crate::store::{ChangeKind, Origin};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Names of the events listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawEventKind {
    Ready,
    Finish,
    Change,
    Select,
    Deselect,
}

/// An event published to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    Ready,
    Finish {
        id: FeatureId,
        context: FinishContext,
    },
    Change {
        ids: Vec<FeatureId>,
        kind: ChangeKind,
        origin: Origin,
    },
    Select {
        id: FeatureId,
    },
    Deselect {
        id: FeatureId,
    },
}

impl DrawEvent {
    pub fn kind(&self) -> DrawEventKind {
        match self {
            DrawEvent::Ready => DrawEventKind::Ready,
            DrawEvent::Finish { .. } => DrawEventKind::Finish,
            DrawEvent::Change { .. } => DrawEventKind::Change,
            DrawEvent::Select { .. } => DrawEventKind::Select,
            DrawEvent::Deselect { .. } => DrawEventKind::Deselect,
        }
    }
}

pub type Listener = Rc<dyn Fn(&DrawEvent)>;

/// Ordered listeners per event kind. Cloning yields another handle to the
/// same registry, so a listener can hold one and unsubscribe while an event
/// is being dispatched.
#[derive(Clone, Default)]
pub struct EventRegistry {
    listeners: Rc<RefCell<HashMap<DrawEventKind, Vec<Listener>>>>,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<DrawEventKind, usize> = self
            .listeners
            .borrow()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        f.debug_struct("EventRegistry").field("listeners", &counts).finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe. Adding a listener that is already subscribed does nothing.
    pub fn on(&self, kind: DrawEventKind, listener: Listener) {
        let mut listeners = self.listeners.borrow_mut();
        let list = listeners.entry(kind).or_default();
        if !list.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            list.push(listener);
        }
    }

    /// Unsubscribe by identity. Returns whether the listener was found.
    pub fn off(&self, kind: DrawEventKind, listener: &Listener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| !Rc::ptr_eq(l, listener));
        before != list.len()
    }

    pub fn listener_count(&self, kind: DrawEventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Call every listener of the event's kind, in subscription order. The
    /// list is snapshotted first; listeners removed mid-dispatch are skipped.
    pub fn dispatch(&self, event: &DrawEvent) {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self.listeners.borrow().get(&kind).cloned().unwrap_or_default();
        for listener in snapshot {
            let still_subscribed = self
                .listeners
                .borrow()
                .get(&kind)
                .is_some_and(|list| list.iter().any(|l| Rc::ptr_eq(l, &listener)));
            if still_subscribed {
                listener(event);
            }
        }
    }
}
