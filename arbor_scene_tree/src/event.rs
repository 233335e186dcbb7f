// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable lifecycle notifications for render-list consumers.

use crate::types::{ObjectTreeIndex, ObjectTreeNode};

/// What happened to a drawable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DrawableEventKind {
    /// The drawable entered the object tree.
    Added,
    /// The drawable left the object tree; its index is stale after this event.
    Removed,
    /// The drawable's effective activation, hints, or mask changed this frame.
    Changed,
}

/// A drawable lifecycle notification.
#[derive(Clone, Debug)]
pub struct DrawableEvent {
    /// Object-tree index of the drawable.
    pub index: ObjectTreeIndex,
    /// Snapshot of the entry when the event was emitted.
    pub node: ObjectTreeNode,
    /// What happened.
    pub kind: DrawableEventKind,
}

/// Receiver of [`DrawableEvent`]s.
///
/// Events are delivered synchronously from inside scene-tree calls; a listener must
/// not call back into the scene tree.
pub trait DrawableListener {
    /// Handle one event.
    fn on_drawable_event(&mut self, event: &DrawableEvent);
}

impl<F: FnMut(&DrawableEvent)> DrawableListener for F {
    fn on_drawable_event(&mut self, event: &DrawableEvent) {
        self(event);
    }
}

/// Boxed listener slot shared by the generator and the update driver.
pub(crate) type ListenerSlot = Option<Box<dyn DrawableListener>>;

pub(crate) fn emit(
    listener: &mut ListenerSlot,
    index: ObjectTreeIndex,
    node: &ObjectTreeNode,
    kind: DrawableEventKind,
) {
    if let Some(listener) = listener {
        listener.on_drawable_event(&DrawableEvent {
            index,
            node: node.clone(),
            kind,
        });
    }
}
