// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change observers.
//!
//! Observers are the only scene-tree code that runs on the mutating thread. They never
//! touch the trees: each notification is recorded in a queue behind a short lock and
//! the update driver drains the queues once per frame.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arbor_scene::{Hints, Listener, Node, ObjectEvent, Payload, Scene};
use arbor_tree::NodeIndex;
use parking_lot::Mutex;

use crate::types::ObjectTreeIndex;

#[derive(Clone, Copy, Debug, Default)]
struct PendingChange {
    attributes: Option<(Hints, u32)>,
    transform: bool,
}

/// Queues hint, mask, and transform changes of every generated node.
#[derive(Debug)]
pub(crate) struct ObjectObserver {
    me: Weak<Self>,
    pending: Mutex<BTreeMap<ObjectTreeIndex, PendingChange>>,
}

impl ObjectObserver {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            pending: Mutex::new(BTreeMap::new()),
        })
    }

    fn listener(&self) -> Weak<dyn Listener> {
        self.me.clone()
    }

    pub(crate) fn attach(&self, node: &Node, index: ObjectTreeIndex) {
        node.subject().attach(self.listener(), index.to_bits());
    }

    /// Stop watching `node` and forget anything still queued for `index`.
    pub(crate) fn detach(&self, node: Option<&Node>, index: ObjectTreeIndex) {
        if let Some(node) = node {
            node.subject().detach(&self.listener(), index.to_bits());
        }
        self.pending.lock().remove(&index);
    }

    /// Entries whose authored transform or billboard changed since the last call.
    pub(crate) fn take_transform_changes(&self) -> Vec<ObjectTreeIndex> {
        let mut pending = self.pending.lock();
        let mut out = Vec::new();
        pending.retain(|&index, change| {
            if change.transform {
                out.push(index);
                change.transform = false;
            }
            change.attributes.is_some()
        });
        out
    }

    /// Latest hints and mask per entry since the last call.
    pub(crate) fn take_attribute_changes(&self) -> Vec<(ObjectTreeIndex, Hints, u32)> {
        let mut pending = self.pending.lock();
        let mut out = Vec::new();
        pending.retain(|&index, change| {
            if let Some((hints, mask)) = change.attributes.take() {
                out.push((index, hints, mask));
            }
            change.transform
        });
        out
    }
}

impl Listener for ObjectObserver {
    fn on_notify(&self, event: &ObjectEvent, payload: Payload) {
        let index = NodeIndex::from_bits(payload);
        let mut pending = self.pending.lock();
        match *event {
            ObjectEvent::AttributesChanged {
                hints,
                traversal_mask,
            } => pending.entry(index).or_default().attributes = Some((hints, traversal_mask)),
            ObjectEvent::TransformChanged => pending.entry(index).or_default().transform = true,
            ObjectEvent::ActiveChildChanged | ObjectEvent::RootChanged => {}
        }
    }
}

/// Queues switches whose active child changed.
#[derive(Debug)]
pub(crate) struct SwitchObserver {
    me: Weak<Self>,
    pending: Mutex<BTreeSet<ObjectTreeIndex>>,
}

impl SwitchObserver {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            pending: Mutex::new(BTreeSet::new()),
        })
    }

    fn listener(&self) -> Weak<dyn Listener> {
        self.me.clone()
    }

    pub(crate) fn attach(&self, node: &Node, index: ObjectTreeIndex) {
        node.subject().attach(self.listener(), index.to_bits());
    }

    pub(crate) fn detach(&self, node: Option<&Node>, index: ObjectTreeIndex) {
        if let Some(node) = node {
            node.subject().detach(&self.listener(), index.to_bits());
        }
        self.pending.lock().remove(&index);
    }

    /// Queue `index` as if its switch had notified.
    pub(crate) fn queue(&self, index: ObjectTreeIndex) {
        self.pending.lock().insert(index);
    }

    pub(crate) fn take(&self) -> Vec<ObjectTreeIndex> {
        core::mem::take(&mut *self.pending.lock())
            .into_iter()
            .collect()
    }
}

impl Listener for SwitchObserver {
    fn on_notify(&self, event: &ObjectEvent, payload: Payload) {
        if *event == ObjectEvent::ActiveChildChanged {
            self.queue(NodeIndex::from_bits(payload));
        }
    }
}

/// Remembers that the scene replaced its root.
#[derive(Debug)]
pub(crate) struct SceneObserver {
    me: Weak<Self>,
    root_changed: AtomicBool,
}

impl SceneObserver {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            root_changed: AtomicBool::new(false),
        })
    }

    fn listener(&self) -> Weak<dyn Listener> {
        self.me.clone()
    }

    pub(crate) fn attach(&self, scene: &Scene) {
        scene.subject().attach(self.listener(), 0);
    }

    pub(crate) fn detach(&self, scene: &Scene) {
        scene.subject().detach(&self.listener(), 0);
    }

    pub(crate) fn take(&self) -> bool {
        self.root_changed.swap(false, Ordering::AcqRel)
    }
}

impl Listener for SceneObserver {
    fn on_notify(&self, event: &ObjectEvent, _payload: Payload) {
        if *event == ObjectEvent::RootChanged {
            self.root_changed.store(true, Ordering::Release);
        }
    }
}
