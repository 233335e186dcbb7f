// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene: a replaceable root node plus a subject announcing replacements.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::node::{Node, NodeRef};
use crate::subject::{ObjectEvent, Subject};

/// Owner of the authored hierarchy's root.
#[derive(Debug)]
pub struct Scene {
    root: RwLock<NodeRef>,
    subject: Subject,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Node::group("root"))
    }
}

impl Scene {
    /// Scene with `root` as its root node.
    pub fn new(root: NodeRef) -> Self {
        Self {
            root: RwLock::new(root),
            subject: Subject::new(),
        }
    }

    /// Current root node.
    pub fn root_node(&self) -> NodeRef {
        self.root.read().clone()
    }

    /// Replace the root node and notify with [`ObjectEvent::RootChanged`].
    ///
    /// Setting the same node again is a no-op.
    pub fn set_root_node(&self, root: NodeRef) {
        {
            let mut current = self.root.write();
            if Arc::ptr_eq(&current, &root) {
                return;
            }
            *current = root;
        }
        log::debug!("scene root replaced");
        self.subject.notify(&ObjectEvent::RootChanged);
    }

    /// Subscription list for root replacement.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::{Listener, Payload};
    use std::sync::Weak;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Count(AtomicUsize);

    impl Listener for Count {
        fn on_notify(&self, event: &ObjectEvent, _payload: Payload) {
            assert_eq!(*event, ObjectEvent::RootChanged, "scenes only announce roots");
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn replacing_root_notifies_once() {
        let scene = Scene::default();
        let count = Arc::new(Count::default());
        scene
            .subject()
            .attach(Arc::downgrade(&count) as Weak<dyn Listener>, 0);

        let next = Node::group("next");
        scene.set_root_node(next.clone());
        scene.set_root_node(next.clone());
        assert_eq!(count.0.load(Ordering::Relaxed), 1);
        assert!(Arc::ptr_eq(&scene.root_node(), &next));
    }
}
