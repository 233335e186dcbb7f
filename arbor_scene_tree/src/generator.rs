// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds object-tree and transform-tree entries for an authored subtree.

use std::sync::Arc;

use arbor_scene::{NodeKind, NodeRef};

use crate::event::{DrawableEventKind, ListenerSlot, emit};
use crate::object_tree::ObjectTree;
use crate::observer::{ObjectObserver, SwitchObserver};
use crate::transform_tree::TransformTree;
use crate::types::{NodeRoles, ObjectTreeIndex, ObjectTreeNode};

/// One-shot walker over an authored hierarchy.
///
/// Borrows the parts of a scene tree it writes to; a fresh generator is made for every
/// build.
pub(crate) struct TreeGenerator<'a> {
    pub(crate) objects: &'a mut ObjectTree,
    pub(crate) transforms: &'a mut TransformTree,
    pub(crate) object_observer: &'a ObjectObserver,
    pub(crate) switch_observer: &'a SwitchObserver,
    pub(crate) listener: &'a mut ListenerSlot,
    pub(crate) built: usize,
}

impl TreeGenerator<'_> {
    /// Mirror `root` and its descendants below `parent`, directly after `left_sibling`.
    ///
    /// Returns the object-tree index of `root`.
    pub(crate) fn build(
        &mut self,
        root: &NodeRef,
        parent: ObjectTreeIndex,
        left_sibling: Option<ObjectTreeIndex>,
    ) -> ObjectTreeIndex {
        self.build_node(root, parent, left_sibling, true)
    }

    fn build_node(
        &mut self,
        node: &NodeRef,
        parent: ObjectTreeIndex,
        left_sibling: Option<ObjectTreeIndex>,
        local_active: bool,
    ) -> ObjectTreeIndex {
        let parent_entry = &self.objects[parent];
        let parent_transform = parent_entry.transform;
        let mut entry = ObjectTreeNode {
            object: Some(Arc::downgrade(node)),
            transform: parent_transform,
            transform_parent: None,
            roles: NodeRoles::empty(),
            local_active,
            local_hints: node.hints(),
            local_mask: node.traversal_mask(),
            world_active: false,
            world_hints: parent_entry.world_hints,
            world_mask: parent_entry.world_mask,
        };
        entry.inherit(Some(parent_entry));

        match node.kind() {
            NodeKind::Transform => {
                entry.transform = self.transforms.add_transform(parent_transform, node);
                entry.transform_parent = Some(parent_transform);
                entry.roles |= NodeRoles::TRANSFORM;
            }
            NodeKind::Billboard => {
                entry.transform = self.transforms.add_billboard(parent_transform, node);
                entry.transform_parent = Some(parent_transform);
                entry.roles |= NodeRoles::BILLBOARD;
            }
            NodeKind::Switch => entry.roles |= NodeRoles::SWITCH,
            NodeKind::Lod => entry.roles |= NodeRoles::LOD,
            NodeKind::LightSource => entry.roles |= NodeRoles::LIGHT,
            NodeKind::Geometry => entry.roles |= NodeRoles::DRAWABLE,
            NodeKind::Group => {}
        }

        let roles = entry.roles;
        let index = self.objects.insert(entry, parent, left_sibling);
        self.built += 1;
        self.object_observer.attach(node, index);
        if roles.contains(NodeRoles::SWITCH) {
            self.objects.register_switch(index, node);
            self.switch_observer.attach(node, index);
        }
        if roles.contains(NodeRoles::LOD) {
            self.objects.register_lod(index, node);
        }
        if roles.contains(NodeRoles::LIGHT) {
            self.objects.register_light(index);
        }
        if roles.contains(NodeRoles::DRAWABLE) {
            self.objects.register_drawable(index);
            emit(
                self.listener,
                index,
                &self.objects[index],
                DrawableEventKind::Added,
            );
        }

        // Switches start on their authored selection; LODs on their finest level
        // until the first update has a camera.
        let selected = match node.kind() {
            NodeKind::Switch => node.active_child(),
            NodeKind::Lod => Some(0),
            _ => None,
        };
        let selects = matches!(node.kind(), NodeKind::Switch | NodeKind::Lod);
        let mut left = None;
        for (ordinal, child) in node.children().iter().enumerate() {
            let active = !selects || selected == Some(ordinal);
            left = Some(self.build_node(child, index, left, active));
        }
        index
    }
}
