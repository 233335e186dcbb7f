// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Logical hierarchy mirroring the authored scene, plus its side registries.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::sync::{Arc, Weak};

use arbor_scene::{Camera, Hints, Node, NodeRef};
use arbor_tree::{Children, DirtyVisitor, IndexedTree, PreOrder};

use crate::transform_tree::TransformTree;
use crate::types::{ObjectDirty, ObjectTreeIndex, ObjectTreeNode, TransformTreeIndex};

/// One entry per authored node, below a sentinel root.
///
/// Besides the hierarchy it keeps the switch, LOD, light, and drawable registries,
/// all keyed by object-tree index.
pub struct ObjectTree {
    tree: IndexedTree<ObjectTreeNode, ObjectDirty>,
    root: ObjectTreeIndex,
    switches: BTreeMap<ObjectTreeIndex, Weak<Node>>,
    lods: BTreeMap<ObjectTreeIndex, Weak<Node>>,
    lights: BTreeSet<ObjectTreeIndex>,
    drawables: BTreeSet<ObjectTreeIndex>,
}

impl core::fmt::Debug for ObjectTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectTree")
            .field("nodes", &self.tree.len())
            .field("switches", &self.switches.len())
            .field("lods", &self.lods.len())
            .field("lights", &self.lights.len())
            .field("drawables", &self.drawables.len())
            .field("dirty", &self.tree.dirty_indices().len())
            .finish_non_exhaustive()
    }
}

/// Outcome of [`ObjectTree::update_world`].
#[derive(Clone, Debug, Default)]
pub(crate) struct WorldUpdate {
    pub(crate) visited: usize,
    pub(crate) changed_drawables: Vec<ObjectTreeIndex>,
}

impl ObjectTree {
    /// Tree holding only the sentinel root, attached to `transform_root`.
    pub(crate) fn new(transform_root: TransformTreeIndex, capacity: usize) -> Self {
        let mut tree = IndexedTree::with_capacity(capacity.saturating_add(1));
        let root = tree.insert_node(ObjectTreeNode::sentinel(transform_root), None, None);
        Self {
            tree,
            root,
            switches: BTreeMap::new(),
            lods: BTreeMap::new(),
            lights: BTreeSet::new(),
            drawables: BTreeSet::new(),
        }
    }

    /// The sentinel root.
    pub fn root(&self) -> ObjectTreeIndex {
        self.root
    }

    /// Number of entries, sentinel included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Always false: the sentinel is never removed.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// True if `index` is live.
    pub fn contains(&self, index: ObjectTreeIndex) -> bool {
        self.tree.contains(index)
    }

    /// Entry at `index`.
    pub fn get(&self, index: ObjectTreeIndex) -> Option<&ObjectTreeNode> {
        self.tree.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: ObjectTreeIndex) -> Option<&mut ObjectTreeNode> {
        self.tree.get_mut(index)
    }

    /// Parent of `index`; `None` for the sentinel.
    pub fn parent(&self, index: ObjectTreeIndex) -> Option<ObjectTreeIndex> {
        self.tree.parent(index)
    }

    /// Depth below the sentinel.
    pub fn depth(&self, index: ObjectTreeIndex) -> Option<u32> {
        self.tree.depth(index)
    }

    /// Children of `index` in authored order.
    pub fn children(&self, index: ObjectTreeIndex) -> Children<'_, ObjectTreeNode, ObjectDirty> {
        self.tree.children(index)
    }

    /// The subtree rooted at `index`, parents first.
    pub fn pre_order(&self, index: ObjectTreeIndex) -> PreOrder<'_, ObjectTreeNode, ObjectDirty> {
        self.tree.pre_order(index)
    }

    /// Entries waiting for the next effective-state pass.
    pub fn dirty_indices(&self) -> &[ObjectTreeIndex] {
        self.tree.dirty_indices()
    }

    /// Registered switches.
    pub fn switches(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.switches.keys().copied()
    }

    /// Registered LOD groups.
    pub fn lods(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.lods.keys().copied()
    }

    /// Registered light sources.
    pub fn lights(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.lights.iter().copied()
    }

    /// Registered drawables.
    pub fn drawables(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.drawables.iter().copied()
    }

    pub(crate) fn insert(
        &mut self,
        node: ObjectTreeNode,
        parent: ObjectTreeIndex,
        left_sibling: Option<ObjectTreeIndex>,
    ) -> ObjectTreeIndex {
        self.tree.insert_node(node, Some(parent), left_sibling)
    }

    pub(crate) fn delete(&mut self, index: ObjectTreeIndex) -> usize {
        assert_ne!(index, self.root, "cannot remove the sentinel root");
        self.tree.delete_node(index)
    }

    pub(crate) fn register_switch(&mut self, index: ObjectTreeIndex, node: &NodeRef) {
        self.switches.insert(index, Arc::downgrade(node));
    }

    pub(crate) fn register_lod(&mut self, index: ObjectTreeIndex, node: &NodeRef) {
        self.lods.insert(index, Arc::downgrade(node));
    }

    pub(crate) fn register_light(&mut self, index: ObjectTreeIndex) {
        self.lights.insert(index);
    }

    pub(crate) fn register_drawable(&mut self, index: ObjectTreeIndex) {
        self.drawables.insert(index);
    }

    /// Drop `index` from every registry. Returns true if it was a switch.
    pub(crate) fn unregister(&mut self, index: ObjectTreeIndex) -> bool {
        self.lods.remove(&index);
        self.lights.remove(&index);
        self.drawables.remove(&index);
        self.switches.remove(&index).is_some()
    }

    /// Replace the local hints and mask of `index` and flag it. Returns false if stale.
    pub(crate) fn set_attributes(&mut self, index: ObjectTreeIndex, hints: Hints, mask: u32) -> bool {
        let Some(node) = self.tree.get_mut(index) else {
            return false;
        };
        node.local_hints = hints;
        node.local_mask = mask;
        self.tree.mark_dirty(index, ObjectDirty::DEFAULT);
        true
    }

    /// Activate only the child at `active` (or none) and flag children whose flag flipped.
    ///
    /// Returns the number of children flagged.
    pub(crate) fn apply_activation(&mut self, index: ObjectTreeIndex, active: Option<usize>) -> usize {
        let children: Vec<ObjectTreeIndex> = self.tree.children(index).collect();
        let mut flipped = 0;
        for (ordinal, child) in children.into_iter().enumerate() {
            let on = active == Some(ordinal);
            let node = &mut self.tree[child];
            if node.local_active != on {
                node.local_active = on;
                self.tree.mark_dirty(child, ObjectDirty::ACTIVE);
                flipped += 1;
            }
        }
        flipped
    }

    /// Re-read the active child of the switch at `index`.
    pub(crate) fn resolve_switch(&mut self, index: ObjectTreeIndex) -> usize {
        let Some(weak) = self.switches.get(&index) else {
            log::warn!("switch event for unregistered entry {index}");
            return 0;
        };
        let Some(switch) = weak.upgrade() else {
            log::warn!("switch {index} outlived its authored object");
            return 0;
        };
        let active = switch.active_child();
        self.apply_activation(index, active)
    }

    /// Re-evaluate every LOD against the camera. Returns the number of children flagged.
    pub(crate) fn resolve_lods(
        &mut self,
        transforms: &TransformTree,
        camera: &Camera,
        range_scale: f32,
    ) -> usize {
        let lods: Vec<(ObjectTreeIndex, Weak<Node>)> =
            self.lods.iter().map(|(&i, w)| (i, w.clone())).collect();
        let mut flipped = 0;
        for (index, weak) in lods {
            let Some(lod) = weak.upgrade() else {
                log::warn!("lod {index} outlived its authored object");
                continue;
            };
            if self.tree.first_child(index).is_none() {
                continue;
            }
            let model_to_world = transforms
                .world_matrix(self.tree[index].transform)
                .unwrap_or_default();
            let model_to_view = camera.world_to_view() * model_to_world;
            let active = lod.lod_to_use(model_to_view, range_scale);
            flipped += self.apply_activation(index, active);
        }
        flipped
    }

    /// Recompute effective state below every dirty entry, parents first, then clear.
    pub(crate) fn update_world(&mut self) -> WorldUpdate {
        let mut visitor = InheritState::default();
        let visited = self
            .tree
            .process_dirty_list(ObjectDirty::all(), &mut visitor);
        self.tree.clear_dirty();
        WorldUpdate {
            visited,
            changed_drawables: visitor.changed_drawables,
        }
    }
}

impl Index<ObjectTreeIndex> for ObjectTree {
    type Output = ObjectTreeNode;

    fn index(&self, index: ObjectTreeIndex) -> &ObjectTreeNode {
        &self.tree[index]
    }
}

#[derive(Default)]
struct InheritState {
    changed_drawables: Vec<ObjectTreeIndex>,
}

impl DirtyVisitor<ObjectTreeNode> for InheritState {
    fn visit(
        &mut self,
        index: ObjectTreeIndex,
        parent: Option<&ObjectTreeNode>,
        node: &mut ObjectTreeNode,
    ) -> bool {
        if node.inherit(parent) && node.is_drawable() {
            self.changed_drawables.push(index);
        }
        true
    }
}
