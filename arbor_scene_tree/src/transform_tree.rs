// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial hierarchy of transforms and billboards with cached world matrices.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use arbor_scene::{Camera, Node, NodeRef};
use arbor_tree::{DirtyVisitor, IndexedTree};
use glam::Mat4;

use crate::types::{TransformDirty, TransformTreeIndex};

/// What a transform-tree entry stands for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransformKind {
    /// The identity root every other entry hangs from.
    Root,
    /// An authored transform with an explicit local matrix.
    Transform,
    /// An authored billboard whose local matrix depends on the camera.
    Billboard,
}

/// One entry of the transform tree.
#[derive(Clone, Debug)]
pub struct TransformTreeNode {
    object: Option<Weak<Node>>,
    kind: TransformKind,
    local: Mat4,
    world: Mat4,
}

impl TransformTreeNode {
    fn new(object: &NodeRef, kind: TransformKind) -> Self {
        Self {
            object: Some(Arc::downgrade(object)),
            kind,
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
        }
    }

    /// Kind of this entry.
    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    /// Cached local matrix.
    pub fn local(&self) -> Mat4 {
        self.local
    }

    /// Cached model-to-world matrix.
    pub fn world(&self) -> Mat4 {
        self.world
    }

    /// The authored transform or billboard, if still alive.
    pub fn object(&self) -> Option<NodeRef> {
        self.object.as_ref()?.upgrade()
    }
}

/// World-matrix cache for every transform-bearing node of a scene.
///
/// Entries are recomputed by [`TransformTree::compute`] only when they are dirty or
/// below a dirty entry.
pub struct TransformTree {
    tree: IndexedTree<TransformTreeNode, TransformDirty>,
    root: TransformTreeIndex,
    billboards: BTreeSet<TransformTreeIndex>,
    last_world_to_view: Option<Mat4>,
}

impl core::fmt::Debug for TransformTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransformTree")
            .field("nodes", &self.tree.len())
            .field("billboards", &self.billboards.len())
            .field("dirty", &self.tree.dirty_indices().len())
            .finish_non_exhaustive()
    }
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformTree {
    /// Tree holding only the identity root.
    pub fn new() -> Self {
        let mut tree = IndexedTree::new();
        let root = tree.insert_node(
            TransformTreeNode {
                object: None,
                kind: TransformKind::Root,
                local: Mat4::IDENTITY,
                world: Mat4::IDENTITY,
            },
            None,
            None,
        );
        Self {
            tree,
            root,
            billboards: BTreeSet::new(),
            last_world_to_view: None,
        }
    }

    /// The identity root.
    pub fn root(&self) -> TransformTreeIndex {
        self.root
    }

    /// Number of entries, root included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Always false: the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// True if `index` is live.
    pub fn contains(&self, index: TransformTreeIndex) -> bool {
        self.tree.contains(index)
    }

    /// Entry at `index`.
    pub fn get(&self, index: TransformTreeIndex) -> Option<&TransformTreeNode> {
        self.tree.get(index)
    }

    /// Enclosing transform of `index`; `None` for the root.
    pub fn parent(&self, index: TransformTreeIndex) -> Option<TransformTreeIndex> {
        self.tree.parent(index)
    }

    /// Cached world matrix of `index`.
    pub fn world_matrix(&self, index: TransformTreeIndex) -> Option<Mat4> {
        self.tree.get(index).map(|n| n.world)
    }

    /// Cached local matrix of `index`.
    pub fn local_matrix(&self, index: TransformTreeIndex) -> Option<Mat4> {
        self.tree.get(index).map(|n| n.local)
    }

    /// Number of live billboards.
    pub fn billboard_count(&self) -> usize {
        self.billboards.len()
    }

    /// Entries waiting for the next [`TransformTree::compute`].
    pub fn dirty_indices(&self) -> &[TransformTreeIndex] {
        self.tree.dirty_indices()
    }

    /// Add an explicit transform below `parent`. The new entry is dirty.
    pub fn add_transform(&mut self, parent: TransformTreeIndex, object: &NodeRef) -> TransformTreeIndex {
        let index = self.tree.insert_node(
            TransformTreeNode::new(object, TransformKind::Transform),
            Some(parent),
            None,
        );
        self.tree.mark_dirty(index, TransformDirty::LOCAL);
        index
    }

    /// Add a billboard below `parent`. The new entry is dirty.
    pub fn add_billboard(&mut self, parent: TransformTreeIndex, object: &NodeRef) -> TransformTreeIndex {
        let index = self.tree.insert_node(
            TransformTreeNode::new(object, TransformKind::Billboard),
            Some(parent),
            None,
        );
        self.billboards.insert(index);
        self.tree.mark_dirty(index, TransformDirty::LOCAL);
        index
    }

    /// Remove a transform and every entry below it. Returns the number removed.
    pub fn remove_transform(&mut self, index: TransformTreeIndex) -> usize {
        self.remove_subtree(index)
    }

    /// Remove a billboard and every entry below it. Returns the number removed.
    pub fn remove_billboard(&mut self, index: TransformTreeIndex) -> usize {
        self.remove_subtree(index)
    }

    fn remove_subtree(&mut self, index: TransformTreeIndex) -> usize {
        assert_ne!(index, self.root, "cannot remove the transform root");
        if !self.billboards.is_empty() {
            for id in self.tree.pre_order(index) {
                self.billboards.remove(&id);
            }
        }
        self.tree.delete_node(index)
    }

    /// Flag `index` for recomputation. Returns false if it is stale.
    pub fn mark_dirty(&mut self, index: TransformTreeIndex) -> bool {
        if !self.tree.contains(index) {
            return false;
        }
        self.tree.mark_dirty(index, TransformDirty::LOCAL);
        true
    }

    /// Recompute local and world matrices of everything dirty, parents first.
    ///
    /// Billboards are flagged first if the camera moved since the previous call.
    /// Returns the number of entries recomputed; nothing is dirty afterwards.
    pub fn compute(&mut self, camera: &Camera) -> usize {
        let world_to_view = camera.world_to_view();
        if self.last_world_to_view != Some(world_to_view) {
            for &b in &self.billboards {
                self.tree.mark_dirty(b, TransformDirty::CAMERA);
            }
            self.last_world_to_view = Some(world_to_view);
        }
        if self.tree.dirty_indices().is_empty() {
            return 0;
        }
        let visited = self
            .tree
            .process_dirty_list(TransformDirty::all(), &mut ComputeWorld { camera });
        self.tree.clear_dirty();
        log::trace!("recomputed {visited} world matrices");
        visited
    }
}

struct ComputeWorld<'a> {
    camera: &'a Camera,
}

impl DirtyVisitor<TransformTreeNode> for ComputeWorld<'_> {
    fn visit(
        &mut self,
        _index: TransformTreeIndex,
        parent: Option<&TransformTreeNode>,
        node: &mut TransformTreeNode,
    ) -> bool {
        let parent_world = parent.map_or(Mat4::IDENTITY, |p| p.world);
        if node.kind != TransformKind::Root {
            match node.object() {
                Some(object) => {
                    let local = match node.kind {
                        TransformKind::Billboard => {
                            object.billboard_matrix(self.camera, parent_world.inverse())
                        }
                        _ => object.local_matrix(),
                    };
                    if let Some(local) = local {
                        node.local = local;
                    }
                }
                None => log::warn!("transform entry outlived its authored object"),
            }
        }
        node.world = parent_world * node.local;
        true
    }
}
