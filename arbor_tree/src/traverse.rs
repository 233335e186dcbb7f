// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent-first traversal of the dirty list.
//!
//! [`IndexedTree::process_dirty_list`] visits every node reachable from a dirty root
//! exactly once, always after its parent has been visited in the same pass.
//! Dirty roots are processed shallowest first, so a dirty node below another dirty
//! node is reached through its ancestor and never sees a stale parent value.

use alloc::vec::Vec;

use bitflags::Flags;

use crate::tree::IndexedTree;
use crate::types::NodeIndex;

/// Per-node callback for [`IndexedTree::process_dirty_list`].
pub trait DirtyVisitor<T> {
    /// Recompute `node` from its already-updated `parent` (`None` for top-level roots).
    ///
    /// Return `false` to skip the node's children. Skipped children that are dirty
    /// themselves are still visited as dirty roots.
    fn visit(&mut self, index: NodeIndex, parent: Option<&T>, node: &mut T) -> bool;
}

impl<T, V: FnMut(NodeIndex, Option<&T>, &mut T) -> bool> DirtyVisitor<T> for V {
    fn visit(&mut self, index: NodeIndex, parent: Option<&T>, node: &mut T) -> bool {
        self(index, parent, node)
    }
}

impl<T, F: Flags + Copy> IndexedTree<T, F> {
    /// Visit all nodes reachable from dirty nodes whose bits intersect `mask`.
    ///
    /// Returns the number of visited nodes. Dirty bits are left untouched; call
    /// [`IndexedTree::clear_dirty`] once the pass is complete.
    pub fn process_dirty_list<V: DirtyVisitor<T>>(&mut self, mask: F, visitor: &mut V) -> usize {
        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;
        let mut visited = 0;
        let mut stack: Vec<NodeIndex> = Vec::new();
        for root in self.dirty_roots(mask) {
            stack.push(root);
            while let Some(id) = stack.pop() {
                if !self.visit_once(id, epoch) {
                    continue;
                }
                visited += 1;
                let (parent, node) = self.parent_and_node_mut(id);
                if visitor.visit(id, parent, node) {
                    let start = stack.len();
                    stack.extend(self.children(id));
                    stack[start..].reverse();
                }
            }
        }
        log::trace!("dirty traversal visited {visited} nodes");
        visited
    }
}
