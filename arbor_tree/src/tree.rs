// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: slots, sibling links, dirty bookkeeping, and iteration.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use bitflags::Flags;

use crate::types::NodeIndex;

#[derive(Clone, Debug)]
struct Slot<T, F> {
    generation: u32,
    parent: Option<NodeIndex>,
    first_child: Option<NodeIndex>,
    next_sibling: Option<NodeIndex>,
    depth: u32,
    dirty: F,
    visited: u64,
    value: T,
}

/// Array-backed tree addressed by generational [`NodeIndex`] handles.
///
/// Children are kept as a singly linked list (`first_child` / `next_sibling`), so
/// sibling order is exactly the order chosen at insertion.
/// Every node carries a dirty bit-set of type `F`; the tree maintains a dirty list of
/// all nodes whose bits are non-empty, so incremental passes cost O(dirty) instead of
/// O(nodes).
pub struct IndexedTree<T, F: Flags + Copy> {
    slots: Vec<Option<Slot<T, F>>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    dirty: Vec<NodeIndex>,
    len: usize,
    pub(crate) epoch: u64,
}

impl<T, F: Flags + Copy> core::fmt::Debug for IndexedTree<T, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexedTree")
            .field("slots_total", &self.slots.len())
            .field("nodes_alive", &self.len)
            .field("free_list", &self.free_list.len())
            .field("dirty", &self.dirty.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl<T, F: Flags + Copy> Default for IndexedTree<T, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F: Flags + Copy> IndexedTree<T, F> {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            dirty: Vec::new(),
            len: 0,
            epoch: 0,
        }
    }

    /// Create an empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut tree = Self::new();
        tree.reserve(capacity);
        tree
    }

    /// Reserve space for at least `additional` more nodes.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.generations.reserve(additional);
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` below `parent`, directly after `left_sibling`.
    ///
    /// With no `left_sibling` the node becomes the first child of `parent`.
    /// With no `parent` the node becomes a top-level root; roots have no siblings.
    ///
    /// The new node starts clean. Panics if `parent` is stale or `left_sibling` is not
    /// a child of `parent`.
    pub fn insert_node(
        &mut self,
        value: T,
        parent: Option<NodeIndex>,
        left_sibling: Option<NodeIndex>,
    ) -> NodeIndex {
        assert!(
            parent.is_some() || left_sibling.is_none(),
            "top-level nodes have no siblings"
        );
        let depth = parent.map_or(0, |p| self.slot(p).depth + 1);
        if let Some(left) = left_sibling {
            assert_eq!(
                self.slot(left).parent,
                parent,
                "left sibling {left} is not a child of the requested parent"
            );
        }

        let id = self.alloc(Slot {
            generation: 0,
            parent,
            first_child: None,
            next_sibling: None,
            depth,
            dirty: F::empty(),
            visited: 0,
            value,
        });

        match (parent, left_sibling) {
            (_, Some(left)) => {
                let next = self.slot(left).next_sibling;
                self.slot_mut(left).next_sibling = Some(id);
                self.slot_mut(id).next_sibling = next;
            }
            (Some(p), None) => {
                let first = self.slot(p).first_child;
                self.slot_mut(id).next_sibling = first;
                self.slot_mut(p).first_child = Some(id);
            }
            (None, None) => {}
        }
        self.len += 1;
        id
    }

    /// Delete `index` and its whole subtree. Returns the number of nodes removed.
    ///
    /// Sibling links in the parent are repaired and every removed node leaves the
    /// dirty list. All handles inside the subtree become stale.
    /// Panics if `index` is stale.
    pub fn delete_node(&mut self, index: NodeIndex) -> usize {
        let parent = self.slot(index).parent;
        if let Some(p) = parent {
            let next = self.slot(index).next_sibling;
            if self.slot(p).first_child == Some(index) {
                self.slot_mut(p).first_child = next;
            } else {
                let mut cur = self.slot(p).first_child;
                while let Some(c) = cur {
                    let after = self.slot(c).next_sibling;
                    if after == Some(index) {
                        self.slot_mut(c).next_sibling = next;
                        break;
                    }
                    cur = after;
                }
            }
        }

        let mut removed = 0;
        let mut had_dirty = false;
        let mut stack = vec![index];
        while let Some(id) = stack.pop() {
            let slot = self.slots[id.idx()].take().expect("dangling NodeIndex");
            had_dirty |= !slot.dirty.is_empty();
            let mut child = slot.first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.slot(c).next_sibling;
            }
            // A slot whose generation is exhausted is retired instead of reused.
            if self.generations[id.idx()] < u32::MAX {
                self.free_list.push(id.idx());
            }
            removed += 1;
        }
        self.len -= removed;

        if had_dirty {
            let slots = &self.slots;
            self.dirty.retain(|d| live_slot(slots, *d).is_some());
        }
        removed
    }

    /// Returns true if `index` refers to a live node.
    pub fn contains(&self, index: NodeIndex) -> bool {
        self.live(index).is_some()
    }

    /// Value of a live node.
    pub fn get(&self, index: NodeIndex) -> Option<&T> {
        self.live(index).map(|s| &s.value)
    }

    /// Mutable value of a live node.
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut T> {
        let s = self.slots.get_mut(index.idx())?.as_mut()?;
        if s.generation != index.1 {
            return None;
        }
        Some(&mut s.value)
    }

    /// Parent of a live node; `None` for roots and stale handles.
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.live(index)?.parent
    }

    /// First child of a live node.
    pub fn first_child(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.live(index)?.first_child
    }

    /// Next sibling of a live node.
    pub fn next_sibling(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.live(index)?.next_sibling
    }

    /// Distance to the top-level root; roots have depth `0`.
    pub fn depth(&self, index: NodeIndex) -> Option<u32> {
        self.live(index).map(|s| s.depth)
    }

    /// Iterate the children of `index` in sibling order.
    pub fn children(&self, index: NodeIndex) -> Children<'_, T, F> {
        Children {
            tree: self,
            next: self.first_child(index),
        }
    }

    /// Iterate the subtree rooted at `index` in pre-order (parents before children,
    /// siblings in order). Yields nothing for a stale handle.
    pub fn pre_order(&self, index: NodeIndex) -> PreOrder<'_, T, F> {
        let stack = if self.contains(index) {
            vec![index]
        } else {
            Vec::new()
        };
        PreOrder { tree: self, stack }
    }

    /// Add `bits` to the node's dirty set and ensure the node is on the dirty list.
    ///
    /// Panics if `index` is stale.
    pub fn mark_dirty(&mut self, index: NodeIndex, bits: F) {
        let slot = self.slot_mut(index);
        let was_clean = slot.dirty.is_empty();
        slot.dirty.insert(bits);
        if was_clean && !slot.dirty.is_empty() {
            self.dirty.push(index);
        }
    }

    /// Current dirty bits of a live node.
    pub fn dirty_bits(&self, index: NodeIndex) -> Option<F> {
        self.live(index).map(|s| s.dirty)
    }

    /// Nodes currently on the dirty list, in the order they first became dirty.
    pub fn dirty_indices(&self) -> &[NodeIndex] {
        &self.dirty
    }

    /// Clear the dirty bits of every listed node and empty the dirty list.
    pub fn clear_dirty(&mut self) {
        let dirty = core::mem::take(&mut self.dirty);
        for id in &dirty {
            if let Some(Some(slot)) = self.slots.get_mut(id.idx())
                && slot.generation == id.1
            {
                slot.dirty = F::empty();
            }
        }
        // Keep the allocation for the next frame.
        self.dirty = dirty;
        self.dirty.clear();
    }

    // --- internals ---

    fn alloc(&mut self, mut slot: Slot<T, F>) -> NodeIndex {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx] + 1;
            self.generations[idx] = generation;
            slot.generation = generation;
            self.slots[idx] = Some(slot);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeIndex uses 32-bit slots by design."
            )]
            NodeIndex::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            slot.generation = generation;
            self.slots.push(Some(slot));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeIndex uses 32-bit slots by design."
            )]
            NodeIndex::new((self.slots.len() - 1) as u32, generation)
        }
    }

    fn live(&self, index: NodeIndex) -> Option<&Slot<T, F>> {
        live_slot(&self.slots, index)
    }

    fn slot(&self, index: NodeIndex) -> &Slot<T, F> {
        self.live(index).expect("dangling NodeIndex")
    }

    fn slot_mut(&mut self, index: NodeIndex) -> &mut Slot<T, F> {
        let s = self.slots[index.idx()].as_mut().expect("dangling NodeIndex");
        assert_eq!(s.generation, index.1, "dangling NodeIndex");
        s
    }

    /// Marks `index` as visited for `epoch`; returns false if it already was.
    pub(crate) fn visit_once(&mut self, index: NodeIndex, epoch: u64) -> bool {
        let slot = self.slot_mut(index);
        if slot.visited == epoch {
            return false;
        }
        slot.visited = epoch;
        true
    }

    /// Dirty list entries matching `mask`, sorted shallowest first.
    pub(crate) fn dirty_roots(&self, mask: F) -> Vec<NodeIndex> {
        let mut roots: Vec<(u32, NodeIndex)> = self
            .dirty
            .iter()
            .filter_map(|&id| {
                let s = self.live(id)?;
                s.dirty.intersects(mask).then_some((s.depth, id))
            })
            .collect();
        roots.sort_unstable();
        roots.into_iter().map(|(_, id)| id).collect()
    }

    /// Borrow the parent's value immutably alongside the node's value mutably.
    pub(crate) fn parent_and_node_mut(&mut self, index: NodeIndex) -> (Option<&T>, &mut T) {
        let i = index.idx();
        match self.slot(index).parent.map(NodeIndex::idx) {
            None => (None, &mut self.slot_mut(index).value),
            Some(p) if p < i => {
                let (lo, hi) = self.slots.split_at_mut(i);
                let node = hi[0].as_mut().expect("dangling NodeIndex");
                (lo[p].as_ref().map(|s| &s.value), &mut node.value)
            }
            Some(p) => {
                let (lo, hi) = self.slots.split_at_mut(p);
                let node = lo[i].as_mut().expect("dangling NodeIndex");
                (hi[0].as_ref().map(|s| &s.value), &mut node.value)
            }
        }
    }
}

fn live_slot<T, F>(slots: &[Option<Slot<T, F>>], index: NodeIndex) -> Option<&Slot<T, F>> {
    let s = slots.get(index.idx())?.as_ref()?;
    (s.generation == index.1).then_some(s)
}

impl<T, F: Flags + Copy> Index<NodeIndex> for IndexedTree<T, F> {
    type Output = T;

    fn index(&self, index: NodeIndex) -> &T {
        &self.slot(index).value
    }
}

impl<T, F: Flags + Copy> IndexMut<NodeIndex> for IndexedTree<T, F> {
    fn index_mut(&mut self, index: NodeIndex) -> &mut T {
        &mut self.slot_mut(index).value
    }
}

/// Iterator over the children of a node, in sibling order.
#[derive(Debug)]
pub struct Children<'a, T, F: Flags + Copy> {
    tree: &'a IndexedTree<T, F>,
    next: Option<NodeIndex>,
}

impl<T, F: Flags + Copy> Iterator for Children<'_, T, F> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let cur = self.next?;
        self.next = self.tree.next_sibling(cur);
        Some(cur)
    }
}

/// Pre-order iterator over a subtree.
#[derive(Debug)]
pub struct PreOrder<'a, T, F: Flags + Copy> {
    tree: &'a IndexedTree<T, F>,
    stack: Vec<NodeIndex>,
}

impl<T, F: Flags + Copy> Iterator for PreOrder<'_, T, F> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let id = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(self.tree.children(id));
        self.stack[start..].reverse();
        Some(id)
    }
}
