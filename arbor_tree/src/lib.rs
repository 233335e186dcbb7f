// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Tree: an array-backed indexed tree with dirty tracking.
//!
//! Arbor Tree is the storage layer under the scene tree's object and transform hierarchies.
//!
//! - Nodes live in a slot vector and are addressed by generational [`NodeIndex`] handles.
//! - Children form a first-child / next-sibling list, so insertion position is explicit
//!   (first child, or directly after a given left sibling).
//! - Deleting a node deletes its whole subtree and repairs the parent's sibling links.
//! - Every node carries a dirty bit-set (any [`bitflags`] type); the tree keeps a dirty
//!   list so incremental passes only touch what changed.
//! - [`IndexedTree::process_dirty_list`] walks everything reachable from the dirty list in
//!   parent-before-child order and hands each node its parent's already-updated value.
//!
//! It is generic over the node value `T` and the dirty flag type `F` and does not depend
//! on any math crate.
//!
//! # Example
//!
//! ```rust
//! use arbor_tree::{IndexedTree, NodeIndex};
//!
//! bitflags::bitflags! {
//!     #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//!     struct Dirty: u8 {
//!         const VALUE = 1;
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Offset {
//!     local: i32,
//!     world: i32,
//! }
//!
//! let mut tree: IndexedTree<Offset, Dirty> = IndexedTree::new();
//! let root = tree.insert_node(Offset { local: 1, world: 0 }, None, None);
//! let a = tree.insert_node(Offset { local: 10, world: 0 }, Some(root), None);
//! let b = tree.insert_node(Offset { local: 20, world: 0 }, Some(root), Some(a));
//! tree.mark_dirty(root, Dirty::VALUE);
//!
//! // Recompute world offsets, parents first.
//! let visited = tree.process_dirty_list(
//!     Dirty::VALUE,
//!     &mut |_: NodeIndex, parent: Option<&Offset>, node: &mut Offset| {
//!         node.world = parent.map_or(0, |p| p.world) + node.local;
//!         true
//!     },
//! );
//! tree.clear_dirty();
//!
//! assert_eq!(visited, 3);
//! assert_eq!(tree[b].world, 21);
//! assert!(tree.dirty_indices().is_empty());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod traverse;
mod tree;
mod types;

pub use traverse::DirtyVisitor;
pub use tree::{Children, IndexedTree, PreOrder};
pub use types::NodeIndex;
