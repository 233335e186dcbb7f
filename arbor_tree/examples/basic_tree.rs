// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic indexed tree usage: build, mark dirty, traverse, delete.

use arbor_tree::{IndexedTree, NodeIndex};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Dirty: u8 {
        const DEPTH_SUM = 1;
    }
}

fn main() {
    let mut tree: IndexedTree<(u32, u32), Dirty> = IndexedTree::new();
    let root = tree.insert_node((1, 0), None, None);
    let a = tree.insert_node((2, 0), Some(root), None);
    let _b = tree.insert_node((3, 0), Some(root), Some(a));
    let _a1 = tree.insert_node((4, 0), Some(a), None);

    tree.mark_dirty(root, Dirty::DEPTH_SUM);
    let visited = tree.process_dirty_list(
        Dirty::DEPTH_SUM,
        &mut |_: NodeIndex, parent: Option<&(u32, u32)>, node: &mut (u32, u32)| {
            node.1 = parent.map_or(0, |p| p.1) + node.0;
            true
        },
    );
    tree.clear_dirty();
    println!("visited {visited} nodes");

    for id in tree.pre_order(root) {
        println!("{id}: {:?}", tree[id]);
    }

    let removed = tree.delete_node(a);
    println!("removed {removed} nodes, {} left", tree.len());
}
