// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbor_tree::{IndexedTree, NodeIndex};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Dirty: u8 {
        const VALUE = 1;
    }
}

/// Complete tree of the given fanout and depth, plus its root and leaves.
fn gen_tree(fanout: usize, depth: usize) -> (IndexedTree<u64, Dirty>, NodeIndex, Vec<NodeIndex>) {
    let mut tree = IndexedTree::new();
    let root = tree.insert_node(1, None, None);
    let mut level = vec![root];
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for &parent in &level {
            let mut left = None;
            for i in 0..fanout {
                let id = tree.insert_node(i as u64, Some(parent), left);
                left = Some(id);
                next.push(id);
            }
        }
        level = next;
    }
    (tree, root, level)
}

fn sum_down(_: NodeIndex, parent: Option<&u64>, node: &mut u64) -> bool {
    *node = parent.copied().unwrap_or(0).wrapping_add(*node & 0xff);
    true
}

fn bench_traversal(c: &mut Criterion) {
    let (mut tree, root, leaves) = gen_tree(8, 5);
    let mut group = c.benchmark_group("dirty_traversal");

    group.throughput(Throughput::Elements(tree.len() as u64));
    group.bench_function("whole_tree", |b| {
        b.iter(|| {
            tree.mark_dirty(root, Dirty::VALUE);
            let visited = tree.process_dirty_list(Dirty::VALUE, &mut sum_down);
            tree.clear_dirty();
            black_box(visited)
        });
    });

    let sample: Vec<NodeIndex> = leaves.iter().step_by(64).copied().collect();
    group.throughput(Throughput::Elements(sample.len() as u64));
    group.bench_function("sparse_leaves", |b| {
        b.iter(|| {
            for &leaf in &sample {
                tree.mark_dirty(leaf, Dirty::VALUE);
            }
            let visited = tree.process_dirty_list(Dirty::VALUE, &mut sum_down);
            tree.clear_dirty();
            black_box(visited)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_traversal);
criterion_main!(benches);
