// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use arbor_scene::{Camera, Lod, Node, NodeRef, Scene};
use arbor_scene_tree::{SceneTree, SceneTreeOptions};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::{Mat4, Vec3};

/// A grid of `n * n` transform cells. Each cell holds a switch of two drawables and a
/// two-level LOD.
struct Grid {
    root: NodeRef,
    cells: Vec<NodeRef>,
    switches: Vec<NodeRef>,
}

fn gen_grid(n: usize) -> Grid {
    let root = Node::group("grid");
    let mut cells = Vec::with_capacity(n * n);
    let mut switches = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let offset = Vec3::new(x as f32 * 4.0, 0.0, y as f32 * 4.0);
            let cell = Node::transform("cell", Mat4::from_translation(offset));
            let sw = Node::switch("sw", Some(0));
            sw.add_child(Node::geometry("on"));
            sw.add_child(Node::geometry("off"));
            let lod = Node::lod(
                "lod",
                Lod {
                    center: Vec3::ZERO,
                    ranges: vec![25.0],
                },
            );
            lod.add_child(Node::geometry("near"));
            lod.add_child(Node::geometry("far"));
            cell.add_child(sw.clone());
            cell.add_child(lod);
            root.add_child(cell.clone());
            cells.push(cell);
            switches.push(sw);
        }
    }
    Grid {
        root,
        cells,
        switches,
    }
}

fn camera_at(z: f32) -> Camera {
    Camera::look_at(Vec3::new(0.0, 10.0, z), Vec3::ZERO, Vec3::Y)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_tree_build");
    for &n in &[8_usize, 32] {
        let grid = gen_grid(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("grid_{n}x{n}"), |b| {
            b.iter(|| {
                let scene = Arc::new(Scene::new(grid.root.clone()));
                black_box(SceneTree::new(scene, SceneTreeOptions::default()))
            });
        });
    }
    group.finish();
}

fn bench_idle_update(c: &mut Criterion) {
    let grid = gen_grid(32);
    let mut tree = SceneTree::new(Arc::new(Scene::new(grid.root.clone())), SceneTreeOptions::default());
    let camera = camera_at(50.0);
    tree.update(&camera, 1.0);
    c.bench_function("scene_tree_update_idle_32x32", |b| {
        b.iter(|| black_box(tree.update(&camera, 1.0)));
    });
}

fn bench_toggle_switches(c: &mut Criterion) {
    let grid = gen_grid(32);
    let mut tree = SceneTree::new(Arc::new(Scene::new(grid.root.clone())), SceneTreeOptions::default());
    let camera = camera_at(50.0);
    tree.update(&camera, 1.0);
    let mut group = c.benchmark_group("scene_tree_toggle");
    for &k in &[1_usize, 64, 1024] {
        group.throughput(Throughput::Elements(k as u64));
        let mut flip = false;
        group.bench_function(format!("switches_{k}"), |b| {
            b.iter(|| {
                flip = !flip;
                let active = Some(usize::from(flip));
                for sw in grid.switches.iter().take(k) {
                    sw.set_active_child(active);
                }
                black_box(tree.update(&camera, 1.0))
            });
        });
    }
    group.finish();
}

fn bench_move_cells(c: &mut Criterion) {
    let grid = gen_grid(32);
    let mut tree = SceneTree::new(Arc::new(Scene::new(grid.root.clone())), SceneTreeOptions::default());
    tree.update(&camera_at(50.0), 1.0);
    c.bench_function("scene_tree_move_camera_and_64_cells", |b| {
        b.iter_batched(
            || {
                for cell in grid.cells.iter().take(64) {
                    cell.set_local_matrix(Mat4::from_translation(Vec3::Y));
                }
            },
            |()| black_box(tree.update(&camera_at(60.0), 1.0)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_idle_update,
    bench_toggle_switches,
    bench_move_cells
);
criterion_main!(benches);
