// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Switches and LODs.
//!
//! A switch flips between two variants on demand; a LOD picks a level from the camera
//! distance every frame.
//!
//! Run:
//! - `cargo run -p arbor_demos --example switch_and_lod`

use std::sync::Arc;

use arbor_scene::{Camera, Lod, Node, Scene};
use arbor_scene_tree::{SceneTree, SceneTreeOptions};
use glam::Vec3;

fn main() {
    env_logger::init();

    let root = Node::group("root");
    let door = Node::switch("door", Some(0));
    door.add_child(Node::geometry("closed"));
    door.add_child(Node::geometry("open"));
    let tree_lod = Node::lod(
        "tree",
        Lod {
            center: Vec3::ZERO,
            ranges: vec![10.0, 40.0],
        },
    );
    for level in ["tree high", "tree mid", "tree low"] {
        tree_lod.add_child(Node::geometry(level));
    }
    root.add_child(door.clone());
    root.add_child(tree_lod);

    let mut tree = SceneTree::new(Arc::new(Scene::new(root)), SceneTreeOptions::default());
    let show = |tree: &SceneTree| {
        let names: Vec<String> = tree
            .visible_drawables()
            .filter_map(|i| tree.node(i)?.object())
            .map(|o| o.name().to_owned())
            .collect();
        println!("  visible: {names:?}");
    };

    for distance in [5.0, 20.0, 80.0] {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, Vec3::Y);
        let frame = tree.update(&camera, 1.0);
        println!(
            "camera at {distance}: {} entries flagged",
            frame.dirty_objects.len()
        );
        show(&tree);
    }

    door.set_active_child(Some(1));
    let camera = Camera::look_at(Vec3::new(0.0, 0.0, 80.0), Vec3::ZERO, Vec3::Y);
    let frame = tree.update(&camera, 1.0);
    println!("door opened: {} entries flagged", frame.dirty_objects.len());
    show(&tree);

    // A larger range scale keeps finer levels at the same distance
    let frame = tree.update(&camera, 4.0);
    println!("range scale 4: {} entries flagged", frame.dirty_objects.len());
    show(&tree);
}
