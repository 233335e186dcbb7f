// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene tree basics.
//!
//! Build a small scene, mirror it, move a transform, hide a branch, and remove it.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p arbor_demos --example scene_tree_basics`

use std::sync::Arc;

use arbor_scene::{Camera, Hints, LightSource, Node, Scene};
use arbor_scene_tree::{DrawableEvent, SceneTree, SceneTreeOptions};
use glam::{Mat4, Vec3};

fn main() {
    env_logger::init();

    // Build a small scene
    let root = Node::group("root");
    let table = Node::transform("table", Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)));
    let cup = Node::transform("cup", Mat4::from_translation(Vec3::Y));
    cup.add_child(Node::geometry("cup mesh"));
    table.add_child(Node::geometry("table mesh"));
    table.add_child(cup.clone());
    root.add_child(table.clone());
    root.add_child(Node::light_source("sun", LightSource::default()));

    let scene = Arc::new(Scene::new(root));
    let mut tree = SceneTree::new(scene, SceneTreeOptions::default());
    tree.set_listener(|e: &DrawableEvent| {
        let name = e.node.object().map(|o| o.name().to_owned()).unwrap_or_default();
        println!("{:?} {name} at {}", e.kind, e.index);
    });

    let camera = Camera::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
    let frame = tree.update(&camera, 1.0);
    println!(
        "frame {}: {} transforms computed, {} lights",
        frame.frame,
        frame.transforms_recomputed,
        tree.light_sources().count()
    );

    // Move the cup; only its transform is recomputed
    cup.set_local_matrix(Mat4::from_translation(Vec3::new(0.5, 1.0, 0.0)));
    let frame = tree.update(&camera, 1.0);
    println!(
        "frame {}: {} transforms computed",
        frame.frame, frame.transforms_recomputed
    );
    for index in tree.drawables() {
        let world = tree.world_matrix(index).unwrap_or_default();
        println!("  {index} at {}", world.w_axis.truncate());
    }

    // Hide the table branch
    table.set_hints(Hints::ALWAYS_INVISIBLE);
    let frame = tree.update(&camera, 1.0);
    println!(
        "frame {}: {} drawables changed, {} visible",
        frame.frame,
        frame.changed_drawables.len(),
        tree.visible_drawables().count()
    );

    // Remove it altogether
    if let Some(index) = tree.find(&table) {
        let removed = tree.remove_sub_tree(index);
        println!("removed {removed} entries");
    }
}
