// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root replacement.
//!
//! Swapping the scene root from another thread is picked up by the next update.
//!
//! Run:
//! - `RUST_LOG=arbor_scene_tree=debug cargo run -p arbor_demos --example root_replacement`

use std::sync::Arc;
use std::thread;

use arbor_scene::{Camera, Node, NodeRef, Scene};
use arbor_scene_tree::{DrawableEvent, DrawableEventKind, SceneTree, SceneTreeOptions};

fn level(name: &str, props: usize) -> NodeRef {
    let root = Node::group(name);
    for i in 0..props {
        root.add_child(Node::geometry(format!("{name} prop {i}")));
    }
    root
}

fn main() {
    env_logger::init();

    let scene = Arc::new(Scene::new(level("level one", 3)));
    let mut tree = SceneTree::new(scene.clone(), SceneTreeOptions::default());
    tree.set_listener(|e: &DrawableEvent| {
        if e.kind != DrawableEventKind::Changed {
            log::info!("{:?} {}", e.kind, e.index);
        }
    });
    let camera = Camera::default();
    tree.update(&camera, 1.0);

    let loader = {
        let scene = scene.clone();
        thread::spawn(move || scene.set_root_node(level("level two", 5)))
    };
    if loader.join().is_err() {
        log::error!("loader thread panicked");
        return;
    }

    let frame = tree.update(&camera, 1.0);
    println!(
        "frame {}: root replaced = {}, {} drawables",
        frame.frame,
        frame.root_replaced,
        tree.drawables().count()
    );
}
