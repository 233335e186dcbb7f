// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Scene Tree: an incrementally maintained, render-ready mirror of an Arbor scene.
//!
//! Applications author a hierarchy of [`arbor_scene::Node`]s and change it whenever they
//! like. A renderer needs, once per frame, current world matrices, visibility, and the
//! set of drawables. [`SceneTree`] keeps that state without re-deriving the whole scene.
//!
//! ## Two trees
//!
//! - The [`ObjectTree`] has one entry per authored node below a synthetic sentinel root.
//!   Entries carry role flags, local and effective activation, hints, and traversal mask,
//!   and the index of the transform that applies to them.
//! - The [`TransformTree`] has one entry per transform or billboard and caches world
//!   matrices. Only dirty entries and their descendants are recomputed.
//!
//! Both are [`arbor_tree::IndexedTree`]s, so every incremental pass costs O(dirty).
//!
//! ## Per-frame update
//!
//! Authored edits never touch the trees directly. Observers attached to every generated
//! entry queue them, and [`SceneTree::update`] drains the queues in a fixed order:
//!
//! 1. Root replacement, if the [`arbor_scene::Scene`] swapped its root.
//! 2. Transform changes, then world matrices for the frame's camera.
//! 3. Hint and mask changes.
//! 4. Switches whose selection changed.
//! 5. Every LOD group, against the camera and the frame's range scale.
//! 6. Effective state, parents first, below everything marked dirty.
//!
//! Drawable lifecycle is reported to one [`DrawableListener`] as [`DrawableEvent`]s:
//! `Added` when a drawable is generated, `Removed` when its subtree goes away, and
//! `Changed` when its effective state changes during an update.
//!
//! ## Structural edits
//!
//! Adding or removing authored children is not observed. Tell the scene tree with
//! [`SceneTree::add_sub_tree`], [`SceneTree::remove_sub_tree`], or
//! [`SceneTree::replace_sub_tree`]; the `try_` variants report misuse as
//! [`SceneTreeError`] instead of panicking.
//!
//! ## Minimal usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use arbor_scene::{Camera, Node, Scene};
//! use arbor_scene_tree::{DrawableEvent, SceneTree, SceneTreeOptions};
//! use glam::{Mat4, Vec3};
//!
//! let root = Node::group("root");
//! let arm = Node::transform("arm", Mat4::from_translation(Vec3::X));
//! let hand = Node::geometry("hand");
//! arm.add_child(hand.clone());
//! root.add_child(arm.clone());
//!
//! let mut tree = SceneTree::new(Arc::new(Scene::new(root)), SceneTreeOptions::default());
//! tree.set_listener(|e: &DrawableEvent| println!("{:?} {}", e.kind, e.index));
//!
//! let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
//! tree.update(&camera, 1.0);
//!
//! arm.set_local_matrix(Mat4::from_translation(Vec3::Y));
//! let changes = tree.update(&camera, 1.0);
//! assert_eq!(changes.transforms_recomputed, 1);
//!
//! let hand_index = tree.find(&hand).unwrap();
//! assert_eq!(tree.world_matrix(hand_index), Some(Mat4::from_translation(Vec3::Y)));
//! assert!(tree.is_visible(hand_index));
//! ```

mod error;
mod event;
mod generator;
mod object_tree;
mod observer;
mod options;
mod scene_tree;
mod transform_tree;
mod types;

pub use error::SceneTreeError;
pub use event::{DrawableEvent, DrawableEventKind, DrawableListener};
pub use object_tree::ObjectTree;
pub use options::SceneTreeOptions;
pub use scene_tree::{FrameChanges, SceneTree};
pub use transform_tree::{TransformKind, TransformTree, TransformTreeNode};
pub use types::{
    NodeRoles, ObjectDirty, ObjectTreeIndex, ObjectTreeNode, TransformDirty, TransformTreeIndex,
};
