// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Scene: the authored side of a scene graph.
//!
//! Applications build a hierarchy of shared [`Node`]s and hand its root to a [`Scene`].
//! Nodes are plain data with interior mutability: they can be edited from any thread,
//! and every relevant edit is announced through the node's [`Subject`] as an
//! [`ObjectEvent`]. Consumers such as the Arbor scene tree subscribe with a weak
//! [`Listener`] and an integer [`Payload`] and pick changes up later.
//!
//! Node kinds:
//!
//! - [`NodeKind::Group`]: plain grouping.
//! - [`NodeKind::Transform`]: explicit local matrix.
//! - [`NodeKind::Billboard`]: local matrix derived from the [`Camera`].
//! - [`NodeKind::Switch`]: at most one active child, chosen by the application.
//! - [`NodeKind::Lod`]: one active child, chosen by distance.
//! - [`NodeKind::LightSource`] and [`NodeKind::Geometry`]: leaves of interest to renderers.
//!
//! Adding or removing children does not notify; structural edits go through the
//! scene tree's subtree operations.
//!
//! # Example
//!
//! ```rust
//! use arbor_scene::{Hints, Node, Scene};
//! use glam::{Mat4, Vec3};
//!
//! let root = Node::group("root");
//! let arm = Node::transform("arm", Mat4::from_translation(Vec3::X));
//! let hand = Node::geometry("hand");
//! arm.add_child(hand.clone());
//! root.add_child(arm.clone());
//! hand.set_hints(Hints::NO_SHADOW_CASTER);
//!
//! let scene = Scene::new(root);
//! assert_eq!(scene.root_node().child_count(), 1);
//! assert_eq!(arm.local_matrix(), Some(Mat4::from_translation(Vec3::X)));
//! ```

mod camera;
mod node;
mod scene;
mod subject;

pub use camera::Camera;
pub use node::{
    Alignment, Billboard, Hints, LightSource, Lod, Node, NodeKind, NodeRef, ObjectId,
};
pub use scene::Scene;
pub use subject::{Listener, ObjectEvent, Payload, Subject};
