// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Authored scene objects.
//!
//! A [`Node`] is shared as a [`NodeRef`] and may be mutated from any thread.
//! Its [`NodeKind`] is fixed at construction; everything else lives behind a lock
//! and every mutation that matters to a scene tree emits an [`ObjectEvent`]
//! through the node's [`Subject`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat3, Mat4, Vec3};
use parking_lot::RwLock;

use crate::camera::Camera;
use crate::subject::{ObjectEvent, Subject};

/// Shared handle to an authored node.
pub type NodeRef = Arc<Node>;

/// Process-unique identity of an authored object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

bitflags::bitflags! {
    /// Rendering hints. Hints are inherited: a node's effective hints are the union of
    /// its own and all of its ancestors'.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Hints: u32 {
        /// Never drawn, regardless of activation.
        const ALWAYS_INVISIBLE = 0b0001;
        /// Drawn on top of the regular scene.
        const OVERLAY          = 0b0010;
        /// Content changes often; prefer dynamic storage.
        const DYNAMIC          = 0b0100;
        /// Excluded from shadow passes.
        const NO_SHADOW_CASTER = 0b1000;
    }
}

/// Role of a node, fixed at construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// Plain grouping node.
    Group,
    /// Group with an explicit local matrix.
    Transform,
    /// Group whose local matrix follows the camera.
    Billboard,
    /// Group with at most one active child, chosen by the application.
    Switch,
    /// Group with one active child chosen by distance to the camera.
    Lod,
    /// Light source.
    LightSource,
    /// Drawable geometry.
    Geometry,
}

/// How a billboard orients itself.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Alignment {
    /// Copy the viewer's orientation so the billboard stays parallel to the screen.
    Screen,
    /// Rotate about the given local axis until local +Z points at the viewer.
    Axis(Vec3),
}

/// Billboard parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Billboard {
    /// Orientation rule.
    pub alignment: Alignment,
    /// Local translation applied after the rotation.
    pub translation: Vec3,
}

impl Default for Billboard {
    fn default() -> Self {
        Self {
            alignment: Alignment::Screen,
            translation: Vec3::ZERO,
        }
    }
}

impl Billboard {
    /// Local matrix for `camera`, given the billboard's parent world-to-model matrix.
    pub fn matrix(&self, camera: &Camera, world_to_model: Mat4) -> Mat4 {
        let rotation = match self.alignment {
            Alignment::Screen => {
                let view_in_model = world_to_model * camera.view_to_world();
                Mat3::from_cols(
                    view_in_model.x_axis.truncate().normalize_or_zero(),
                    view_in_model.y_axis.truncate().normalize_or_zero(),
                    view_in_model.z_axis.truncate().normalize_or_zero(),
                )
            }
            Alignment::Axis(axis) => {
                let axis = axis.normalize_or_zero();
                let eye = world_to_model.transform_point3(camera.position());
                let to_eye = eye - self.translation;
                let facing = to_eye - axis * to_eye.dot(axis);
                if axis == Vec3::ZERO || facing.length_squared() <= f32::EPSILON {
                    Mat3::IDENTITY
                } else {
                    let z = facing.normalize();
                    Mat3::from_cols(axis.cross(z), axis, z)
                }
            }
        };
        Mat4::from_translation(self.translation) * Mat4::from_mat3(rotation)
    }
}

/// Level-of-detail parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Lod {
    /// Point whose view-space distance selects the level.
    pub center: Vec3,
    /// Switch distances, ascending. Level `i` is used below `ranges[i]`.
    pub ranges: Vec<f32>,
}

impl Lod {
    /// Level to use for `child_count` children.
    ///
    /// The level is the number of ranges `r` with `distance >= r * range_scale`,
    /// clamped to the last child. `None` without children.
    pub fn select(&self, model_to_view: Mat4, range_scale: f32, child_count: usize) -> Option<usize> {
        if child_count == 0 {
            return None;
        }
        let distance = model_to_view.transform_point3(self.center).length();
        let level = self
            .ranges
            .iter()
            .filter(|&&r| distance >= r * range_scale)
            .count();
        Some(level.min(child_count - 1))
    }
}

/// Light parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightSource {
    /// Linear RGB color.
    pub color: Vec3,
    /// Scalar intensity.
    pub intensity: f32,
}

impl Default for LightSource {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
enum NodeData {
    Group,
    Transform(Mat4),
    Billboard(Billboard),
    Switch(Option<usize>),
    Lod(Lod),
    LightSource(LightSource),
    Geometry,
}

#[derive(Debug)]
struct NodeState {
    hints: Hints,
    traversal_mask: u32,
    children: Vec<NodeRef>,
    data: NodeData,
}

/// An authored scene object.
pub struct Node {
    id: ObjectId,
    name: String,
    kind: NodeKind,
    state: RwLock<NodeState>,
    subject: Subject,
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Node {
    fn with_data(name: impl Into<String>, kind: NodeKind, data: NodeData) -> NodeRef {
        Arc::new(Self {
            id: ObjectId::next(),
            name: name.into(),
            kind,
            state: RwLock::new(NodeState {
                hints: Hints::empty(),
                traversal_mask: !0,
                children: Vec::new(),
                data,
            }),
            subject: Subject::new(),
        })
    }

    /// Plain group.
    pub fn group(name: impl Into<String>) -> NodeRef {
        Self::with_data(name, NodeKind::Group, NodeData::Group)
    }

    /// Transform group with the given local matrix.
    pub fn transform(name: impl Into<String>, local: Mat4) -> NodeRef {
        Self::with_data(name, NodeKind::Transform, NodeData::Transform(local))
    }

    /// Billboard group.
    pub fn billboard(name: impl Into<String>, billboard: Billboard) -> NodeRef {
        Self::with_data(name, NodeKind::Billboard, NodeData::Billboard(billboard))
    }

    /// Switch with an initially active child ordinal.
    pub fn switch(name: impl Into<String>, active: Option<usize>) -> NodeRef {
        Self::with_data(name, NodeKind::Switch, NodeData::Switch(active))
    }

    /// Level-of-detail group.
    pub fn lod(name: impl Into<String>, lod: Lod) -> NodeRef {
        Self::with_data(name, NodeKind::Lod, NodeData::Lod(lod))
    }

    /// Light source.
    pub fn light_source(name: impl Into<String>, light: LightSource) -> NodeRef {
        Self::with_data(name, NodeKind::LightSource, NodeData::LightSource(light))
    }

    /// Drawable geometry.
    pub fn geometry(name: impl Into<String>) -> NodeRef {
        Self::with_data(name, NodeKind::Geometry, NodeData::Geometry)
    }

    /// Identity of this object.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of this node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Subscription list for change notifications.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Snapshot of the children, in order.
    pub fn children(&self) -> Vec<NodeRef> {
        self.state.read().children.clone()
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.state.read().children.len()
    }

    /// Append a child. The scene tree is not told; use its subtree operations.
    pub fn add_child(&self, child: NodeRef) {
        self.state.write().children.push(child);
    }

    /// Insert a child at `position` (clamped to the child count).
    pub fn insert_child(&self, position: usize, child: NodeRef) {
        let mut state = self.state.write();
        let position = position.min(state.children.len());
        state.children.insert(position, child);
    }

    /// Remove the first occurrence of `child`. Returns true if it was present.
    pub fn remove_child(&self, child: &NodeRef) -> bool {
        let mut state = self.state.write();
        let Some(pos) = state.children.iter().position(|c| Arc::ptr_eq(c, child)) else {
            return false;
        };
        state.children.remove(pos);
        true
    }

    /// Local hints.
    pub fn hints(&self) -> Hints {
        self.state.read().hints
    }

    /// Local traversal mask.
    pub fn traversal_mask(&self) -> u32 {
        self.state.read().traversal_mask
    }

    /// Replace the local hints.
    pub fn set_hints(&self, hints: Hints) {
        let traversal_mask = {
            let mut state = self.state.write();
            state.hints = hints;
            state.traversal_mask
        };
        self.subject.notify(&ObjectEvent::AttributesChanged {
            hints,
            traversal_mask,
        });
    }

    /// Replace the local traversal mask.
    pub fn set_traversal_mask(&self, traversal_mask: u32) {
        let hints = {
            let mut state = self.state.write();
            state.traversal_mask = traversal_mask;
            state.hints
        };
        self.subject.notify(&ObjectEvent::AttributesChanged {
            hints,
            traversal_mask,
        });
    }

    /// Local matrix of a transform node.
    pub fn local_matrix(&self) -> Option<Mat4> {
        match self.state.read().data {
            NodeData::Transform(m) => Some(m),
            _ => None,
        }
    }

    /// Replace the local matrix of a transform node. Returns false for other kinds.
    pub fn set_local_matrix(&self, local: Mat4) -> bool {
        {
            let mut state = self.state.write();
            let NodeData::Transform(m) = &mut state.data else {
                log::warn!("set_local_matrix on non-transform node {:?}", self.name);
                return false;
            };
            *m = local;
        }
        self.subject.notify(&ObjectEvent::TransformChanged);
        true
    }

    /// Billboard parameters of a billboard node.
    pub fn billboard_params(&self) -> Option<Billboard> {
        match self.state.read().data {
            NodeData::Billboard(b) => Some(b),
            _ => None,
        }
    }

    /// Replace the billboard parameters. Returns false for other kinds.
    pub fn set_billboard(&self, billboard: Billboard) -> bool {
        {
            let mut state = self.state.write();
            let NodeData::Billboard(b) = &mut state.data else {
                log::warn!("set_billboard on non-billboard node {:?}", self.name);
                return false;
            };
            *b = billboard;
        }
        self.subject.notify(&ObjectEvent::TransformChanged);
        true
    }

    /// Camera-dependent local matrix of a billboard node.
    pub fn billboard_matrix(&self, camera: &Camera, world_to_model: Mat4) -> Option<Mat4> {
        self.billboard_params()
            .map(|b| b.matrix(camera, world_to_model))
    }

    /// Active child ordinal of a switch node.
    pub fn active_child(&self) -> Option<usize> {
        match self.state.read().data {
            NodeData::Switch(active) => active,
            _ => None,
        }
    }

    /// Select the active child of a switch node. Returns false for other kinds.
    ///
    /// The ordinal is not validated; an out-of-range ordinal activates nothing.
    pub fn set_active_child(&self, active: Option<usize>) -> bool {
        {
            let mut state = self.state.write();
            let NodeData::Switch(current) = &mut state.data else {
                log::warn!("set_active_child on non-switch node {:?}", self.name);
                return false;
            };
            *current = active;
        }
        self.subject.notify(&ObjectEvent::ActiveChildChanged);
        true
    }

    /// Level-of-detail parameters of a LOD node.
    pub fn lod_params(&self) -> Option<Lod> {
        match &self.state.read().data {
            NodeData::Lod(lod) => Some(lod.clone()),
            _ => None,
        }
    }

    /// Replace LOD parameters. LODs are re-evaluated every frame, so no event is sent.
    pub fn set_lod(&self, lod: Lod) -> bool {
        let mut state = self.state.write();
        let NodeData::Lod(current) = &mut state.data else {
            return false;
        };
        *current = lod;
        true
    }

    /// Child ordinal a LOD node selects for `model_to_view` and `range_scale`.
    pub fn lod_to_use(&self, model_to_view: Mat4, range_scale: f32) -> Option<usize> {
        let state = self.state.read();
        match &state.data {
            NodeData::Lod(lod) => lod.select(model_to_view, range_scale, state.children.len()),
            _ => None,
        }
    }

    /// Light parameters of a light source node.
    pub fn light(&self) -> Option<LightSource> {
        match self.state.read().data {
            NodeData::LightSource(l) => Some(l),
            _ => None,
        }
    }
}
