// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene tree: indices, dirty bits, roles, and object-tree entries.

use std::sync::Weak;

use arbor_scene::{Hints, Node, NodeRef};
use arbor_tree::NodeIndex;

/// Index of an entry in the object tree.
pub type ObjectTreeIndex = NodeIndex;

/// Index of an entry in the transform tree.
pub type TransformTreeIndex = NodeIndex;

bitflags::bitflags! {
    /// Why an object-tree entry needs its effective state recomputed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ObjectDirty: u8 {
        /// Local activation changed (switch or LOD resolution).
        const ACTIVE  = 0b001;
        /// Local hints changed.
        const HINTS   = 0b010;
        /// Local traversal mask changed.
        const MASK    = 0b100;
        /// Everything.
        const DEFAULT = Self::ACTIVE.bits() | Self::HINTS.bits() | Self::MASK.bits();
    }
}

bitflags::bitflags! {
    /// Why a transform-tree entry needs its matrices recomputed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TransformDirty: u8 {
        /// The authored local matrix or billboard parameters changed, or the entry is new.
        const LOCAL  = 0b01;
        /// The camera moved; only billboards care.
        const CAMERA = 0b10;
    }
}

bitflags::bitflags! {
    /// What an object-tree entry stands for, decided once when it is generated.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NodeRoles: u8 {
        /// Introduces an explicit transform.
        const TRANSFORM = 0b00_0001;
        /// Introduces a billboard transform.
        const BILLBOARD = 0b00_0010;
        /// Registered as a drawable.
        const DRAWABLE  = 0b00_0100;
        /// Registered as a light source.
        const LIGHT     = 0b00_1000;
        /// Registered as a switch.
        const SWITCH    = 0b01_0000;
        /// Registered as a level-of-detail group.
        const LOD       = 0b10_0000;
    }
}

/// One entry of the object tree.
///
/// Entries mirror authored nodes one to one, except the sentinel root which has no
/// authored object.
#[derive(Clone, Debug)]
pub struct ObjectTreeNode {
    pub(crate) object: Option<Weak<Node>>,
    pub(crate) transform: TransformTreeIndex,
    pub(crate) transform_parent: Option<TransformTreeIndex>,
    pub(crate) roles: NodeRoles,
    pub(crate) local_active: bool,
    pub(crate) local_hints: Hints,
    pub(crate) local_mask: u32,
    pub(crate) world_active: bool,
    pub(crate) world_hints: Hints,
    pub(crate) world_mask: u32,
}

impl ObjectTreeNode {
    pub(crate) fn sentinel(transform: TransformTreeIndex) -> Self {
        Self {
            object: None,
            transform,
            transform_parent: None,
            roles: NodeRoles::empty(),
            local_active: true,
            local_hints: Hints::empty(),
            local_mask: !0,
            world_active: true,
            world_hints: Hints::empty(),
            world_mask: !0,
        }
    }

    /// Recompute effective state from the parent's effective state.
    ///
    /// Returns true if any effective value changed.
    pub(crate) fn inherit(&mut self, parent: Option<&Self>) -> bool {
        let (active, hints, mask) = match parent {
            Some(p) => (
                p.world_active && self.local_active,
                p.world_hints | self.local_hints,
                p.world_mask & self.local_mask,
            ),
            None => (self.local_active, self.local_hints, self.local_mask),
        };
        let changed =
            active != self.world_active || hints != self.world_hints || mask != self.world_mask;
        self.world_active = active;
        self.world_hints = hints;
        self.world_mask = mask;
        changed
    }

    /// The authored object, if it is still alive. `None` for the sentinel.
    pub fn object(&self) -> Option<NodeRef> {
        self.object.as_ref()?.upgrade()
    }

    /// Transform-tree entry whose world matrix applies to this node.
    pub fn transform(&self) -> TransformTreeIndex {
        self.transform
    }

    /// Transform-tree entry of the enclosing transform, if this node introduces its own.
    pub fn transform_parent(&self) -> Option<TransformTreeIndex> {
        self.transform_parent
    }

    /// Role flags.
    pub fn roles(&self) -> NodeRoles {
        self.roles
    }

    /// True if this node introduces a transform or billboard.
    pub fn introduces_transform(&self) -> bool {
        self.transform_parent.is_some()
    }

    /// True if this node introduces an explicit transform.
    pub fn is_transform(&self) -> bool {
        self.roles.contains(NodeRoles::TRANSFORM)
    }

    /// True if this node introduces a billboard.
    pub fn is_billboard(&self) -> bool {
        self.roles.contains(NodeRoles::BILLBOARD)
    }

    /// True if this node is a registered drawable.
    pub fn is_drawable(&self) -> bool {
        self.roles.contains(NodeRoles::DRAWABLE)
    }

    /// True if this node is a registered light source.
    pub fn is_light(&self) -> bool {
        self.roles.contains(NodeRoles::LIGHT)
    }

    /// Activation as decided by the parent switch or LOD (always true elsewhere).
    pub fn local_active(&self) -> bool {
        self.local_active
    }

    /// Hints set on the authored node itself.
    pub fn local_hints(&self) -> Hints {
        self.local_hints
    }

    /// Traversal mask set on the authored node itself.
    pub fn local_mask(&self) -> u32 {
        self.local_mask
    }

    /// Local activation AND-ed along the ancestor chain.
    pub fn world_active(&self) -> bool {
        self.world_active
    }

    /// Hints OR-ed along the ancestor chain.
    pub fn world_hints(&self) -> Hints {
        self.world_hints
    }

    /// Traversal mask AND-ed along the ancestor chain.
    pub fn world_mask(&self) -> u32 {
        self.world_mask
    }

    /// Active on the whole ancestor chain and not hinted invisible.
    pub fn is_visible(&self) -> bool {
        self.world_active && !self.world_hints.contains(Hints::ALWAYS_INVISIBLE)
    }
}
