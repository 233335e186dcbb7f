// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-tree configuration.

/// Options for [`SceneTree::new`](crate::SceneTree::new).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneTreeOptions {
    /// Emit [`DrawableEventKind::Changed`](crate::DrawableEventKind::Changed) when a
    /// drawable's effective state changes during an update.
    pub emit_change_events: bool,
    /// Number of object-tree entries to reserve up front.
    pub capacity_hint: usize,
}

impl Default for SceneTreeOptions {
    fn default() -> Self {
        Self {
            emit_change_events: true,
            capacity_hint: 0,
        }
    }
}
