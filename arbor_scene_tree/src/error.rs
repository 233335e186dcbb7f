// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the checked subtree operations.

use crate::types::ObjectTreeIndex;

/// Misuse of a [`SceneTree`](crate::SceneTree) subtree operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SceneTreeError {
    /// The index refers to an entry that was already removed.
    #[error("object tree index {0} is stale")]
    StaleIndex(ObjectTreeIndex),
    /// The sentinel root cannot be removed or replaced.
    #[error("cannot remove the sentinel root")]
    SentinelRoot,
    /// The requested left sibling is not a child of the requested parent.
    #[error("{left} is not a child of {parent}")]
    NotAChild {
        /// Requested parent.
        parent: ObjectTreeIndex,
        /// Requested left sibling.
        left: ObjectTreeIndex,
    },
}
