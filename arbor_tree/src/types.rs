// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the indexed tree: node handles and their packed form.

/// Handle of a node in an [`IndexedTree`](crate::IndexedTree).
///
/// This is a small, copyable handle that stays stable while its node is alive and
/// becomes stale when the node (or an ancestor) is deleted.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On delete, the slot is freed; any existing `NodeIndex` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeIndex`.
/// - A slot whose generation reaches `u32::MAX` is retired when freed and never reused.
///
/// Stale handles never alias a different live node because the generation must match.
/// Use [`IndexedTree::contains`](crate::IndexedTree::contains) to check liveness.
///
/// ## Ordering
///
/// Handles order by slot first and generation second.
/// The order carries no structural meaning; it only makes side tables keyed by
/// `NodeIndex` iterate deterministically.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeIndex(pub(crate) u32, pub(crate) u32);

impl NodeIndex {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Slot position of this handle inside the tree's storage.
    pub const fn slot(self) -> u32 {
        self.0
    }

    /// Generation of the slot when this handle was issued.
    pub const fn generation(self) -> u32 {
        self.1
    }

    /// Packs the handle into a single `u64`.
    ///
    /// Useful as an opaque payload when registering with listeners that only carry integers.
    pub const fn to_bits(self) -> u64 {
        ((self.0 as u64) << 32) | self.1 as u64
    }

    /// Inverse of [`NodeIndex::to_bits`].
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Both halves were produced from u32 values by `to_bits`."
    )]
    pub const fn from_bits(bits: u64) -> Self {
        Self((bits >> 32) as u32, bits as u32)
    }
}

impl core::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}v{}", self.0, self.1)
    }
}
