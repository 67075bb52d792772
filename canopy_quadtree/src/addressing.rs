// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Implicit tree addressing: node identity and parent/child arithmetic.
//!
//! Nodes live in one flat sequence. Index 0 is unused and index 1 is always
//! the root, so a node's relatives are pure arithmetic over its id:
//!
//! ```text
//! |  1   |  2  |  3  |  4  |  5  | ...
//! | root | tl0 | bl0 | tr0 | br0 | ...
//! ```
//!
//! first child of `n` is `4n - 2`, the parent of `n` is `(n + 2) / 4`, and
//! `(n + 2) % 4` is `n`'s quadrant within its parent. Any id is addressable
//! once its ancestors are activated; absent subtrees cost nothing beyond the
//! allocated prefix of the sequence.

/// Identifier of a node in the implicit tree.
///
/// Ids are plain arithmetic positions, not generational handles: a `NodeId`
/// returned from a query stays valid for the lifetime of the tree (nodes are
/// never deleted), though the node it names may later turn from a leaf into a
/// branch.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The root node. Always activated.
    pub const ROOT: Self = Self(1);

    /// First of the four children, in quadrant order
    /// top-left, bottom-left, top-right, bottom-right.
    #[inline]
    pub(crate) const fn first_child(self) -> Self {
        Self(4 * self.0 - 2)
    }

    /// The child in the given quadrant (0..4).
    #[inline]
    pub(crate) const fn child(self, quadrant: u8) -> Self {
        Self(self.first_child().0 + quadrant as u32)
    }

    /// The parent id.
    ///
    /// Only meaningful for ids below the root; the root must not be ascended
    /// past.
    #[inline]
    pub const fn parent(self) -> Self {
        Self((self.0 + 2) / 4)
    }

    /// This node's quadrant within its parent, in the fixed order
    /// top-left (0), bottom-left (1), top-right (2), bottom-right (3).
    #[inline]
    pub const fn quadrant(self) -> u8 {
        ((self.0 + 2) % 4) as u8
    }

    /// Position in the flat node sequence.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}
