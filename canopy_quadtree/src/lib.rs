// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=canopy_quadtree --heading-base-level=0

//! Canopy Quadtree: an implicit, array-backed quadtree for 2D points.
//!
//! Canopy Quadtree is a reusable building block for nearest-neighbor lookups
//! over dynamically inserted point data, tuned for spatially coherent query
//! sequences such as a probe point moving a little between frames.
//!
//! - Insert points with caller-supplied `u32` data ids; elements are
//!   append-only (no removal or rebalancing).
//! - Query the nearest stored element exactly, approximately (bounded error,
//!   fewer node visits), or restricted to the query point's neighborhood.
//! - Reuse the node returned by one query as the starting hint for the next
//!   ([`Quadtree::nearest_from`]) to skip re-descending from the root.
//!
//! The tree itself is pointer-free: nodes live in one flat array and a node's
//! parent, children, and quadrant are derived arithmetically from its id, so
//! traversal is index math over a compact arena. Node rectangles are stored
//! in a quantized u16 coordinate space; real-world coordinates are normalized
//! at the boundary.
//!
//! # Example
//!
//! ```rust
//! use canopy_quadtree::{Config, Quadtree};
//! use kurbo::{Point, Rect};
//!
//! // A tree over [0, 100] x [0, 100], subdividing leaves that exceed two
//! // elements, at most four levels deep.
//! let mut tree = Quadtree::new(Config::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 2));
//! tree.insert(Point::new(10.0, 10.0), 1).unwrap();
//! tree.insert(Point::new(10.0, 12.0), 2).unwrap();
//! tree.insert(Point::new(90.0, 90.0), 3).unwrap();
//!
//! let hit = tree.nearest(Point::new(11.0, 10.5)).unwrap();
//! assert_eq!(hit.data, 1);
//!
//! // Points outside the configured bounds are rejected.
//! assert!(tree.insert(Point::new(150.0, 50.0), 4).is_err());
//!
//! // A moving probe can hand each answer back as the hint for the next query.
//! let hit2 = tree.nearest_from(Point::new(12.0, 10.0), hit.node).unwrap();
//! assert_eq!(hit2.data, 1);
//! ```
//!
//! ## Search modes
//!
//! - Exact (default): [`Quadtree::nearest`] returns the true nearest element.
//! - Approximate: [`Config::approx`] shrinks the pruning ball by a rate in
//!   `(0, 1]`; the match is never farther than the true nearest distance
//!   divided by that rate.
//! - Adjacent-only: [`Config::adjacent_only`] restricts the search to the
//!   leaf containing the query point and its three siblings, for callers that
//!   only care about nearby structure.
//! - Cached: [`Quadtree::nearest_from`] starts from a previously returned
//!   node, ascending just far enough to guarantee the answer, then descending
//!   as usual. Invalid or stale hints safely degrade to the full search.
//!
//! The `_counted` variants of both searches also report how many nodes the
//! traversal popped, for performance measurement.
//!
//! ## Concurrency
//!
//! The tree is a single-threaded structure: queries borrow `&self`, inserts
//! `&mut self`, and all per-call scratch state lives on the stack, so the
//! usual borrow rules are the whole synchronization story.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod addressing;
mod search;
mod tree;
mod types;

pub use addressing::NodeId;
pub use search::Nearest;
pub use tree::Quadtree;
pub use types::{Config, OutOfBounds, SearchFlags};
