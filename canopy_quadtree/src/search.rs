// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nearest-neighbor search: exact, approximate, adjacent-only, and cached.
//!
//! All variants share one iterative engine driven by an explicit node stack.
//! Two geometric tests do the pruning, both in squared-distance form so no
//! square root is ever taken:
//!
//! - *Ball-Overlap-Bound* (BOB): a child subtree is only visited if the ball
//!   around the query point with the current best radius reaches into the
//!   child's rectangle.
//! - *Ball-Within-Bound* (BWB): once the ball lies entirely inside the
//!   rectangle of the leaf just scanned, nothing outside that leaf can be
//!   closer and the search stops early.
//!
//! The approximate mode shrinks the ball used in both tests by
//! [`Config::approx_rate`][crate::Config::approx_rate], trading exactness for
//! fewer node visits.

use kurbo::Point;
use smallvec::SmallVec;

use crate::addressing::NodeId;
use crate::tree::Quadtree;
use crate::types::{NodeState, SearchFlags};

/// Result of a nearest-neighbor query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Nearest {
    /// Caller-supplied data id of the matched element.
    pub data: u32,
    /// Node whose element list held the match at query time. Feed it back
    /// into [`Quadtree::nearest_from`] as the hint for a nearby follow-up
    /// query; it stays valid for the lifetime of the tree.
    pub node: NodeId,
}

/// Running best match, in normalized squared distance.
#[derive(Copy, Clone)]
struct Best {
    elem: u32,
    node: NodeId,
    dist2: f32,
}

/// Pending nodes of the iterative descent. The inline capacity covers the
/// depth cap (a quaternary DFS leaves at most three extra entries per
/// level), so queries never touch the heap.
type TraversalStack = SmallVec<[NodeId; 64]>;

impl Quadtree {
    /// Find the stored element nearest to `p`.
    ///
    /// Returns `None` only for an empty tree (or a non-finite query point).
    /// With the default `approx_rate` of 1.0 the result is the exact nearest
    /// neighbor; with a smaller rate the matched element is never farther
    /// than the true nearest distance divided by the rate. Query points
    /// outside the configured bounds are fine.
    pub fn nearest(&self, p: impl Into<Point>) -> Option<Nearest> {
        self.nearest_impl(p.into(), &mut 0)
    }

    /// Like [`Quadtree::nearest`], additionally returning the number of nodes
    /// popped from the traversal stack. Intended for performance measurement;
    /// the match is always identical to the plain variant's.
    pub fn nearest_counted(&self, p: impl Into<Point>) -> (Option<Nearest>, u32) {
        let mut n_access = 0;
        let hit = self.nearest_impl(p.into(), &mut n_access);
        (hit, n_access)
    }

    /// Find the stored element nearest to `p`, starting from a previously
    /// returned node instead of the root.
    ///
    /// For query sequences with spatial locality (a probe point moving a
    /// little between calls), pass the [`Nearest::node`] of the previous
    /// answer: the search ascends from it only as far as necessary and skips
    /// re-descending through irrelevant top-level branches. Any hint that is
    /// not an activated node id silently degrades to the full root search,
    /// as does a hint whose neighborhood cannot bound the answer. The match
    /// is the same as [`Quadtree::nearest`]'s.
    pub fn nearest_from(&self, p: impl Into<Point>, hint: NodeId) -> Option<Nearest> {
        self.nearest_from_impl(p.into(), hint, &mut 0)
    }

    /// Like [`Quadtree::nearest_from`], additionally returning the number of
    /// nodes popped from the traversal stack.
    pub fn nearest_from_counted(&self, p: impl Into<Point>, hint: NodeId) -> (Option<Nearest>, u32) {
        let mut n_access = 0;
        let hit = self.nearest_from_impl(p.into(), hint, &mut n_access);
        (hit, n_access)
    }

    fn nearest_impl(&self, p: Point, n_access: &mut u32) -> Option<Nearest> {
        if self.is_empty() || !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        let (qx, qy) = self.normalize_query(p);
        let start = if self.config.search.contains(SearchFlags::ADJACENT_ONLY) {
            // Locality-limited mode: only the leaf under the query point and
            // its three siblings are searched. The parent subtree always
            // holds at least one element, so this still always matches; it
            // just may miss a closer element outside the neighborhood.
            let leaf = self.containing_leaf(qx, qy);
            if leaf == NodeId::ROOT { leaf } else { leaf.parent() }
        } else {
            NodeId::ROOT
        };
        let mut best = None;
        self.descend(qx, qy, start, &mut best, n_access);
        self.resolve(best)
    }

    fn nearest_from_impl(&self, p: Point, hint: NodeId, n_access: &mut u32) -> Option<Nearest> {
        if self.is_empty() || !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        let Some(hint_node) = self.node(hint) else {
            // Stale or out-of-range hint: fall back to the full search.
            return self.nearest_impl(p, n_access);
        };
        let (qx, qy) = self.normalize_query(p);

        // Seed the bound from the hint's own elements. A hint that has since
        // become a branch seeds nothing, which forces the ascent below all
        // the way to the root: correct, just unaccelerated.
        let mut best = None;
        if hint_node.state == NodeState::Leaf {
            self.scan_leaf(hint, qx, qy, &mut best);
        }

        // Ascend to the smallest ancestor guaranteed to contain the answer.
        let mut start = hint;
        while start != NodeId::ROOT {
            if let Some(b) = best
                && self.nodes[start.index()]
                    .rect
                    .contains_ball(qx, qy, b.dist2 * self.approx2)
            {
                break;
            }
            start = start.parent();
        }

        self.descend(qx, qy, start, &mut best, n_access);
        self.resolve(best)
    }

    fn resolve(&self, best: Option<Best>) -> Option<Nearest> {
        best.map(|b| Nearest {
            data: self.elems[b.elem as usize].data,
            node: b.node,
        })
    }

    /// The shared descent-with-pruning engine of every search variant.
    fn descend(
        &self,
        qx: f32,
        qy: f32,
        start: NodeId,
        best: &mut Option<Best>,
        n_access: &mut u32,
    ) {
        let mut stack = TraversalStack::new();
        stack.push(start);
        while let Some(id) = stack.pop() {
            *n_access += 1;
            let node = self.nodes[id.index()];
            match node.state {
                NodeState::Branch => {
                    let radius2 = best.map_or(f32::INFINITY, |b| b.dist2 * self.approx2);
                    // The quadrant holding the query point is pushed last so
                    // it is visited first and the bound tightens before its
                    // siblings are tested.
                    let near = node.rect.quadrant_of(qx, qy);
                    for q in 0..4_u8 {
                        if q != near {
                            self.push_overlapping(id.child(q), qx, qy, radius2, &mut stack);
                        }
                    }
                    self.push_overlapping(id.child(near), qx, qy, radius2, &mut stack);
                }
                NodeState::Leaf => {
                    self.scan_leaf(id, qx, qy, best);
                    if let Some(b) = best
                        && node.rect.contains_ball(qx, qy, b.dist2 * self.approx2)
                    {
                        // Nothing outside this leaf can beat the ball; stop
                        // even with entries still on the stack.
                        return;
                    }
                }
                NodeState::Inactivated => unreachable!(
                    "quadtree invariant violated: traversal reached an inactivated node"
                ),
            }
        }
    }

    /// BOB test: push the child unless its rectangle lies entirely outside
    /// the current search ball.
    fn push_overlapping(
        &self,
        child: NodeId,
        qx: f32,
        qy: f32,
        radius2: f32,
        stack: &mut TraversalStack,
    ) {
        if self.nodes[child.index()].rect.dist2_to(qx, qy) <= radius2 {
            stack.push(child);
        }
    }

    /// Linear scan of one leaf's element list, tightening the best match.
    fn scan_leaf(&self, id: NodeId, qx: f32, qy: f32, best: &mut Option<Best>) {
        for &eid in &self.node_elems[id.index()] {
            let e = &self.elems[eid as usize];
            let dx = e.x - qx;
            let dy = e.y - qy;
            let d2 = dx * dx + dy * dy;
            if best.is_none_or(|b| d2 < b.dist2) {
                *best = Some(Best {
                    elem: eid,
                    node: id,
                    dist2: d2,
                });
            }
        }
    }
}
