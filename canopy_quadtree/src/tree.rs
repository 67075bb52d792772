// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The quadtree container: flat node/element stores and the insertion engine.

use alloc::vec::Vec;
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::addressing::NodeId;
use crate::types::{Config, Element, Node, NodeState, OutOfBounds, QuadPoint, QuadRect};

/// Element ids assigned to a node. Inline capacity covers typical leaf
/// capacities without touching the heap.
pub(crate) type ElemList = SmallVec<[u32; 8]>;

/// Upper limit on `max_depth`: past 15 levels the quantized u16 space is
/// exhausted and further subdivision cannot separate points.
const MAX_DEPTH: u8 = 15;

/// Extent of the quantized coordinate space along its longer axis.
const QUANT_MAX: f64 = 65535.0;

/// Maps real-world coordinates into the quantized space.
///
/// One scale is used for both axes (sized so the longer side of the bounds
/// spans the full u16 range), so normalized squared distances order the same
/// way as world distances. The shorter axis simply does not use the whole
/// range.
#[derive(Clone, Copy, Debug)]
struct Normalizer {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
    scale: f64,
    /// Half-open quantized extent of the root rectangle.
    span: QuadPoint<u16>,
    /// Largest normalized values still inside the root rectangle; inserts at
    /// the inclusive far edge of the bounds clamp to these.
    limit_x: f32,
    limit_y: f32,
}

impl Normalizer {
    fn new(bounds: Rect) -> Self {
        let w = bounds.width();
        let h = bounds.height();
        let scale = QUANT_MAX / w.max(h);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "clamped to the u16 range on the line above"
        )]
        let span_of = |side: f64| (side * scale).ceil().clamp(1.0, QUANT_MAX) as u16;
        let span = QuadPoint::new(span_of(w), span_of(h));
        Self {
            x_min: bounds.x0,
            y_min: bounds.y0,
            x_max: bounds.x1,
            y_max: bounds.y1,
            scale,
            span,
            limit_x: f32::from(span.x).next_down(),
            limit_y: f32::from(span.y).next_down(),
        }
    }

    fn root_rect(&self) -> QuadRect<u16> {
        QuadRect::new(QuadPoint::new(0, 0), self.span)
    }

    /// Normalize a point for insertion. `None` if outside the configured
    /// bounds (inclusive on all edges) or non-finite.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "normalized coordinates fit f32 by construction (<= 65535)"
    )]
    fn normalize(&self, p: Point) -> Option<(f32, f32)> {
        if !(self.x_min..=self.x_max).contains(&p.x) || !(self.y_min..=self.y_max).contains(&p.y) {
            return None;
        }
        // Clamp so the inclusive far edge of the bounds stays inside the
        // half-open root rectangle.
        let nx = (((p.x - self.x_min) * self.scale) as f32).min(self.limit_x);
        let ny = (((p.y - self.y_min) * self.scale) as f32).min(self.limit_y);
        Some((nx, ny))
    }

    /// Normalize a query point. Queries are not range-checked; coordinates
    /// outside the bounds map outside the root rectangle, which the search
    /// handles naturally.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "query precision beyond f32 is below the quantization step"
    )]
    pub(crate) fn normalize_query(&self, p: Point) -> (f32, f32) {
        (
            ((p.x - self.x_min) * self.scale) as f32,
            ((p.y - self.y_min) * self.scale) as f32,
        )
    }

    /// Map a quantized rectangle back to world coordinates.
    fn denormalize(&self, r: QuadRect<u16>) -> Rect {
        Rect::new(
            self.x_min + f64::from(r.tl.x) / self.scale,
            self.y_min + f64::from(r.tl.y) / self.scale,
            self.x_min + f64::from(r.br.x) / self.scale,
            self.y_min + f64::from(r.br.y) / self.scale,
        )
    }
}

/// Implicit, array-backed quadtree over 2D points.
///
/// Nodes live in a flat arena addressed purely by [`NodeId`] arithmetic (no
/// stored parent/child references), elements are appended to a global array
/// and referenced by id from leaf element lists. Nodes only ever progress
/// from inactivated to leaf to branch; nothing is deleted or rebalanced.
///
/// Queries take `&self` and inserts `&mut self`; all per-call working state
/// is stack-local, so the borrow checker enforces the single-writer model
/// and consecutive queries cannot observe each other.
///
/// ## Example
///
/// ```rust
/// use canopy_quadtree::{Config, Quadtree};
/// use kurbo::{Point, Rect};
///
/// let mut tree = Quadtree::new(Config::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 2));
/// tree.insert(Point::new(10.0, 10.0), 7).unwrap();
/// tree.insert(Point::new(90.0, 90.0), 8).unwrap();
///
/// let hit = tree.nearest(Point::new(12.0, 11.0)).unwrap();
/// assert_eq!(hit.data, 7);
///
/// // Feed the matched node back in as a hint for the next, nearby query.
/// let hit2 = tree.nearest_from(Point::new(13.0, 11.0), hit.node).unwrap();
/// assert_eq!(hit2.data, 7);
/// ```
pub struct Quadtree {
    pub(crate) config: Config,
    norm: Normalizer,
    max_depth: u8,
    leaf_capacity: usize,
    /// `approx_rate` squared, applied to squared radii in the pruning tests.
    pub(crate) approx2: f32,
    /// Flat node arena; index 0 unused, index 1 is the root.
    pub(crate) nodes: Vec<Node>,
    /// Element-id lists, parallel to `nodes`; non-empty only for leaves.
    pub(crate) node_elems: Vec<ElemList>,
    /// All inserted elements, append-only; position is the element id.
    pub(crate) elems: Vec<Element>,
    n_activated: u32,
}

impl core::fmt::Debug for Quadtree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Quadtree")
            .field("bounds", &self.config.bounds)
            .field("max_depth", &self.max_depth)
            .field("leaf_capacity", &self.leaf_capacity)
            .field("nodes_allocated", &self.num_nodes())
            .field("nodes_activated", &self.n_activated)
            .field("elements", &self.elems.len())
            .finish_non_exhaustive()
    }
}

impl Quadtree {
    /// Create an empty tree covering `config.bounds`, with the root
    /// pre-activated as a leaf spanning the whole range.
    ///
    /// `config.max_depth` is clamped to 15 and `config.leaf_capacity` to at
    /// least 1. A `max_depth` of 0 yields a single-leaf tree with unbounded
    /// element count, which is degenerate but fully usable.
    pub fn new(config: Config) -> Self {
        debug_assert!(
            config.bounds.width() > 0.0 && config.bounds.height() > 0.0,
            "quadtree bounds must have positive area"
        );
        debug_assert!(
            config.approx_rate > 0.0 && config.approx_rate <= 1.0,
            "approx_rate must be in (0, 1]"
        );
        let norm = Normalizer::new(config.bounds);
        let mut nodes = Vec::new();
        nodes.resize(2, Node::default());
        nodes[NodeId::ROOT.index()] = Node {
            rect: norm.root_rect(),
            state: NodeState::Leaf,
            depth: 0,
        };
        let mut node_elems = Vec::new();
        node_elems.resize_with(2, ElemList::new);
        Self {
            max_depth: config.max_depth.min(MAX_DEPTH),
            leaf_capacity: config.leaf_capacity.max(1),
            approx2: config.approx_rate * config.approx_rate,
            config,
            norm,
            nodes,
            node_elems,
            elems: Vec::new(),
            n_activated: 1,
        }
    }

    /// Insert a point with a caller-supplied data id.
    ///
    /// The point is normalized into the quantized space and appended to the
    /// global element array, then placed in the leaf containing it. A leaf
    /// pushed past [`Config::leaf_capacity`] below the depth cap subdivides:
    /// its four children are activated as empty leaves and every element of
    /// the list is redistributed into the child whose rectangle contains it
    /// (half-open, so shared edges never assign a point twice). Leaves at
    /// `max_depth` never subdivide and simply keep growing.
    ///
    /// Points outside the configured bounds (or non-finite) are rejected and
    /// the tree is left untouched.
    pub fn insert(&mut self, p: impl Into<Point>, data: u32) -> Result<(), OutOfBounds> {
        let p = p.into();
        let Some((nx, ny)) = self.norm.normalize(p) else {
            return Err(OutOfBounds { x: p.x, y: p.y });
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "element ids are 32-bit by design"
        )]
        let elem = self.elems.len() as u32;
        self.elems.push(Element {
            x: nx,
            y: ny,
            data,
        });

        let mut id = NodeId::ROOT;
        loop {
            let node = self.nodes[id.index()];
            match node.state {
                NodeState::Branch => id = id.child(node.rect.quadrant_of(nx, ny)),
                NodeState::Leaf => {
                    self.node_elems[id.index()].push(elem);
                    if self.node_elems[id.index()].len() > self.leaf_capacity
                        && node.depth < self.max_depth
                    {
                        self.subdivide(id);
                    }
                    return Ok(());
                }
                NodeState::Inactivated => {
                    unreachable!("quadtree invariant violated: descent reached an inactivated node")
                }
            }
        }
    }

    /// Turn a leaf into a branch: activate its four children as empty leaves
    /// and redistribute the element list over them.
    fn subdivide(&mut self, id: NodeId) {
        let Node { rect, depth, .. } = self.nodes[id.index()];
        let last = id.child(3).index();
        if self.nodes.len() <= last {
            self.nodes.resize(last + 1, Node::default());
            self.node_elems.resize_with(last + 1, ElemList::new);
        }
        for q in 0..4 {
            self.nodes[id.child(q).index()] = Node {
                rect: rect.quadrant(q),
                state: NodeState::Leaf,
                depth: depth + 1,
            };
            self.n_activated += 1;
        }
        self.nodes[id.index()].state = NodeState::Branch;

        let moved = core::mem::take(&mut self.node_elems[id.index()]);
        for eid in moved {
            let e = self.elems[eid as usize];
            let child = id.child(rect.quadrant_of(e.x, e.y));
            debug_assert!(
                self.nodes[child.index()].rect.contains(e.x, e.y),
                "redistributed element must land in the containing child"
            );
            self.node_elems[child.index()].push(eid);
        }
    }

    /// The deepest activated node containing a normalized point.
    pub(crate) fn containing_leaf(&self, nx: f32, ny: f32) -> NodeId {
        let mut id = NodeId::ROOT;
        loop {
            let node = self.nodes[id.index()];
            match node.state {
                NodeState::Branch => id = id.child(node.rect.quadrant_of(nx, ny)),
                _ => return id,
            }
        }
    }

    pub(crate) fn normalize_query(&self, p: Point) -> (f32, f32) {
        self.norm.normalize_query(p)
    }

    /// Number of allocated node slots (activated or not), excluding the
    /// unused slot 0. O(1).
    #[allow(
        clippy::cast_possible_truncation,
        reason = "node ids are 32-bit by design"
    )]
    pub fn num_nodes(&self) -> u32 {
        (self.nodes.len() - 1) as u32
    }

    /// Number of activated nodes (leaves and branches). Maintained at
    /// activation time, O(1).
    pub fn num_activated(&self) -> u32 {
        self.n_activated
    }

    /// Number of inserted elements.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Whether no elements have been inserted.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// The configured real-world bounds of the root node.
    pub fn bounds(&self) -> Rect {
        self.config.bounds
    }

    /// World-space rectangle of an activated node, or `None` for ids that
    /// were never activated (or are out of range).
    ///
    /// The rectangle is reconstructed from the quantized node rect, so it can
    /// be looser than the configured bounds by up to one quantization step.
    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> {
        let node = self.node(id)?;
        Some(self.norm.denormalize(node.rect))
    }

    /// Look up an activated node, bounds-checked.
    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        if id.0 == 0 {
            return None;
        }
        self.nodes
            .get(id.index())
            .filter(|n| n.state.is_activated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn config_100() -> Config {
        Config::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 2)
    }

    #[test]
    fn worked_example_subdivides_once_per_overflow() {
        let mut tree = Quadtree::new(config_100());
        assert_eq!(tree.num_activated(), 1);
        assert_eq!(tree.num_nodes(), 1);

        tree.insert(Point::new(10.0, 10.0), 1).unwrap();
        tree.insert(Point::new(10.0, 12.0), 2).unwrap();
        assert_eq!(tree.num_activated(), 1, "no subdivision at capacity");

        // Third insert overflows the root leaf: four children activate.
        tree.insert(Point::new(90.0, 90.0), 3).unwrap();
        assert_eq!(tree.num_activated(), 5);

        let hit = tree.nearest(Point::new(11.0, 10.5)).unwrap();
        assert_eq!(hit.data, 1);

        // The two clustered points went to the top-left child, the far one to
        // the bottom-right child.
        let tl = NodeId::ROOT.child(0);
        let br = NodeId::ROOT.child(3);
        assert_eq!(tree.node_elems[tl.index()].as_slice(), &[0, 1]);
        assert_eq!(tree.node_elems[br.index()].as_slice(), &[2]);
        assert!(tree.node_elems[NodeId::ROOT.index()].is_empty());

        // A third point near the cluster overflows that child: exactly four
        // more nodes activate.
        let before = tree.num_activated();
        tree.insert(Point::new(10.5, 10.5), 4).unwrap();
        assert_eq!(tree.num_activated(), before + 4);
    }

    #[test]
    fn out_of_bounds_inserts_are_rejected() {
        let mut tree = Quadtree::new(config_100());
        assert_eq!(
            tree.insert(Point::new(-0.1, 50.0), 1),
            Err(OutOfBounds { x: -0.1, y: 50.0 })
        );
        assert!(tree.insert(Point::new(50.0, 100.1), 2).is_err());
        assert!(tree.insert(Point::new(f64::NAN, 50.0), 3).is_err());
        assert!(tree.insert(Point::new(50.0, f64::INFINITY), 4).is_err());
        assert!(tree.is_empty(), "rejected inserts must not store elements");

        // The configured range is inclusive on every edge.
        tree.insert(Point::new(0.0, 0.0), 5).unwrap();
        tree.insert(Point::new(100.0, 100.0), 6).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.nearest(Point::new(99.0, 99.0)).unwrap().data, 6);
    }

    #[test]
    fn max_depth_zero_is_an_unbounded_bucket() {
        let mut tree = Quadtree::new(Config::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0, 2));
        for i in 0..50_u32 {
            tree.insert(Point::new(1.0 + f64::from(i) * 0.1, 5.0), i)
                .unwrap();
        }
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.num_activated(), 1);
        assert_eq!(tree.node_elems[NodeId::ROOT.index()].len(), 50);
        assert_eq!(tree.nearest(Point::new(1.02, 5.0)).unwrap().data, 0);
    }

    #[test]
    fn structural_invariants_hold_under_random_inserts() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        let mut tree = Quadtree::new(Config::new(Rect::new(-50.0, -20.0, 150.0, 80.0), 6, 4));
        let n = 2_000_u32;
        for i in 0..n {
            let x = rng.random_range(-50.0..150.0);
            let y = rng.random_range(-20.0..80.0);
            tree.insert(Point::new(x, y), i).unwrap();
        }
        assert_eq!(tree.len(), n as usize);

        let mut held = 0_usize;
        for (i, node) in tree.nodes.iter().enumerate() {
            let elems = &tree.node_elems[i];
            match node.state {
                NodeState::Leaf => {
                    held += elems.len();
                    assert!(node.depth <= 6, "no leaf beyond max_depth");
                    for &eid in elems {
                        let e = tree.elems[eid as usize];
                        assert!(
                            node.rect.contains(e.x, e.y),
                            "element {eid} outside its leaf rect"
                        );
                    }
                }
                NodeState::Branch => {
                    assert!(elems.is_empty(), "branch {i} still holds elements");
                    let id = NodeId(u32::try_from(i).unwrap());
                    for q in 0..4_u8 {
                        let child = &tree.nodes[id.child(q).index()];
                        assert!(child.state.is_activated(), "branch child not activated");
                        assert_eq!(child.depth, node.depth + 1);
                    }
                }
                NodeState::Inactivated => assert!(elems.is_empty()),
            }
        }
        assert_eq!(held, n as usize, "element conservation across leaf lists");
    }

    #[test]
    fn capacity_respected_for_spread_points() {
        let mut tree = Quadtree::new(config_100());
        // One point per eventual quadrant plus one to force the split.
        for (i, (x, y)) in [(10.0, 10.0), (60.0, 10.0), (10.0, 60.0), (60.0, 60.0), (30.0, 30.0)]
            .into_iter()
            .enumerate()
        {
            tree.insert(Point::new(x, y), u32::try_from(i).unwrap()).unwrap();
        }
        for (i, node) in tree.nodes.iter().enumerate() {
            if node.state == NodeState::Leaf && node.depth < 4 {
                assert!(
                    tree.node_elems[i].len() <= 2,
                    "leaf below the depth cap exceeds capacity"
                );
            }
        }
    }

    #[test]
    fn node_bounds_roundtrip() {
        let bounds = Rect::new(-10.0, 0.0, 90.0, 40.0);
        let mut tree = Quadtree::new(Config::new(bounds, 3, 1));
        tree.insert(Point::new(0.0, 10.0), 1).unwrap();
        tree.insert(Point::new(80.0, 30.0), 2).unwrap();

        let root = tree.node_bounds(NodeId::ROOT).unwrap();
        let step = 100.0 / 65535.0;
        assert!((root.x0 - bounds.x0).abs() < step);
        assert!((root.y0 - bounds.y0).abs() < step);
        assert!((root.x1 - bounds.x1).abs() < 2.0 * step);
        assert!((root.y1 - bounds.y1).abs() < 2.0 * step);

        // Children tile the root in world space too.
        let tl = tree.node_bounds(NodeId::ROOT.child(0)).unwrap();
        assert_eq!(tl.origin(), root.origin());
        assert!(tree.node_bounds(NodeId(0)).is_none());
        assert!(tree.node_bounds(NodeId(9_999)).is_none());
    }

    #[test]
    fn non_square_bounds_keep_distance_ordering() {
        // A wide, flat range: the y axis only uses part of the quantized
        // space, but relative distances still decide matches.
        let mut tree = Quadtree::new(Config::new(Rect::new(0.0, 0.0, 1000.0, 10.0), 5, 2));
        tree.insert(Point::new(100.0, 5.0), 1).unwrap();
        tree.insert(Point::new(107.0, 5.0), 2).unwrap();
        assert_eq!(tree.nearest(Point::new(103.0, 5.0)).unwrap().data, 1);
        assert_eq!(tree.nearest(Point::new(104.0, 5.0)).unwrap().data, 2);
    }
}
