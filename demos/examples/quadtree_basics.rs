// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building a tree, inserting points, and running the search variants.
//!
//! Run:
//! - `cargo run -p canopy_demos --example quadtree_basics`

use canopy_quadtree::{Config, Quadtree};
use kurbo::{Point, Rect};

fn main() {
    // A tree over [0, 100] x [0, 100]: leaves split past two elements, at
    // most four levels deep.
    let mut tree = Quadtree::new(Config::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 2));

    for (i, (x, y)) in [
        (10.0, 10.0),
        (10.0, 12.0),
        (90.0, 90.0),
        (12.0, 9.0),
        (55.0, 40.0),
    ]
    .into_iter()
    .enumerate()
    {
        tree.insert(Point::new(x, y), i as u32).unwrap();
    }
    println!("{tree:?}");

    // Exact nearest neighbor.
    let hit = tree.nearest(Point::new(11.0, 10.5)).unwrap();
    println!(
        "nearest to (11, 10.5): data {} in node {:?} covering {:?}",
        hit.data,
        hit.node,
        tree.node_bounds(hit.node).unwrap()
    );

    // Hand the matched node back in as a hint for a nearby follow-up.
    let hit2 = tree.nearest_from(Point::new(13.0, 10.0), hit.node).unwrap();
    println!("nearest to (13, 10):   data {}", hit2.data);

    // Out-of-bounds inserts are rejected rather than misfiled.
    let err = tree.insert(Point::new(120.0, 50.0), 99).unwrap_err();
    println!("rejected: {err}");

    println!(
        "{} nodes allocated, {} activated, {} elements",
        tree.num_nodes(),
        tree.num_activated(),
        tree.len()
    );
}
