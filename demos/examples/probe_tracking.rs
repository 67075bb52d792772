// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached nearest-neighbor queries along a moving probe path.
//!
//! Simulates the workload the cached search mode is built for: a probe point
//! drifting a little every frame, querying the nearest stored landmark each
//! time. The `_counted` variants expose how many nodes each strategy visits.
//!
//! Run:
//! - `cargo run -p canopy_demos --example probe_tracking`

use canopy_quadtree::{Config, NodeId, Quadtree};
use kurbo::{Point, Rect};

const BOUNDS: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);

/// Small xorshift generator so the demo needs no dependencies.
struct Rng(u64);

impl Rng {
    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        ((x >> 11) as f64) / ((1u64 << 53) as f64)
    }
}

fn main() {
    let mut rng = Rng(0x5EED_CA11_F00D_1234);
    let mut tree = Quadtree::new(Config::new(BOUNDS, 8, 8));
    let n_landmarks = 20_000;
    for i in 0..n_landmarks {
        let x = BOUNDS.x0 + rng.next_f64() * BOUNDS.width();
        let y = BOUNDS.y0 + rng.next_f64() * BOUNDS.height();
        tree.insert(Point::new(x, y), i).unwrap();
    }
    println!(
        "{} landmarks over {:?}, {} nodes activated",
        tree.len(),
        tree.bounds(),
        tree.num_activated()
    );

    // Drift the probe for a while, querying every step both ways.
    let mut probe = Point::new(500.0, 500.0);
    let mut hint: Option<NodeId> = None;
    let steps = 10_000;
    let mut full_accesses = 0u64;
    let mut cached_accesses = 0u64;
    let mut disagreements = 0u32;

    for _ in 0..steps {
        probe.x = (probe.x + (rng.next_f64() - 0.5) * 3.0).clamp(BOUNDS.x0, BOUNDS.x1);
        probe.y = (probe.y + (rng.next_f64() - 0.5) * 3.0).clamp(BOUNDS.y0, BOUNDS.y1);

        let (full, n_full) = tree.nearest_counted(probe);
        let (cached, n_cached) = match hint {
            Some(node) => tree.nearest_from_counted(probe, node),
            None => tree.nearest_from_counted(probe, NodeId::ROOT),
        };
        full_accesses += u64::from(n_full);
        cached_accesses += u64::from(n_cached);
        if full.map(|h| h.data) != cached.map(|h| h.data) {
            disagreements += 1;
        }
        hint = cached.map(|h| h.node);
    }

    println!("steps: {steps}");
    println!(
        "node accesses per query: full {:.2}, cached {:.2}",
        full_accesses as f64 / f64::from(steps),
        cached_accesses as f64 / f64::from(steps)
    );
    println!("result disagreements: {disagreements}");
}
