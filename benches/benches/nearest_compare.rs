// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_quadtree::{Config, Quadtree};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};

const BOUNDS: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
    fn point(&mut self) -> Point {
        Point::new(
            BOUNDS.x0 + self.next_f64() * BOUNDS.width(),
            BOUNDS.y0 + self.next_f64() * BOUNDS.height(),
        )
    }
}

fn build_tree(n: usize, seed: u64) -> (Quadtree, Vec<Point>) {
    let mut rng = Rng::new(seed);
    let mut tree = Quadtree::new(Config::new(BOUNDS, 8, 8));
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let p = rng.point();
        tree.insert(p, i as u32).expect("in-bounds by construction");
        points.push(p);
    }
    (tree, points)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &n in &[1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("uniform/{n}"), |b| {
            b.iter(|| {
                let (tree, _) = build_tree(n, 0xCAFE_F00D_DEAD_BEEF);
                black_box(tree.num_activated())
            });
        });
    }
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let (tree, points) = build_tree(50_000, 0xBADC_F00D_1234_5678);
    let mut queries = Rng::new(0xFACE_FEED_CAFE_BABE);

    let mut group = c.benchmark_group("nearest");
    group.throughput(Throughput::Elements(1));

    group.bench_function("quadtree/random", |b| {
        b.iter(|| black_box(tree.nearest(queries.point())));
    });

    // A probe point wandering in small steps, with and without handing the
    // previous answer back as a hint.
    let mut probe = Point::new(500.0, 500.0);
    let mut steps = Rng::new(0xC1A5_7E55_9999_ABCD);
    group.bench_function("quadtree/probe_path", |b| {
        b.iter(|| {
            probe.x = (probe.x + (steps.next_f64() - 0.5) * 4.0).clamp(BOUNDS.x0, BOUNDS.x1);
            probe.y = (probe.y + (steps.next_f64() - 0.5) * 4.0).clamp(BOUNDS.y0, BOUNDS.y1);
            black_box(tree.nearest(probe))
        });
    });

    let mut cached_probe = Point::new(500.0, 500.0);
    let mut cached_steps = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut hint = canopy_quadtree::NodeId::ROOT;
    group.bench_function("quadtree/probe_path_cached", |b| {
        b.iter(|| {
            cached_probe.x =
                (cached_probe.x + (cached_steps.next_f64() - 0.5) * 4.0).clamp(BOUNDS.x0, BOUNDS.x1);
            cached_probe.y =
                (cached_probe.y + (cached_steps.next_f64() - 0.5) * 4.0).clamp(BOUNDS.y0, BOUNDS.y1);
            let hit = tree.nearest_from(cached_probe, hint);
            if let Some(hit) = hit {
                hint = hit.node;
            }
            black_box(hit)
        });
    });

    group.bench_function("linear_scan/random", |b| {
        b.iter(|| {
            let q = queries.point();
            let mut best = (f64::INFINITY, 0usize);
            for (i, p) in points.iter().enumerate() {
                let d2 = (p.x - q.x) * (p.x - q.x) + (p.y - q.y) * (p.y - q.y);
                if d2 < best.0 {
                    best = (d2, i);
                }
            }
            black_box(best)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_nearest);
criterion_main!(benches);
