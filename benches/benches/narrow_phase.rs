// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use kurbo::Point;
use thicket_collide::{Body, Circle, CollisionResult, Polygon, sat};

fn regular_polygon(pos: Point, sides: usize, radius: f64) -> Body {
    let step = core::f64::consts::TAU / sides as f64;
    let points = (0..sides)
        .map(|i| {
            let theta = step * i as f64;
            Point::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();
    let mut p = Polygon::new(pos, points);
    p.refresh();
    Body::Polygon(p)
}

fn circle(pos: Point, radius: f64) -> Body {
    Body::Circle(Circle::new(pos, radius))
}

fn bench_circle_circle(c: &mut Criterion) {
    let a = circle(Point::new(0.0, 0.0), 5.0);
    let b = circle(Point::new(8.0, 0.0), 4.0);
    let mut result = CollisionResult::new();
    c.bench_function("sat_circle_circle", |bench| {
        bench.iter(|| black_box(sat::test(&a, &b, Some(&mut result), true)))
    });
}

fn bench_polygon_circle(c: &mut Criterion) {
    let a = regular_polygon(Point::new(0.0, 0.0), 8, 5.0);
    let b = circle(Point::new(7.0, 0.0), 3.0);
    let mut result = CollisionResult::new();
    c.bench_function("sat_polygon_circle", |bench| {
        bench.iter(|| black_box(sat::test(&a, &b, Some(&mut result), true)))
    });
}

fn bench_polygon_polygon(c: &mut Criterion) {
    let mut group = c.benchmark_group("sat_polygon_polygon");
    for &sides in &[4usize, 8, 16, 64] {
        let a = regular_polygon(Point::new(0.0, 0.0), sides, 5.0);
        let b = regular_polygon(Point::new(7.0, 0.0), sides, 5.0);
        let mut result = CollisionResult::new();
        group.bench_function(format!("sides{}", sides), |bench| {
            bench.iter(|| black_box(sat::test(&a, &b, Some(&mut result), true)))
        });
    }
    group.finish();
}

fn bench_separated_early_out(c: &mut Criterion) {
    let a = regular_polygon(Point::new(0.0, 0.0), 16, 5.0);
    let b = regular_polygon(Point::new(100.0, 0.0), 16, 5.0);
    c.bench_function("sat_aabb_reject", |bench| {
        bench.iter(|| black_box(sat::test(&a, &b, None, true)))
    });
}

criterion_group!(
    benches,
    bench_circle_circle,
    bench_polygon_circle,
    bench_polygon_polygon,
    bench_separated_early_out
);
criterion_main!(benches);
