// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Point;
use thicket_bvh::{Aabb, Bvh};
use thicket_collide::World;

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
}

fn gen_random_boxes(count: usize, extent: f64, size: f64) -> Vec<Aabb> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..count {
        let x = rng.next_f64() * extent;
        let y = rng.next_f64() * extent;
        out.push(Aabb::from_xywh(x, y, size, size));
    }
    out
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_insert");
    for &n in &[256usize, 1024, 4096] {
        let boxes = gen_random_boxes(n, 2000.0, 12.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("random_n{}", n), |b| {
            b.iter_batched(
                Bvh::<u32>::new,
                |mut bvh| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        let _ = bvh.insert(r, i as u32);
                    }
                    black_box(bvh.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_potentials(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_potentials");
    for &n in &[256usize, 1024, 4096] {
        let boxes = gen_random_boxes(n, 2000.0, 12.0);
        let mut bvh = Bvh::<u32>::new();
        let proxies: Vec<_> = boxes
            .iter()
            .copied()
            .enumerate()
            .map(|(i, r)| bvh.insert(r, i as u32))
            .collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("all_bodies_n{}", n), |b| {
            b.iter(|| {
                let mut total = 0usize;
                for &p in &proxies {
                    total += bvh.potentials(p).unwrap().len();
                }
                black_box(total);
            })
        });
    }
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_churn");
    for &n in &[256usize, 1024] {
        let boxes = gen_random_boxes(n, 2000.0, 12.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("detach_attach_n{}", n), |b| {
            let mut bvh = Bvh::<u32>::new();
            let proxies: Vec<_> = boxes
                .iter()
                .copied()
                .enumerate()
                .map(|(i, r)| bvh.insert(r, i as u32))
                .collect();
            let mut offset = 0.0;
            b.iter(|| {
                offset += 1.0;
                for (&p, r) in proxies.iter().zip(&boxes) {
                    bvh.detach(p).unwrap();
                    let moved = Aabb::new(
                        r.min_x + offset,
                        r.min_y,
                        r.max_x + offset,
                        r.max_y,
                    );
                    bvh.attach(p, moved).unwrap();
                }
                black_box(bvh.len());
            })
        });
    }
    group.finish();
}

fn bench_world_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_update");
    for &n in &[256usize, 1024] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("drifting_circles_n{}", n), |b| {
            let mut world = World::new();
            let mut rng = Rng::new(0xBADC_F00D_1234_5678);
            let handles: Vec<_> = (0..n)
                .map(|_| {
                    let x = rng.next_f64() * 2000.0;
                    let y = rng.next_f64() * 2000.0;
                    world.create_circle(Point::new(x, y), 6.0, 1.0, 3.0)
                })
                .collect();
            b.iter(|| {
                for &h in &handles {
                    let circle = world.get_mut(h).unwrap().as_circle_mut().unwrap();
                    circle.pos.x += 1.0;
                }
                black_box(world.update());
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_potentials,
    bench_churn,
    bench_world_update
);
criterion_main!(benches);
