// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Broad-phase basics.
//!
//! Use the BVH directly: index a grid of boxes, query potentials for one of
//! them, then churn a box with detach/attach and watch the arena stay put.
//!
//! Run:
//! - `cargo run -p thicket_demos --example bvh_basics`

use thicket_bvh::{Aabb, Bvh};

fn main() {
    let mut bvh: Bvh<(u32, u32)> = Bvh::new();

    // A 10x10 grid of slightly overlapping boxes.
    let mut proxies = Vec::new();
    for gy in 0..10u32 {
        for gx in 0..10u32 {
            let aabb = Aabb::from_xywh(f64::from(gx) * 10.0, f64::from(gy) * 10.0, 12.0, 12.0);
            proxies.push(bvh.insert(aabb, (gx, gy)));
        }
    }
    println!("tree: {bvh:?}");
    assert!(bvh.validate());

    // Neighbors of the box at grid cell (5, 5).
    let center = proxies[5 * 10 + 5];
    let mut neighbors: Vec<(u32, u32)> = bvh
        .potentials(center)
        .unwrap()
        .into_iter()
        .map(|(_, cell)| cell)
        .collect();
    neighbors.sort_unstable();
    println!("neighbors of (5, 5): {neighbors:?}");
    assert!(neighbors.contains(&(4, 5)));
    assert!(neighbors.contains(&(6, 6)));

    // Churn one box across the grid. Detach/attach reuses pooled branches,
    // so the arena does not grow.
    let roamer = proxies[0];
    for step in 0..100 {
        bvh.detach(roamer).unwrap();
        let x = f64::from(step) * 1.5;
        bvh.attach(roamer, Aabb::from_xywh(x, 0.0, 12.0, 12.0)).unwrap();
    }
    println!("after churn: {bvh:?}");
    assert!(bvh.validate());
}
