// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collision basics.
//!
//! Build a world with a circle and a wall, walk the circle into the wall,
//! and resolve the overlap with the reported translation.
//!
//! Run:
//! - `cargo run -p thicket_demos --example collision_basics`

use kurbo::Point;
use thicket_collide::{CollisionResult, World};

fn main() {
    let mut world = World::new();
    let player = world.create_circle(Point::new(-20.0, 0.0), 3.0, 1.0, 1.0);
    let wall = world.create_polygon(
        Point::new(0.0, -10.0),
        vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 20.0),
            Point::new(0.0, 20.0),
        ],
        1.0,
    );

    let mut result = CollisionResult::new();

    // Walk the player toward the wall one unit per frame.
    for frame in 0..30 {
        {
            let circle = world.get_mut(player).unwrap().as_circle_mut().unwrap();
            circle.pos.x += 1.0;
        }
        let reindexed = world.update();

        let mut resolved = false;
        for other in world.potentials(player).unwrap() {
            if world.collides(player, other, Some(&mut result), true).unwrap() {
                assert_eq!(result.b, Some(wall));
                let push = result.overlap * result.overlap_dir;
                let circle = world.get_mut(player).unwrap().as_circle_mut().unwrap();
                circle.pos -= push;
                resolved = true;
            }
        }

        let x = world.get(player).unwrap().as_circle().unwrap().pos.x;
        println!(
            "frame {frame:2}: x = {x:6.2}, reindexed = {reindexed}, resolved = {resolved}"
        );
    }

    // The wall face is at x = 0; a radius-3 circle settles at x = -3.
    let x = world.get(player).unwrap().as_circle().unwrap().pos.x;
    assert!((x + 3.0).abs() < 1e-9, "player should rest against the wall");
}
