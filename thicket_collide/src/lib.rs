// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thicket Collide: Kurbo-native 2D collision detection.
//!
//! Bodies are circles, convex polygons, and points (one-vertex polygons).
//! A [`World`] owns the bodies, keeps a dynamic bounding-volume hierarchy
//! (from [`thicket_bvh`]) over their padded bounding boxes as a broad phase,
//! and confirms candidate pairs with a separating-axis narrow phase that
//! reports minimum-translation data into a reusable [`CollisionResult`].
//!
//! The per-frame loop:
//!
//! 1. Mutate bodies through [`World::get_mut`] (position, angle, scale,
//!    points, padding).
//! 2. Call [`World::update`] once. Bodies that escaped their padded boxes
//!    are re-indexed; the rest cost nothing.
//! 3. For each body of interest, ask [`World::potentials`] for broad-phase
//!    candidates and confirm each with [`World::collides`].
//!
//! # Example
//!
//! ```rust
//! use kurbo::Point;
//! use thicket_collide::{CollisionResult, World};
//!
//! let mut world = World::new();
//! let player = world.create_circle(Point::new(0.0, 0.0), 5.0, 1.0, 0.5);
//! let wall = world.create_polygon(
//!     Point::new(4.0, -10.0),
//!     vec![
//!         Point::new(0.0, 0.0),
//!         Point::new(2.0, 0.0),
//!         Point::new(2.0, 20.0),
//!         Point::new(0.0, 20.0),
//!     ],
//!     0.5,
//! );
//!
//! world.update();
//!
//! let mut result = CollisionResult::new();
//! for other in world.potentials(player)? {
//!     if world.collides(player, other, Some(&mut result), true)? {
//!         assert_eq!(result.b, Some(wall));
//!         // Push the player out along the reported direction.
//!         let push = result.overlap * result.overlap_dir;
//!         let body = world.get_mut(player).unwrap();
//!         let circle = body.as_circle_mut().unwrap();
//!         circle.pos -= push;
//!     }
//! }
//! # Ok::<(), thicket_collide::Error>(())
//! ```
//!
//! The narrow phase is also usable standalone via [`sat::test`] on bodies
//! you own directly, without a `World`.
//!
//! ## Padding
//!
//! Each body carries a `padding` margin added to its indexed bounding box.
//! A body that moves within its padding does not get re-indexed, so a little
//! padding absorbs jitter and slow motion; too much padding inflates the
//! candidate sets `potentials` returns. Zero padding re-indexes on every
//! move.
//!
//! ## Float semantics
//!
//! Coordinates are `f64` and assumed free of NaNs. Degenerate geometry
//! (zero-length edges, coincident circle centers, zero-area shapes) is
//! handled with local fallbacks, never errors.

#![no_std]

extern crate alloc;

pub mod body;
pub mod sat;
pub mod world;

pub use body::{Body, Circle, Polygon};
pub use sat::CollisionResult;
pub use thicket_bvh::Aabb;
pub use world::{BodyHandle, Error, World};
