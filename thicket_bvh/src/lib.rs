// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thicket BVH: an incremental dynamic bounding-volume hierarchy over 2D AABBs.
//!
//! This is the broad phase of the Thicket collision stack, usable on its own
//! for any coarse spatial-pairing problem.
//!
//! - Insert, detach, attach, and remove axis-aligned boxes with user payloads,
//!   one at a time, without rebuilding the tree.
//! - Query a leaf's potential partners: every other leaf whose indexed box
//!   touches it.
//! - Internal branch nodes come from a pooled slot arena, so steady-state
//!   churn (detach and re-attach each frame) performs no allocation.
//!
//! Leaves are addressed by generational [`Proxy`] handles. A proxy minted by
//! one tree is rejected by every other tree, and removing a leaf invalidates
//! its proxy even if the slot is later reused.
//!
//! Boxes are expected to be pre-padded by the caller: index a box somewhat
//! larger than the underlying object and you only pay for a re-index when the
//! object escapes its padding. [`Aabb::pad`] does the widening.
//!
//! # Example
//!
//! ```rust
//! use thicket_bvh::{Aabb, Bvh};
//!
//! let mut bvh: Bvh<u32> = Bvh::new();
//! let a = bvh.insert(Aabb::from_xywh(0.0, 0.0, 10.0, 10.0), 1);
//! let _b = bvh.insert(Aabb::from_xywh(5.0, 5.0, 10.0, 10.0), 2);
//! let _c = bvh.insert(Aabb::from_xywh(100.0, 0.0, 10.0, 10.0), 3);
//!
//! let candidates = bvh.potentials(a)?;
//! assert_eq!(candidates.len(), 1);
//! assert_eq!(candidates[0].1, 2);
//!
//! // Move `a` by detaching and re-attaching with a fresh box.
//! bvh.detach(a)?;
//! bvh.attach(a, Aabb::from_xywh(200.0, 0.0, 10.0, 10.0))?;
//! assert!(bvh.potentials(a)?.is_empty());
//! # Ok::<(), thicket_bvh::Error>(())
//! ```
//!
//! ## Float semantics
//!
//! Coordinates are `f64` and assumed free of NaNs. Box comparisons during
//! traversal are exact, with inclusive bounds on the left-hand descent and
//! exclusive bounds on the right-hand step.

#![no_std]

extern crate alloc;

pub mod tree;
pub mod types;

pub use tree::Bvh;
pub use types::{Aabb, Error, Proxy};
