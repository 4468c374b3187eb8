// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive types: AABBs, leaf proxies, and errors.

use core::fmt;

/// Axis-aligned bounding box in 2D.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum x (left)
    pub min_x: f64,
    /// Minimum y (top)
    pub min_y: f64,
    /// Maximum x (right)
    pub max_x: f64,
    /// Maximum y (bottom)
    pub max_y: f64,
}

impl Aabb {
    /// Create a new AABB from min/max corners.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create an AABB from origin and size.
    pub const fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }

    /// Grow the box by `padding` on every side.
    pub fn pad(&self, padding: f64) -> Self {
        Self {
            min_x: self.min_x - padding,
            min_y: self.min_y - padding,
            max_x: self.max_x + padding,
            max_y: self.max_y + padding,
        }
    }

    /// The smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Width times height, clamped at zero. Assumes no NaN.
    pub fn area(&self) -> f64 {
        let w = (self.max_x - self.min_x).max(0.0);
        let h = (self.max_y - self.min_y).max(0.0);
        w * h
    }

    /// Whether `other` lies entirely within this box (boundary included).
    pub fn contains(&self, other: &Self) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    /// Whether the two boxes share any point, boundary included.
    ///
    /// Boxes that only touch along an edge count as touching.
    pub fn touches(&self, other: &Self) -> bool {
        self.max_x >= other.min_x
            && self.max_y >= other.min_y
            && self.min_x <= other.max_x
            && self.min_y <= other.max_y
    }

    /// Whether the two boxes share interior area.
    ///
    /// Boxes that only touch along an edge do not count as overlapping.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.max_x > other.min_x
            && self.max_y > other.min_y
            && self.min_x < other.max_x
            && self.min_y < other.max_y
    }
}

/// Handle to a leaf indexed by a [`Bvh`](crate::Bvh).
///
/// A `Proxy` is a small, copyable handle consisting of the owning tree's
/// instance id, a slot index, and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `Proxy` that pointed to that
///   slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new,
///   distinct `Proxy`.
/// - A `Proxy` minted by one tree is rejected by every other tree
///   ([`Error::ForeignProxy`]), so a leaf can never be claimed by two trees.
///
/// Stale proxies never alias a different live leaf because the generation must
/// match. The generation increments on slot reuse and never decreases; `u32`
/// is ample for practical lifetimes, and behavior on generation overflow is
/// unspecified.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Proxy {
    pub(crate) tree: u32,
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl Proxy {
    pub(crate) const fn new(tree: u32, slot: u32, generation: u32) -> Self {
        Self {
            tree,
            slot,
            generation,
        }
    }

    pub(crate) const fn idx(self) -> usize {
        self.slot as usize
    }
}

/// Errors reported by [`Bvh`](crate::Bvh) operations.
///
/// Both variants are contract violations on the caller's side; the tree is
/// left unmodified when they are returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The proxy was minted by a different tree instance.
    ForeignProxy,
    /// The proxy's slot has been freed (and possibly reused) since it was minted.
    StaleProxy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignProxy => write!(f, "proxy belongs to another tree"),
            Self::StaleProxy => write!(f, "proxy no longer refers to a live leaf"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_area() {
        let a = Aabb::new(0.0, 0.0, 2.0, 3.0);
        let b = Aabb::new(-1.0, 1.0, 1.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u, Aabb::new(-1.0, 0.0, 2.0, 5.0));
        assert_eq!(a.area(), 6.0);
        assert_eq!(Aabb::new(1.0, 1.0, 0.0, 0.0).area(), 0.0);
    }

    #[test]
    fn touching_is_not_overlapping() {
        let a = Aabb::new(0.0, 0.0, 1.0, 1.0);
        let b = Aabb::new(1.0, 0.0, 2.0, 1.0);
        assert!(a.touches(&b));
        assert!(!a.overlaps(&b));
        let c = Aabb::new(0.5, 0.5, 2.0, 2.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn contains_includes_boundary() {
        let outer = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&Aabb::new(0.0, 0.0, 10.0, 10.0)));
        assert!(outer.contains(&Aabb::new(2.0, 2.0, 3.0, 3.0)));
        assert!(!outer.contains(&Aabb::new(2.0, 2.0, 3.0, 10.5)));
    }

    #[test]
    fn pad_is_symmetric() {
        let a = Aabb::new(0.0, 0.0, 1.0, 1.0).pad(0.5);
        assert_eq!(a, Aabb::new(-0.5, -0.5, 1.5, 1.5));
    }
}
