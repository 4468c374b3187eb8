// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Separating-axis narrow phase.
//!
//! [`test`] decides whether two bodies overlap and, when given a
//! [`CollisionResult`], reports the minimum translation data: the smallest
//! overlap magnitude, the unit direction along which moving body B by
//! `overlap * overlap_dir` separates the pair, and whether either body is
//! fully contained in the other.

use kurbo::Vec2;

use crate::body::{Body, Circle, Polygon};
use crate::world::BodyHandle;

/// Collision details from a narrow-phase [`test`].
///
/// One instance is meant to be reused across many tests; every call
/// overwrites every field, so stale data never leaks between tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionResult {
    /// Whether the bodies overlap.
    pub collision: bool,
    /// Handle of the source body, when the test ran through a
    /// [`World`](crate::World).
    pub a: Option<BodyHandle>,
    /// Handle of the target body, when the test ran through a
    /// [`World`](crate::World).
    pub b: Option<BodyHandle>,
    /// Whether A lies entirely within B.
    pub a_in_b: bool,
    /// Whether B lies entirely within A.
    pub b_in_a: bool,
    /// Magnitude of the shortest separating translation.
    pub overlap: f64,
    /// Unit direction of the shortest separating translation, pointing from
    /// A toward B. Zero when the bodies touch with zero overlap.
    pub overlap_dir: Vec2,
}

impl CollisionResult {
    /// A result with no collision recorded.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Test two bodies for overlap.
///
/// Both bodies' caches must be fresh ([`Body::refresh`] is idempotent;
/// [`World::collides`](crate::World::collides) refreshes automatically).
/// With `aabb` set, a cheap strict-inequality bounding-box rejection runs
/// before the axis tests; pass `false` when a broad phase already vouched
/// for the pair (note the broad phase's inclusive comparisons admit
/// exactly-touching boxes that this filter would reject).
pub fn test(a: &Body, b: &Body, mut result: Option<&mut CollisionResult>, aabb: bool) -> bool {
    if let Some(r) = result.as_deref_mut() {
        r.a = None;
        r.b = None;
        r.a_in_b = true;
        r.b_in_a = true;
        r.overlap = 0.0;
        r.overlap_dir = Vec2::ZERO;
    }

    let mut collision = false;
    if !aabb || a.aabb().overlaps(&b.aabb()) {
        collision = match (a, b) {
            (Body::Polygon(pa), Body::Polygon(pb)) => {
                polygon_polygon(pa, pb, result.as_deref_mut())
            }
            (Body::Polygon(pa), Body::Circle(cb)) => {
                polygon_circle(pa, cb, result.as_deref_mut(), false)
            }
            (Body::Circle(ca), Body::Polygon(pb)) => {
                polygon_circle(pb, ca, result.as_deref_mut(), true)
            }
            (Body::Circle(ca), Body::Circle(cb)) => circle_circle(ca, cb, result.as_deref_mut()),
        };
    }

    if let Some(r) = result {
        r.collision = collision;
    }

    collision
}

fn polygon_polygon(a: &Polygon, b: &Polygon, mut result: Option<&mut CollisionResult>) -> bool {
    let a_coords = a.coords();
    let b_coords = b.coords();

    // Two point bodies collide only at the exact same position.
    if a_coords.len() == 1 && b_coords.len() == 1 {
        if let Some(r) = result {
            r.overlap = 0.0;
        }
        return a_coords[0] == b_coords[0];
    }

    if a_coords.len() > 1 {
        for &axis in a.normals() {
            if separating_axis(a_coords, b_coords, axis, result.as_deref_mut()) {
                return false;
            }
        }
    }

    if b_coords.len() > 1 {
        for &axis in b.normals() {
            if separating_axis(a_coords, b_coords, axis, result.as_deref_mut()) {
                return false;
            }
        }
    }

    true
}

/// Project both vertex sets onto `axis` and report whether the projections
/// are disjoint. On overlap, folds the signed overlap into the result's
/// running minimum and narrows the containment flags.
fn separating_axis(
    a_coords: &[kurbo::Point],
    b_coords: &[kurbo::Point],
    axis: Vec2,
    result: Option<&mut CollisionResult>,
) -> bool {
    if a_coords.is_empty() || b_coords.is_empty() {
        return true;
    }

    let mut a_start = f64::INFINITY;
    let mut a_end = f64::NEG_INFINITY;
    let mut b_start = f64::INFINITY;
    let mut b_end = f64::NEG_INFINITY;

    for c in a_coords {
        let dot = c.to_vec2().dot(axis);
        a_start = a_start.min(dot);
        a_end = a_end.max(dot);
    }

    for c in b_coords {
        let dot = c.to_vec2().dot(axis);
        b_start = b_start.min(dot);
        b_end = b_end.max(dot);
    }

    if a_start > b_end || a_end < b_start {
        return true;
    }

    if let Some(r) = result {
        let overlap;

        if a_start < b_start {
            r.a_in_b = false;

            if a_end < b_end {
                overlap = a_end - b_start;
                r.b_in_a = false;
            } else {
                let option1 = a_end - b_start;
                let option2 = b_end - a_start;
                overlap = if option1 < option2 { option1 } else { -option2 };
            }
        } else {
            r.b_in_a = false;

            if a_end > b_end {
                overlap = a_start - b_end;
                r.a_in_b = false;
            } else {
                let option1 = a_end - b_start;
                let option2 = b_end - a_start;
                overlap = if option1 < option2 { option1 } else { -option2 };
            }
        }

        let absolute_overlap = overlap.abs();
        if r.overlap == 0.0 || r.overlap > absolute_overlap {
            // A zero overlap carries no direction.
            let sign = if overlap == 0.0 { 0.0 } else { overlap.signum() };
            r.overlap = absolute_overlap;
            r.overlap_dir = axis * sign;
        }
    }

    false
}

fn polygon_circle(
    a: &Polygon,
    b: &Circle,
    mut result: Option<&mut CollisionResult>,
    reverse: bool,
) -> bool {
    let a_coords = a.coords();
    let a_edges = a.edges();
    let a_normals = a.normals();
    let b_radius = b.scaled_radius();
    let b_radius2 = b_radius * 2.0;
    let radius_squared = b_radius * b_radius;
    let count = a_coords.len();

    let mut a_in_b = true;
    let mut b_in_a = true;
    let mut overlap = 0.0;
    let mut overlap_dir = Vec2::ZERO;

    if count == 1 {
        // Point body: plain point-in-circle.
        let coord = b.pos - a_coords[0];
        let length_squared = coord.hypot2();

        if length_squared > radius_squared {
            return false;
        }

        if result.is_some() {
            let length = coord.hypot();
            overlap = b_radius - length;
            overlap_dir = if length > 0.0 {
                coord / length
            } else {
                Vec2::new(1.0, 1.0)
            };
            b_in_a = false;
        }
    } else {
        for i in 0..count {
            let coord = b.pos - a_coords[i];
            let edge = a_edges[i];
            let dot = coord.dot(edge);
            // Voronoi region of the circle center relative to this edge:
            // behind the start vertex, past the end vertex, or alongside.
            let region = if dot < 0.0 {
                -1
            } else if dot > edge.hypot2() {
                1
            } else {
                0
            };

            let mut tmp_overlapping = false;
            let mut tmp_overlap = 0.0;
            let mut tmp_overlap_dir = Vec2::ZERO;

            if result.is_some() && a_in_b && coord.hypot2() > radius_squared {
                a_in_b = false;
            }

            if region != 0 {
                let left = region == -1;
                let other = if left {
                    if i == 0 { count - 1 } else { i - 1 }
                } else if i == count - 1 {
                    0
                } else {
                    i + 1
                };
                let coord2 = b.pos - a_coords[other];
                let edge2 = a_edges[other];
                let dot2 = coord2.dot(edge2);
                let region2 = if dot2 < 0.0 {
                    -1
                } else if dot2 > edge2.hypot2() {
                    1
                } else {
                    0
                };

                // Both adjacent edges agree the center sits in this corner
                // region, so the nearest feature is the shared vertex.
                if region2 == -region {
                    let target = if left { coord } else { coord2 };
                    let length_squared = target.hypot2();

                    if length_squared > radius_squared {
                        return false;
                    }

                    if result.is_some() {
                        let length = target.hypot();
                        tmp_overlapping = true;
                        tmp_overlap = b_radius - length;
                        tmp_overlap_dir = if length > 0.0 {
                            target / length
                        } else {
                            Vec2::new(1.0, 1.0)
                        };
                        b_in_a = false;
                    }
                }
            } else {
                let normal = a_normals[i];
                let length = coord.dot(normal);
                let absolute_length = length.abs();

                if length > 0.0 && absolute_length > b_radius {
                    return false;
                }

                if result.is_some() {
                    tmp_overlapping = true;
                    tmp_overlap = b_radius - length;
                    tmp_overlap_dir = normal;

                    if (b_in_a && length >= 0.0) || tmp_overlap < b_radius2 {
                        b_in_a = false;
                    }
                }
            }

            if tmp_overlapping && (overlap == 0.0 || overlap > tmp_overlap) {
                overlap = tmp_overlap;
                overlap_dir = tmp_overlap_dir;
            }
        }
    }

    if let Some(r) = result.as_deref_mut() {
        r.a_in_b = if reverse { b_in_a } else { a_in_b };
        r.b_in_a = if reverse { a_in_b } else { b_in_a };
        r.overlap = overlap;
        r.overlap_dir = if reverse { -overlap_dir } else { overlap_dir };
    }

    true
}

fn circle_circle(a: &Circle, b: &Circle, result: Option<&mut CollisionResult>) -> bool {
    let a_radius = a.scaled_radius();
    let b_radius = b.scaled_radius();
    let difference = b.pos - a.pos;
    let radius_sum = a_radius + b_radius;
    let length_squared = difference.hypot2();

    if length_squared > radius_sum * radius_sum {
        return false;
    }

    if let Some(r) = result {
        let length = difference.hypot();
        r.a_in_b = a_radius <= b_radius && length <= b_radius - a_radius;
        r.b_in_a = b_radius <= a_radius && length <= a_radius - b_radius;
        r.overlap = radius_sum - length;
        r.overlap_dir = if length > 0.0 {
            difference / length
        } else {
            Vec2::new(1.0, 1.0)
        };
    }

    true
}
