// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collidable bodies: circles and convex polygons (points are one-vertex
//! polygons).

use alloc::vec::Vec;
use kurbo::{Affine, Point, Vec2};
use thicket_bvh::Aabb;

/// A circle, scaled uniformly about its center.
#[derive(Clone, Debug, PartialEq)]
pub struct Circle {
    /// Center position in world space.
    pub pos: Point,
    /// Unscaled radius.
    pub radius: f64,
    /// Uniform scale applied to the radius.
    pub scale: f64,
    /// Extra margin added to the indexed bounding box. Larger values mean
    /// fewer re-index operations for a moving body at the cost of more
    /// broad-phase candidates.
    pub padding: f64,
}

impl Circle {
    /// A circle at `pos` with `radius`, unit scale, and no padding.
    pub fn new(pos: Point, radius: f64) -> Self {
        Self {
            pos,
            radius,
            scale: 1.0,
            padding: 0.0,
        }
    }

    /// Effective world-space radius.
    pub fn scaled_radius(&self) -> f64 {
        self.radius * self.scale
    }

    /// Tight world-space bounding box.
    pub fn aabb(&self) -> Aabb {
        let r = self.scaled_radius();
        Aabb::new(self.pos.x - r, self.pos.y - r, self.pos.x + r, self.pos.y + r)
    }
}

/// A convex polygon defined by model-space vertices and a position, rotation,
/// and per-axis scale.
///
/// World-space vertices, edges, outward unit normals, and bounds are cached
/// and recomputed lazily: [`Polygon::refresh`] compares the current transform
/// fields against the transform the cache was built from and recomputes only
/// on a mismatch (or after [`Polygon::set_points`]).
///
/// Vertices are transformed in scale, rotate, translate order. Winding is not
/// enforced; the narrow phase works with either orientation, but vertices
/// must describe a convex shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// Position in world space.
    pub pos: Point,
    /// Rotation in radians.
    pub angle: f64,
    /// Per-axis scale applied to the model points.
    pub scale: Vec2,
    /// Extra margin added to the indexed bounding box.
    pub padding: f64,

    points: Vec<Point>,

    cached_pos: Point,
    cached_angle: f64,
    cached_scale: Vec2,
    coords: Vec<Point>,
    edges: Vec<Vec2>,
    normals: Vec<Vec2>,
    bounds: Aabb,
    dirty_coords: bool,
    dirty_normals: bool,
}

impl Polygon {
    /// A polygon at `pos` with the given model-space vertices, no rotation,
    /// unit scale, and no padding.
    pub fn new(pos: Point, points: Vec<Point>) -> Self {
        Self {
            pos,
            angle: 0.0,
            scale: Vec2::new(1.0, 1.0),
            padding: 0.0,
            points,
            cached_pos: pos,
            cached_angle: 0.0,
            cached_scale: Vec2::new(1.0, 1.0),
            coords: Vec::new(),
            edges: Vec::new(),
            normals: Vec::new(),
            bounds: Aabb::new(0.0, 0.0, 0.0, 0.0),
            dirty_coords: true,
            dirty_normals: true,
        }
    }

    /// A single-vertex polygon, used as a point body.
    pub fn point(pos: Point) -> Self {
        Self::new(pos, alloc::vec![Point::ZERO])
    }

    /// Whether this polygon is a single-vertex point body.
    pub fn is_point(&self) -> bool {
        self.points.len() == 1
    }

    /// Replace the model-space vertices, invalidating the cache.
    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
        self.dirty_coords = true;
    }

    /// The model-space vertices.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Cached world-space vertices. Valid after [`Polygon::refresh`].
    pub fn coords(&self) -> &[Point] {
        &self.coords
    }

    /// Cached world-space edge vectors, one per vertex, wrapping at the end.
    pub fn edges(&self) -> &[Vec2] {
        &self.edges
    }

    /// Cached outward unit normals, one per edge. Zero for degenerate edges.
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    /// Cached tight world-space bounding box. Valid after [`Polygon::refresh`].
    pub fn aabb(&self) -> Aabb {
        self.bounds
    }

    /// Whether the cache is out of date with the current transform fields.
    pub fn needs_refresh(&self) -> bool {
        self.dirty_coords
            || self.pos != self.cached_pos
            || self.angle != self.cached_angle
            || self.scale != self.cached_scale
    }

    /// Bring the world-space cache up to date. Idempotent; a no-op when the
    /// transform and points are unchanged since the last refresh.
    pub fn refresh(&mut self) {
        if self.needs_refresh() {
            self.calculate_coords();
        }
        if self.dirty_normals {
            self.calculate_normals();
        }
    }

    fn calculate_coords(&mut self) {
        let transform = Affine::translate(self.pos.to_vec2())
            * Affine::rotate(self.angle)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y);

        self.coords.clear();
        let mut bounds: Option<Aabb> = None;
        for &p in &self.points {
            let c = transform * p;
            bounds = Some(match bounds {
                None => Aabb::new(c.x, c.y, c.x, c.y),
                Some(b) => Aabb::new(
                    b.min_x.min(c.x),
                    b.min_y.min(c.y),
                    b.max_x.max(c.x),
                    b.max_y.max(c.y),
                ),
            });
            self.coords.push(c);
        }
        self.bounds =
            bounds.unwrap_or(Aabb::new(self.pos.x, self.pos.y, self.pos.x, self.pos.y));

        self.cached_pos = self.pos;
        self.cached_angle = self.angle;
        self.cached_scale = self.scale;
        self.dirty_coords = false;
        self.dirty_normals = true;
    }

    fn calculate_normals(&mut self) {
        self.edges.clear();
        self.normals.clear();
        let count = self.coords.len();
        for i in 0..count {
            let next = self.coords[if i + 1 == count { 0 } else { i + 1 }];
            let edge = next - self.coords[i];
            let length = edge.hypot();
            let normal = if length > 0.0 {
                Vec2::new(edge.y / length, -edge.x / length)
            } else {
                Vec2::ZERO
            };
            self.edges.push(edge);
            self.normals.push(normal);
        }
        self.dirty_normals = false;
    }
}

/// A collidable body.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// A scaled circle.
    Circle(Circle),
    /// A convex polygon (or a one-vertex point).
    Polygon(Polygon),
}

impl Body {
    /// A point body at `pos`: a one-vertex polygon.
    pub fn point(pos: Point) -> Self {
        Self::Polygon(Polygon::point(pos))
    }

    /// Bring any lazy caches up to date. Idempotent.
    pub fn refresh(&mut self) {
        if let Self::Polygon(p) = self {
            p.refresh();
        }
    }

    /// Tight (unpadded) world-space bounding box.
    ///
    /// For polygons this reads the cache; call [`Body::refresh`] first if the
    /// body may have moved.
    pub fn aabb(&self) -> Aabb {
        match self {
            Self::Circle(c) => c.aabb(),
            Self::Polygon(p) => p.aabb(),
        }
    }

    /// The body's broad-phase padding margin.
    pub fn padding(&self) -> f64 {
        match self {
            Self::Circle(c) => c.padding,
            Self::Polygon(p) => p.padding,
        }
    }

    /// Shared access to the circle variant.
    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            Self::Circle(c) => Some(c),
            Self::Polygon(_) => None,
        }
    }

    /// Mutable access to the circle variant.
    pub fn as_circle_mut(&mut self) -> Option<&mut Circle> {
        match self {
            Self::Circle(c) => Some(c),
            Self::Polygon(_) => None,
        }
    }

    /// Shared access to the polygon variant.
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Self::Polygon(p) => Some(p),
            Self::Circle(_) => None,
        }
    }

    /// Mutable access to the polygon variant.
    pub fn as_polygon_mut(&mut self) -> Option<&mut Polygon> {
        match self {
            Self::Polygon(p) => Some(p),
            Self::Circle(_) => None,
        }
    }
}

impl From<Circle> for Body {
    fn from(c: Circle) -> Self {
        Self::Circle(c)
    }
}

impl From<Polygon> for Body {
    fn from(p: Polygon) -> Self {
        Self::Polygon(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn circle_aabb_uses_scaled_radius() {
        let mut c = Circle::new(Point::new(10.0, -5.0), 4.0);
        c.scale = 2.0;
        let b = c.aabb();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (2.0, -13.0, 18.0, 3.0));
    }

    #[test]
    fn polygon_cache_is_lazy_and_idempotent() {
        let mut p = Polygon::new(
            Point::new(1.0, 2.0),
            vec![Point::ZERO, Point::new(4.0, 0.0), Point::new(4.0, 3.0)],
        );
        assert!(p.needs_refresh());
        p.refresh();
        assert!(!p.needs_refresh());
        assert_eq!(p.coords()[0], Point::new(1.0, 2.0));
        assert_eq!(p.coords()[2], Point::new(5.0, 5.0));
        assert_eq!(p.aabb(), Aabb::new(1.0, 2.0, 5.0, 5.0));

        // No transform change: refresh leaves the cache alone.
        let before = p.coords().to_vec();
        p.refresh();
        assert_eq!(p.coords(), &before[..]);

        // A field write is picked up by the next refresh.
        p.pos = Point::new(0.0, 0.0);
        assert!(p.needs_refresh());
        p.refresh();
        assert_eq!(p.coords()[0], Point::ZERO);
    }

    #[test]
    fn rotation_rotates_about_position() {
        let mut p = Polygon::new(Point::new(10.0, 0.0), vec![Point::new(2.0, 0.0)]);
        p.angle = core::f64::consts::FRAC_PI_2;
        p.refresh();
        let c = p.coords()[0];
        assert!((c.x - 10.0).abs() < 1e-12);
        assert!((c.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn normals_are_unit_perpendiculars() {
        let mut p = Polygon::new(
            Point::ZERO,
            vec![Point::ZERO, Point::new(2.0, 0.0), Point::new(2.0, 2.0)],
        );
        p.refresh();
        // First edge runs along +x, so its normal is (0, -1).
        assert_eq!(p.normals()[0], Vec2::new(0.0, -1.0));
        for n in p.normals() {
            assert!((n.hypot() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn point_body_has_zero_edge_and_normal() {
        let mut p = Polygon::point(Point::new(3.0, 4.0));
        p.refresh();
        assert!(p.is_point());
        assert_eq!(p.coords(), &[Point::new(3.0, 4.0)]);
        assert_eq!(p.edges(), &[Vec2::ZERO]);
        assert_eq!(p.normals(), &[Vec2::ZERO]);
    }

    #[test]
    fn set_points_marks_cache_dirty() {
        let mut p = Polygon::new(Point::ZERO, vec![Point::ZERO, Point::new(1.0, 0.0)]);
        p.refresh();
        p.set_points(vec![Point::ZERO, Point::new(5.0, 0.0)]);
        assert!(p.needs_refresh());
        p.refresh();
        assert_eq!(p.aabb(), Aabb::new(0.0, 0.0, 5.0, 0.0));
    }
}
