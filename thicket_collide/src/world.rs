// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The owning collision system: a body store plus a broad-phase tree.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use kurbo::Point;
use thicket_bvh::{Aabb, Bvh, Proxy};

use crate::body::{Body, Circle, Polygon};
use crate::sat::{self, CollisionResult};

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// Generational handle to a body owned by a [`World`].
///
/// Handles stay valid across moves and detach/attach cycles and go stale
/// when the body is removed, even if its slot is later reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BodyHandle {
    world: u32,
    slot: u32,
    generation: u32,
}

impl BodyHandle {
    fn idx(self) -> usize {
        self.slot as usize
    }
}

/// Errors from [`World`] operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The handle was minted by a different world.
    ForeignBody,
    /// The handle no longer refers to a live body.
    StaleBody,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ForeignBody => write!(f, "body belongs to another world"),
            Self::StaleBody => write!(f, "body handle no longer refers to a live body"),
        }
    }
}

impl core::error::Error for Error {}

impl From<thicket_bvh::Error> for Error {
    fn from(e: thicket_bvh::Error) -> Self {
        match e {
            thicket_bvh::Error::ForeignProxy => Self::ForeignBody,
            thicket_bvh::Error::StaleProxy => Self::StaleBody,
        }
    }
}

struct Slot {
    generation: u32,
    body: Body,
    proxy: Proxy,
    attached: bool,
    /// The padding value the body was last indexed with. Re-synced from the
    /// body's `padding` field during [`World::update`].
    indexed_padding: f64,
}

/// A collision system that owns bodies and keeps a broad-phase BVH over
/// their padded bounding boxes.
///
/// The intended per-frame flow: mutate bodies through [`World::get_mut`],
/// call [`World::update`] once, then ask [`World::potentials`] for candidate
/// pairs and confirm each with [`World::collides`].
pub struct World {
    id: u32,
    bvh: Bvh<BodyHandle>,
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    free: Vec<u32>,
    len: usize,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for World {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.len)
            .field("bvh", &self.bvh)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create an empty collision system.
    pub fn new() -> Self {
        Self {
            id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
            bvh: Bvh::new(),
            slots: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of bodies owned by this world.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this world owns no bodies.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `handle` refers to a live body of this world.
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.check(handle).is_ok()
    }

    /// Insert a body and index it.
    pub fn insert(&mut self, mut body: Body) -> BodyHandle {
        body.refresh();
        let padding = body.padding();
        let aabb = body.aabb().pad(padding);

        let (slot, generation) = if let Some(slot) = self.free.pop() {
            let generation = self.generations[slot as usize].saturating_add(1);
            self.generations[slot as usize] = generation;
            (slot, generation)
        } else {
            self.slots.push(None);
            self.generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "slot indices are 32-bit by design"
            )]
            let slot = (self.slots.len() - 1) as u32;
            (slot, 1)
        };

        let handle = BodyHandle {
            world: self.id,
            slot,
            generation,
        };
        let proxy = self.bvh.insert(aabb, handle);
        self.slots[slot as usize] = Some(Slot {
            generation,
            body,
            proxy,
            attached: true,
            indexed_padding: padding,
        });
        self.len += 1;
        handle
    }

    /// Create and insert a circle.
    pub fn create_circle(&mut self, pos: Point, radius: f64, scale: f64, padding: f64) -> BodyHandle {
        let mut circle = Circle::new(pos, radius);
        circle.scale = scale;
        circle.padding = padding;
        self.insert(Body::Circle(circle))
    }

    /// Create and insert a convex polygon with no rotation and unit scale.
    pub fn create_polygon(&mut self, pos: Point, points: Vec<Point>, padding: f64) -> BodyHandle {
        let mut polygon = Polygon::new(pos, points);
        polygon.padding = padding;
        self.insert(Body::Polygon(polygon))
    }

    /// Create and insert a point body.
    pub fn create_point(&mut self, pos: Point, padding: f64) -> BodyHandle {
        let mut polygon = Polygon::point(pos);
        polygon.padding = padding;
        self.insert(Body::Polygon(polygon))
    }

    /// Remove a body entirely, returning it.
    pub fn remove(&mut self, handle: BodyHandle) -> Result<Body, Error> {
        self.check(handle)?;
        let slot = self.slots[handle.idx()]
            .take()
            .expect("live slot checked above");
        self.bvh
            .remove(slot.proxy)
            .expect("world proxy must be live");
        self.free.push(handle.slot);
        self.len -= 1;
        Ok(slot.body)
    }

    /// Take a body out of the broad phase without removing it from the
    /// world. Detached bodies are skipped by [`World::potentials`] but can
    /// still be tested directly with [`World::collides`]. No-op when already
    /// detached.
    pub fn detach(&mut self, handle: BodyHandle) -> Result<(), Error> {
        self.check(handle)?;
        let slot = self.slot_mut(handle.idx());
        slot.attached = false;
        let proxy = slot.proxy;
        self.bvh.detach(proxy).expect("world proxy must be live");
        Ok(())
    }

    /// Put a detached body back into the broad phase, re-indexing it at its
    /// current position. No-op when already attached.
    pub fn attach(&mut self, handle: BodyHandle) -> Result<(), Error> {
        self.check(handle)?;
        let slot = self.slot_mut(handle.idx());
        if slot.attached {
            return Ok(());
        }
        slot.attached = true;
        slot.body.refresh();
        let aabb = slot.body.aabb().pad(slot.indexed_padding);
        let proxy = slot.proxy;
        self.bvh.attach(proxy, aabb).expect("world proxy must be live");
        Ok(())
    }

    /// Re-index every body that needs it and return how many were re-indexed.
    ///
    /// A body is re-indexed when its `padding` field changed, or when its
    /// current tight box has escaped the padded box it was indexed with.
    /// Bodies that moved within their padding are left alone, which is the
    /// point of padding: a second call with no intervening changes returns 0.
    /// Detached bodies are not touched.
    ///
    /// Call once per frame before querying [`World::potentials`].
    pub fn update(&mut self) -> usize {
        let mut reindexed = 0;
        for idx in 0..self.slots.len() {
            let Some(slot) = self.slots[idx].as_mut() else {
                continue;
            };
            if !slot.attached {
                continue;
            }

            let mut stale = false;

            let padding = slot.body.padding();
            if padding != slot.indexed_padding {
                slot.indexed_padding = padding;
                stale = true;
            }

            if !stale {
                slot.body.refresh();
                let tight = slot.body.aabb();
                let indexed = self
                    .bvh
                    .aabb(slot.proxy)
                    .expect("world proxy must be live");
                stale = tight.min_x < indexed.min_x
                    || tight.min_y < indexed.min_y
                    || tight.max_x > indexed.max_x
                    || tight.max_y > indexed.max_y;
            }

            if stale {
                slot.body.refresh();
                let aabb = slot.body.aabb().pad(slot.indexed_padding);
                let proxy = slot.proxy;
                self.bvh.detach(proxy).expect("world proxy must be live");
                self.bvh
                    .attach(proxy, aabb)
                    .expect("world proxy must be live");
                reindexed += 1;
            }
        }
        reindexed
    }

    /// Broad-phase candidates for a body: every other attached body whose
    /// padded box touches this body's padded box.
    pub fn potentials(&self, handle: BodyHandle) -> Result<Vec<BodyHandle>, Error> {
        self.check(handle)?;
        let proxy = self.slot(handle.idx()).proxy;
        let pairs = self.bvh.potentials(proxy)?;
        Ok(pairs.into_iter().map(|(_, h)| h).collect())
    }

    /// Narrow-phase test between two bodies, refreshing their caches first.
    ///
    /// With a [`CollisionResult`], every field is overwritten, including the
    /// two handles. Pass `aabb: false` to skip the bounding-box pre-filter
    /// when a broad-phase query already vouched for the pair.
    pub fn collides(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        mut result: Option<&mut CollisionResult>,
        aabb: bool,
    ) -> Result<bool, Error> {
        self.check(a)?;
        self.check(b)?;

        self.slot_mut(a.idx()).body.refresh();
        if b.slot != a.slot {
            self.slot_mut(b.idx()).body.refresh();
        }

        let body_a = &self.slot(a.idx()).body;
        let body_b = &self.slot(b.idx()).body;
        let collision = sat::test(body_a, body_b, result.as_deref_mut(), aabb);

        if let Some(r) = result {
            r.a = Some(a);
            r.b = Some(b);
        }
        Ok(collision)
    }

    /// Shared access to a body.
    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.check(handle).ok()?;
        Some(&self.slot(handle.idx()).body)
    }

    /// Mutable access to a body. Position, rotation, scale, and padding
    /// changes take effect in the broad phase at the next [`World::update`].
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.check(handle).ok()?;
        Some(&mut self.slot_mut(handle.idx()).body)
    }

    /// The padded box a body is currently indexed with, or `None` for a
    /// stale or foreign handle.
    pub fn indexed_aabb(&self, handle: BodyHandle) -> Option<Aabb> {
        self.check(handle).ok()?;
        self.bvh.aabb(self.slot(handle.idx()).proxy)
    }

    /// The underlying broad-phase tree, for diagnostics.
    pub fn bvh(&self) -> &Bvh<BodyHandle> {
        &self.bvh
    }

    fn check(&self, handle: BodyHandle) -> Result<(), Error> {
        if handle.world != self.id {
            return Err(Error::ForeignBody);
        }
        match self.slots.get(handle.idx()) {
            Some(Some(slot)) if slot.generation == handle.generation => Ok(()),
            _ => Err(Error::StaleBody),
        }
    }

    fn slot(&self, idx: usize) -> &Slot {
        self.slots[idx].as_ref().expect("dangling body slot")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        self.slots[idx].as_mut().expect("dangling body slot")
    }
}
