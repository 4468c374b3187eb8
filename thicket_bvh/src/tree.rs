// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: arena, insertion heuristic, removal splice, queries.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::types::{Aabb, Error, Proxy};

/// Source of unique per-instance tree ids, used to detect foreign proxies.
static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

/// A child slot of a branch: either another branch or an indexed leaf.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Child {
    Branch(u32),
    Leaf(u32),
}

/// Internal tree node. Lives in the branch arena; freed slots form the pool.
#[derive(Clone, Debug, PartialEq)]
struct Branch {
    parent: Option<u32>,
    left: Child,
    right: Child,
    /// Descent order assigned during the insertion walk; inherited by a
    /// promoted sibling branch on removal.
    sort: u32,
    /// Cached union of both children's AABBs.
    aabb: Aabb,
}

#[derive(Clone, Debug)]
struct Leaf<P> {
    generation: u32,
    payload: P,
    /// The (padded) box this leaf was last indexed with.
    aabb: Aabb,
    parent: Option<u32>,
    /// Whether the leaf currently participates in the tree. Detached leaves
    /// keep their slot, payload, and cached box.
    attached: bool,
}

/// An incrementally maintained bounding-volume hierarchy over 2D AABBs.
///
/// Leaves are inserted one at a time with a greedy least-area-growth descent
/// and removed by splicing their sibling into the parent's place. Internal
/// branch nodes live in a slot arena whose free list doubles as the node
/// pool, so steady-state insert/remove churn performs no allocation.
pub struct Bvh<P: Copy> {
    id: u32,
    root: Option<Child>,
    branches: Vec<Option<Branch>>,
    branch_pool: Vec<u32>,
    leaves: Vec<Option<Leaf<P>>>,
    leaf_generations: Vec<u32>, // last generation per slot (persists across frees)
    leaf_free: Vec<u32>,
    len: usize,
}

impl<P: Copy> Default for Bvh<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy> core::fmt::Debug for Bvh<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let root = match self.root {
            None => "empty",
            Some(Child::Leaf(_)) => "leaf",
            Some(Child::Branch(_)) => "branch",
        };
        f.debug_struct("Bvh")
            .field("leaves", &self.len)
            .field("branches", &(self.branches.len() - self.branch_pool.len()))
            .field("pooled", &self.branch_pool.len())
            .field("root", &root)
            .finish_non_exhaustive()
    }
}

impl<P: Copy> Bvh<P> {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            root: None,
            branches: Vec::new(),
            branch_pool: Vec::new(),
            leaves: Vec::new(),
            leaf_generations: Vec::new(),
            leaf_free: Vec::new(),
            len: 0,
        }
    }

    /// Number of leaves currently indexed (attached or detached).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree indexes no leaves.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `proxy` refers to a live leaf of this tree.
    pub fn contains(&self, proxy: Proxy) -> bool {
        self.check(proxy).is_ok()
    }

    /// The cached (padded) box a leaf was last indexed with, or `None` if the
    /// proxy is stale or foreign.
    pub fn aabb(&self, proxy: Proxy) -> Option<Aabb> {
        let slot = self.check(proxy).ok()?;
        Some(self.leaf(slot).aabb)
    }

    /// Insert a new leaf and return its proxy.
    pub fn insert(&mut self, aabb: Aabb, payload: P) -> Proxy {
        let (slot, generation) = if let Some(slot) = self.leaf_free.pop() {
            let generation = self.leaf_generations[slot as usize].saturating_add(1);
            self.leaf_generations[slot as usize] = generation;
            (slot, generation)
        } else {
            self.leaves.push(None);
            self.leaf_generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "slot indices are 32-bit by design"
            )]
            let slot = (self.leaves.len() - 1) as u32;
            (slot, 1)
        };
        self.leaves[slot as usize] = Some(Leaf {
            generation,
            payload,
            aabb,
            parent: None,
            attached: true,
        });
        self.len += 1;
        self.insert_leaf(slot, aabb);
        Proxy::new(self.id, slot, generation)
    }

    /// Remove a leaf entirely, freeing its slot, and return its payload.
    ///
    /// The tree is left unmodified on error.
    pub fn remove(&mut self, proxy: Proxy) -> Result<P, Error> {
        let slot = self.check(proxy)?;
        if self.leaf(slot).attached {
            self.remove_leaf(slot);
        }
        let leaf = self.leaves[slot as usize]
            .take()
            .expect("live leaf checked above");
        self.leaf_free.push(slot);
        self.len -= 1;
        Ok(leaf.payload)
    }

    /// Temporarily unlink a leaf from the tree without freeing its slot.
    ///
    /// Detaching an already-detached leaf is a no-op.
    pub fn detach(&mut self, proxy: Proxy) -> Result<(), Error> {
        let slot = self.check(proxy)?;
        if self.leaf(slot).attached {
            self.remove_leaf(slot);
        }
        Ok(())
    }

    /// Re-link a detached leaf with a fresh box.
    ///
    /// Attaching an already-attached leaf is a no-op (its box is not changed;
    /// detach first to re-index it).
    pub fn attach(&mut self, proxy: Proxy, aabb: Aabb) -> Result<(), Error> {
        let slot = self.check(proxy)?;
        if self.leaf(slot).attached {
            return Ok(());
        }
        let leaf = self.leaf_mut(slot);
        leaf.aabb = aabb;
        leaf.attached = true;
        self.insert_leaf(slot, aabb);
        Ok(())
    }

    /// Every other leaf whose cached box touches `proxy`'s cached box.
    ///
    /// This is a conservative broad-phase filter over the padded boxes the
    /// leaves were indexed with; callers still need an exact narrow-phase
    /// test. Returns an empty list when the tree holds fewer than two
    /// attached leaves.
    pub fn potentials(&self, proxy: Proxy) -> Result<Vec<(Proxy, P)>, Error> {
        let slot = self.check(proxy)?;
        let q = self.leaf(slot).aabb;

        let mut results = Vec::new();
        let Some(root) = self.root else {
            return Ok(results);
        };
        if matches!(root, Child::Leaf(_)) {
            return Ok(results);
        }

        // Stackless depth-first walk using parent back-references. The
        // left-hand descent admits boxes that merely touch the query box,
        // while the right-hand step requires interior overlap.
        let mut current = root;
        let mut traverse_left = true;
        loop {
            if traverse_left {
                traverse_left = false;

                let mut left = match current {
                    Child::Branch(b) => Some(self.branch(b).left),
                    Child::Leaf(_) => None,
                };
                while let Some(l) = left {
                    if !self.child_aabb(l).touches(&q) {
                        break;
                    }
                    current = l;
                    left = match current {
                        Child::Branch(b) => Some(self.branch(b).left),
                        Child::Leaf(_) => None,
                    };
                }
            }

            let right = match current {
                Child::Branch(b) => Some(self.branch(b).right),
                Child::Leaf(_) => None,
            };

            let descend = match right {
                Some(r) => self.child_aabb(r).overlaps(&q),
                None => false,
            };
            if descend {
                current = right.expect("overlap implies a right child");
                traverse_left = true;
                continue;
            }

            if let Child::Leaf(s) = current
                && s != slot
            {
                let leaf = self.leaf(s);
                results.push((Proxy::new(self.id, s, leaf.generation), leaf.payload));
            }

            // Climb until we arrive from a left child, then take that
            // branch's right side on the next iteration.
            let mut parent = self.parent_of(current);
            loop {
                match parent {
                    Some(p) if self.branch(p).right == current => {
                        current = Child::Branch(p);
                        parent = self.branch(p).parent;
                    }
                    _ => break,
                }
            }
            match parent {
                Some(p) => current = Child::Branch(p),
                None => break,
            }
        }

        Ok(results)
    }

    /// Drop every leaf and branch, keeping the instance id and allocations.
    pub fn clear(&mut self) {
        self.root = None;
        self.branches.clear();
        self.branch_pool.clear();
        self.leaves.clear();
        self.leaf_generations.clear();
        self.leaf_free.clear();
        self.len = 0;
    }

    /// Structural consistency check, intended for tests and debugging.
    ///
    /// Verifies that every branch's cached box equals the union of its
    /// children's boxes, that parent back-references agree with child links,
    /// and that the arena accounting (live branches vs. attached leaves)
    /// holds.
    pub fn validate(&self) -> bool {
        let mut attached = 0_usize;
        for (i, slot) in self.leaves.iter().enumerate() {
            let Some(leaf) = slot else { continue };
            if !leaf.attached {
                if leaf.parent.is_some() {
                    return false;
                }
                continue;
            }
            attached += 1;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "slot indices are 32-bit by design"
            )]
            let me = Child::Leaf(i as u32);
            match leaf.parent {
                Some(p) => {
                    let b = self.branch(p);
                    if b.left != me && b.right != me {
                        return false;
                    }
                }
                None => {
                    if self.root != Some(me) {
                        return false;
                    }
                }
            }
        }

        let mut live_branches = 0_usize;
        for (i, slot) in self.branches.iter().enumerate() {
            let Some(branch) = slot else { continue };
            live_branches += 1;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "slot indices are 32-bit by design"
            )]
            let idx = i as u32;
            let me = Child::Branch(idx);
            let expected = self
                .child_aabb(branch.left)
                .union(&self.child_aabb(branch.right));
            if branch.aabb != expected {
                return false;
            }
            if self.parent_of(branch.left) != Some(idx)
                || self.parent_of(branch.right) != Some(idx)
            {
                return false;
            }
            match branch.parent {
                Some(p) => {
                    let b = self.branch(p);
                    if b.left != me && b.right != me {
                        return false;
                    }
                }
                None => {
                    if self.root != Some(me) {
                        return false;
                    }
                }
            }
        }

        match attached {
            0 => self.root.is_none() && live_branches == 0,
            n => live_branches == n - 1,
        }
    }

    // --- internals ---

    fn check(&self, proxy: Proxy) -> Result<u32, Error> {
        if proxy.tree != self.id {
            return Err(Error::ForeignProxy);
        }
        match self.leaves.get(proxy.idx()) {
            Some(Some(leaf)) if leaf.generation == proxy.generation => Ok(proxy.slot),
            _ => Err(Error::StaleProxy),
        }
    }

    fn leaf(&self, slot: u32) -> &Leaf<P> {
        self.leaves[slot as usize]
            .as_ref()
            .expect("dangling leaf slot")
    }

    fn leaf_mut(&mut self, slot: u32) -> &mut Leaf<P> {
        self.leaves[slot as usize]
            .as_mut()
            .expect("dangling leaf slot")
    }

    fn branch(&self, idx: u32) -> &Branch {
        self.branches[idx as usize]
            .as_ref()
            .expect("dangling branch slot")
    }

    fn branch_mut(&mut self, idx: u32) -> &mut Branch {
        self.branches[idx as usize]
            .as_mut()
            .expect("dangling branch slot")
    }

    fn child_aabb(&self, child: Child) -> Aabb {
        match child {
            Child::Branch(b) => self.branch(b).aabb,
            Child::Leaf(s) => self.leaf(s).aabb,
        }
    }

    fn parent_of(&self, child: Child) -> Option<u32> {
        match child {
            Child::Branch(b) => self.branch(b).parent,
            Child::Leaf(s) => self.leaf(s).parent,
        }
    }

    fn set_parent(&mut self, child: Child, parent: Option<u32>) {
        match child {
            Child::Branch(b) => self.branch_mut(b).parent = parent,
            Child::Leaf(s) => self.leaf_mut(s).parent = parent,
        }
    }

    /// Take a branch slot from the pool, or grow the arena.
    fn acquire_branch(&mut self, branch: Branch) -> u32 {
        if let Some(idx) = self.branch_pool.pop() {
            self.branches[idx as usize] = Some(branch);
            idx
        } else {
            self.branches.push(Some(branch));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "slot indices are 32-bit by design"
            )]
            let idx = (self.branches.len() - 1) as u32;
            idx
        }
    }

    /// Greedy descent: at each branch, pick the child whose box grows least
    /// in area when merged with the new leaf's box, widening every visited
    /// branch's cached box on the way down. The walk stops at the first leaf,
    /// which gets a pooled branch spliced in above it.
    fn insert_leaf(&mut self, slot: u32, aabb: Aabb) {
        let Some(mut current) = self.root else {
            self.root = Some(Child::Leaf(slot));
            return;
        };

        let mut sort = 0_u32;
        loop {
            match current {
                Child::Branch(b) => {
                    let (left, right) = {
                        let branch = self.branch(b);
                        (branch.left, branch.right)
                    };
                    let left_aabb = self.child_aabb(left);
                    let right_aabb = self.child_aabb(right);
                    let left_union = left_aabb.union(&aabb);
                    let right_union = right_aabb.union(&aabb);
                    let left_growth = left_union.area() - left_aabb.area();
                    let right_growth = right_union.area() - right_aabb.area();

                    let branch = self.branch_mut(b);
                    branch.sort = sort;
                    sort += 1;
                    branch.aabb = left_union.union(&right_union);

                    current = if left_growth <= right_growth { left } else { right };
                }
                Child::Leaf(old) => {
                    let grandparent = self.leaf(old).parent;
                    let old_aabb = self.leaf(old).aabb;
                    let new_branch = self.acquire_branch(Branch {
                        parent: grandparent,
                        left: Child::Leaf(old),
                        right: Child::Leaf(slot),
                        sort,
                        aabb: old_aabb.union(&aabb),
                    });
                    self.leaf_mut(old).parent = Some(new_branch);
                    self.leaf_mut(slot).parent = Some(new_branch);

                    match grandparent {
                        None => self.root = Some(Child::Branch(new_branch)),
                        Some(g) => {
                            let gb = self.branch_mut(g);
                            if gb.left == Child::Leaf(old) {
                                gb.left = Child::Branch(new_branch);
                            } else {
                                gb.right = Child::Branch(new_branch);
                            }
                        }
                    }
                    break;
                }
            }
        }
    }

    /// Unlink a leaf: promote its sibling into the parent's place, re-union
    /// every ancestor box from the grandparent to the root, and release the
    /// vacated branch to the pool. No-op for a leaf that is not in the tree.
    fn remove_leaf(&mut self, slot: u32) {
        let me = Child::Leaf(slot);
        if self.root == Some(me) {
            self.root = None;
            let leaf = self.leaf_mut(slot);
            leaf.attached = false;
            return;
        }

        let Some(p) = self.leaf(slot).parent else {
            return;
        };
        let parent = self.branches[p as usize]
            .take()
            .expect("leaf parent must be live");

        let sibling = if parent.left == me {
            parent.right
        } else {
            parent.left
        };
        self.set_parent(sibling, parent.parent);
        if let Child::Branch(sb) = sibling {
            self.branch_mut(sb).sort = parent.sort;
        }

        match parent.parent {
            Some(g) => {
                let gb = self.branch_mut(g);
                if gb.left == Child::Branch(p) {
                    gb.left = sibling;
                } else {
                    gb.right = sibling;
                }

                let mut cursor = Some(g);
                while let Some(b) = cursor {
                    let (left, right) = {
                        let branch = self.branch(b);
                        (branch.left, branch.right)
                    };
                    let aabb = self.child_aabb(left).union(&self.child_aabb(right));
                    let branch = self.branch_mut(b);
                    branch.aabb = aabb;
                    cursor = branch.parent;
                }
            }
            None => self.root = Some(sibling),
        }

        self.branch_pool.push(p);
        let leaf = self.leaf_mut(slot);
        leaf.parent = None;
        leaf.attached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn boxes(n: usize) -> Vec<Aabb> {
        // Deterministic spread of boxes with some overlap between neighbors.
        (0..n)
            .map(|i| {
                let x = (i % 7) as f64 * 8.0;
                let y = (i / 7) as f64 * 6.0;
                Aabb::from_xywh(x, y, 10.0, 7.0)
            })
            .collect()
    }

    fn brute_force_pairs(items: &[(Proxy, Aabb)], q: &Aabb, me: Proxy) -> Vec<Proxy> {
        items
            .iter()
            .filter(|(p, a)| *p != me && a.touches(q))
            .map(|(p, _)| *p)
            .collect()
    }

    #[test]
    fn empty_and_singleton() {
        let mut bvh: Bvh<u32> = Bvh::new();
        assert!(bvh.is_empty());
        assert!(bvh.validate());

        let p = bvh.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 7);
        assert_eq!(bvh.len(), 1);
        assert!(bvh.validate());
        // A single-leaf root yields no candidates.
        assert_eq!(bvh.potentials(p).unwrap(), vec![]);
    }

    #[test]
    fn branch_boxes_stay_tight() {
        let mut bvh: Bvh<usize> = Bvh::new();
        let proxies: Vec<Proxy> = boxes(25)
            .into_iter()
            .enumerate()
            .map(|(i, b)| bvh.insert(b, i))
            .collect();
        assert!(bvh.validate());

        // Remove a few leaves from different parts of the tree, validating
        // that ancestor boxes are re-unioned each time.
        for &i in &[0_usize, 12, 24, 7] {
            bvh.remove(proxies[i]).unwrap();
            assert!(bvh.validate());
        }
        assert_eq!(bvh.len(), 21);
    }

    #[test]
    fn potentials_matches_brute_force() {
        let mut bvh: Bvh<usize> = Bvh::new();
        let items: Vec<(Proxy, Aabb)> = boxes(40)
            .into_iter()
            .enumerate()
            .map(|(i, b)| (bvh.insert(b, i), b))
            .collect();

        for &(p, ref q) in &items {
            let mut got: Vec<Proxy> = bvh
                .potentials(p)
                .unwrap()
                .into_iter()
                .map(|(proxy, _)| proxy)
                .collect();
            let mut expected = brute_force_pairs(&items, q, p);
            got.sort_by_key(|x| x.slot);
            expected.sort_by_key(|x| x.slot);
            // The broad phase must never miss a touching pair.
            for e in &expected {
                assert!(got.contains(e), "missing candidate {e:?} for {p:?}");
            }
            // With these axis-aligned boxes it is exact as well.
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn insert_remove_round_trip_restores_topology() {
        let mut bvh: Bvh<usize> = Bvh::new();
        for (i, b) in boxes(9).into_iter().enumerate() {
            bvh.insert(b, i);
        }
        let root = bvh.root;
        let branches = bvh.branches.clone();
        let pool = bvh.branch_pool.clone();

        let p = bvh.insert(Aabb::from_xywh(100.0, 100.0, 5.0, 5.0), 99);
        bvh.remove(p).unwrap();

        assert_eq!(bvh.root, root);
        assert_eq!(bvh.branch_pool.len(), pool.len() + 1);
        // Surviving branches keep their boxes; the vacated slot is pooled.
        for (i, before) in branches.iter().enumerate() {
            if let Some(b) = before {
                assert_eq!(bvh.branches[i].as_ref().map(|x| x.aabb), Some(b.aabb));
            }
        }
        assert!(bvh.validate());
    }

    #[test]
    fn pool_reuse_over_churn() {
        let mut bvh: Bvh<u32> = Bvh::new();
        let a = bvh.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 0);
        let _b = bvh.insert(Aabb::from_xywh(5.0, 0.0, 1.0, 1.0), 1);
        let arena = bvh.branches.len();

        for i in 0..32 {
            bvh.detach(a).unwrap();
            let x = f64::from(i);
            bvh.attach(a, Aabb::from_xywh(x, 0.0, 1.0, 1.0)).unwrap();
            assert!(bvh.validate());
        }
        // The branch arena never grows under detach/attach churn.
        assert_eq!(bvh.branches.len(), arena);
    }

    #[test]
    fn detach_and_attach_are_idempotent() {
        let mut bvh: Bvh<u32> = Bvh::new();
        let a = bvh.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 0);
        let b = bvh.insert(Aabb::from_xywh(2.0, 0.0, 1.0, 1.0), 1);

        bvh.detach(a).unwrap();
        bvh.detach(a).unwrap(); // no-op
        assert!(bvh.validate());
        assert_eq!(bvh.potentials(b).unwrap(), vec![]);

        let near_b = Aabb::from_xywh(2.5, 0.0, 1.0, 1.0);
        bvh.attach(a, near_b).unwrap();
        bvh.attach(a, Aabb::from_xywh(50.0, 50.0, 1.0, 1.0)).unwrap(); // no-op
        assert_eq!(bvh.aabb(a), Some(near_b));
        assert_eq!(bvh.potentials(b).unwrap().len(), 1);
    }

    #[test]
    fn removing_sole_root_empties_tree() {
        let mut bvh: Bvh<u32> = Bvh::new();
        let a = bvh.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 0);
        bvh.remove(a).unwrap();
        assert!(bvh.is_empty());
        assert!(bvh.root.is_none());
        assert!(bvh.validate());
    }

    #[test]
    fn stale_and_foreign_proxies_are_rejected() {
        let mut bvh: Bvh<u32> = Bvh::new();
        let mut other: Bvh<u32> = Bvh::new();
        let a = bvh.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 0);
        let f = other.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 0);

        assert_eq!(bvh.remove(f), Err(Error::ForeignProxy));
        assert_eq!(bvh.detach(f), Err(Error::ForeignProxy));
        assert_eq!(bvh.potentials(f).unwrap_err(), Error::ForeignProxy);

        bvh.remove(a).unwrap();
        assert_eq!(bvh.remove(a), Err(Error::StaleProxy));
        assert!(!bvh.contains(a));

        // Reusing the slot mints a new generation; the old proxy stays stale.
        let b = bvh.insert(Aabb::from_xywh(0.0, 0.0, 1.0, 1.0), 1);
        assert!(bvh.contains(b));
        assert!(!bvh.contains(a));
    }

    #[test]
    fn payloads_come_back_from_queries() {
        let mut bvh: Bvh<&'static str> = Bvh::new();
        let a = bvh.insert(Aabb::from_xywh(0.0, 0.0, 4.0, 4.0), "a");
        let _b = bvh.insert(Aabb::from_xywh(2.0, 2.0, 4.0, 4.0), "b");
        let _c = bvh.insert(Aabb::from_xywh(100.0, 0.0, 4.0, 4.0), "c");

        let hits: Vec<&str> = bvh
            .potentials(a)
            .unwrap()
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(hits, vec!["b"]);
    }
}
