//! Pruned pairwise overlap detection after a pivot move.
//!
//! Only pairs with one moved and one unmoved vertex can newly collide: the
//! moved arc travels rigidly and the rest of the polygon does not move at all,
//! so intra-side distances are preserved. The detector therefore walks pairs
//! of tree nodes and discards every pair that is not "mixed" in this sense, or
//! whose bounding balls stay farther apart than the hard-sphere diameter.

use super::tree::PivotTree;
use crate::core::motion::RigidMotion;
use tracing::error;

/// O(1) classification of vertex ranges against the side moved by a pivot.
///
/// The pivots `p < q` stay fixed; the moved side is either the open arc
/// `(p, q)` or its complement across the chain seam.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChangedRange {
    p: usize,
    q: usize,
    n: usize,
    mid_moved: bool,
}

impl ChangedRange {
    pub(crate) fn new(p: usize, q: usize, mid_moved: bool, n: usize) -> Self {
        debug_assert!(p + 1 < q && q < n);
        Self { p, q, n, mid_moved }
    }

    /// Did vertex `vertex` move? The pivots sit on the rotation axis and
    /// never move, whichever side rotates.
    pub(crate) fn vertex_moved(&self, vertex: usize) -> bool {
        debug_assert!(vertex < self.n);
        if vertex == self.p || vertex == self.q {
            return false;
        }
        (self.p < vertex && vertex < self.q) == self.mid_moved
    }

    /// Does `[begin, end)` contain at least one moved vertex?
    pub(crate) fn contains_moved(&self, begin: usize, end: usize) -> bool {
        if begin >= end {
            return false;
        }
        if self.mid_moved {
            begin < self.q && end > self.p + 1
        } else {
            begin < self.p || end > self.q + 1
        }
    }

    /// Does `[begin, end)` contain at least one unmoved vertex? The pivots
    /// count as unmoved.
    pub(crate) fn contains_unmoved(&self, begin: usize, end: usize) -> bool {
        if begin >= end {
            return false;
        }
        if self.mid_moved {
            begin <= self.p || end > self.q
        } else {
            begin <= self.q && end > self.p
        }
    }
}

impl<M: RigidMotion> PivotTree<M> {
    /// Searches for a hard-sphere violation created by the move described by
    /// `changed`. Returns the first violating vertex pair found, smaller index
    /// first, or `None` when the new conformation is self-avoiding.
    ///
    /// Expanding a node pair pushes both nodes' pending motions first, so
    /// every ball the walk compares already sits in the global frame.
    pub(crate) fn detect_overlap(&mut self, changed: &ChangedRange) -> Option<(usize, usize)> {
        let n = self.vertex_count();
        let diameter = self.hard_sphere_diameter;
        let capacity = self.work_stack_capacity();
        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(capacity);
        let mut overflow_logged = false;

        let root = self.scaffold.root();
        stack.push((root, root));
        while let Some((a, b)) = stack.pop() {
            let (a_begin, a_end) = self.scaffold.node_range(a);
            let (b_begin, b_end) = self.scaffold.node_range(b);

            let mixed = (changed.contains_moved(a_begin, a_end)
                && changed.contains_unmoved(b_begin, b_end))
                || (changed.contains_moved(b_begin, b_end)
                    && changed.contains_unmoved(a_begin, a_end));
            if !mixed {
                continue;
            }
            if !self.nodes[a].ball.overlaps(&self.nodes[b].ball, diameter) {
                continue;
            }

            match (self.scaffold.is_leaf(a), self.scaffold.is_leaf(b)) {
                (true, true) => {
                    let u = self.scaffold.leaf_index(a);
                    let v = self.scaffold.leaf_index(b);
                    // The mixed-pair pruning guarantees a surviving leaf pair
                    // straddles the move.
                    debug_assert!(changed.vertex_moved(u) != changed.vertex_moved(v));
                    // Chain neighbors touch by construction; only pairs at
                    // circular distance two or more are violations.
                    let separation = u.abs_diff(v);
                    if separation.min(n - separation) <= 1 {
                        continue;
                    }
                    return Some((u.min(v), u.max(v)));
                }
                (false, true) => {
                    self.push_transform(a);
                    let (left, right) = self.scaffold.children(a);
                    stack.push((left, b));
                    stack.push((right, b));
                }
                (true, false) => {
                    self.push_transform(b);
                    let (left, right) = self.scaffold.children(b);
                    stack.push((a, left));
                    stack.push((a, right));
                }
                (false, false) if a == b => {
                    self.push_transform(a);
                    let (left, right) = self.scaffold.children(a);
                    stack.push((left, left));
                    stack.push((left, right));
                    stack.push((right, right));
                }
                (false, false) => {
                    self.push_transform(a);
                    self.push_transform(b);
                    let (a_left, a_right) = self.scaffold.children(a);
                    let (b_left, b_right) = self.scaffold.children(b);
                    stack.push((a_left, b_left));
                    stack.push((a_left, b_right));
                    stack.push((a_right, b_left));
                    stack.push((a_right, b_right));
                }
            }

            if stack.len() > capacity && !overflow_logged {
                error!(
                    capacity,
                    vertex_count = n,
                    "overlap traversal stack exceeded its provisioned bound"
                );
                overflow_logged = true;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motion::MatrixMotion;
    use crate::core::scaffold::TreeScaffold;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn naive_contains(changed: &ChangedRange, begin: usize, end: usize, moved: bool) -> bool {
        (begin..end).any(|vertex| changed.vertex_moved(vertex) == moved)
    }

    #[test]
    fn range_flags_agree_with_a_vertex_by_vertex_scan() {
        for n in [5usize, 8, 13, 32] {
            let scaffold = TreeScaffold::new(n);
            for p in 0..n - 2 {
                for q in (p + 2)..n {
                    if p == 0 && q == n - 1 {
                        continue;
                    }
                    for mid_moved in [false, true] {
                        let changed = ChangedRange::new(p, q, mid_moved, n);
                        for id in 1..scaffold.node_count() {
                            let (begin, end) = scaffold.node_range(id);
                            assert_eq!(
                                changed.contains_moved(begin, end),
                                naive_contains(&changed, begin, end, true),
                                "moved flag for node [{begin}, {end}) with p={p} q={q} mid={mid_moved} n={n}"
                            );
                            assert_eq!(
                                changed.contains_unmoved(begin, end),
                                naive_contains(&changed, begin, end, false),
                                "unmoved flag for node [{begin}, {end}) with p={p} q={q} mid={mid_moved} n={n}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn pruned_detector_agrees_with_brute_force_on_random_moves() {
        // Starting from a self-avoiding conformation, a single rigid pivot
        // move can only create collisions between the moved and unmoved
        // sides, so the pruned detector and the full pairwise scan must agree
        // on whether the moved conformation is valid.
        let n = 24;
        let mut rng = StdRng::seed_from_u64(61);
        let mut canonical = PivotTree::<MatrixMotion>::new(n, 1.0).unwrap();
        for _ in 0..400 {
            let p = rng.gen_range(0..=n - 3);
            let upper = if p == 0 { n - 2 } else { n - 1 };
            let q = rng.gen_range(p + 2..=upper);
            let angle = rng.gen_range(-PI..PI);

            let mut probe = canonical.clone();
            assert!(probe.update(p, q, angle, false));
            let interior = q - p - 1;
            let mid_moved = interior <= n - interior - 2;
            let changed = ChangedRange::new(p, q, mid_moved, n);

            let pruned = probe.detect_overlap(&changed);
            let brute = probe.find_collision_brute_force();
            assert_eq!(pruned.is_some(), brute.is_some(), "p={p} q={q} angle={angle}");
            if let Some((u, v)) = pruned {
                let separation = v - u;
                assert!(separation.min(n - separation) > 1);
                let positions = probe.positions();
                assert!((positions[u] - positions[v]).norm() < 1.0);
            }

            // Keep the canonical walk inside the self-avoiding state space.
            canonical.fold(p, q, angle);
        }
    }

    #[test]
    fn pivots_always_count_as_unmoved() {
        let changed = ChangedRange::new(2, 6, true, 10);
        assert!(!changed.vertex_moved(2));
        assert!(!changed.vertex_moved(6));
        assert!(changed.vertex_moved(3));
        assert!(!changed.vertex_moved(8));

        let complement = ChangedRange::new(2, 6, false, 10);
        assert!(!complement.vertex_moved(2));
        assert!(!complement.vertex_moved(6));
        assert!(!complement.vertex_moved(3));
        assert!(complement.vertex_moved(8));
    }
}
