use super::collision::ChangedRange;
use super::error::EngineError;
use crate::core::ball::Ball;
use crate::core::motion::{MatrixMotion, RigidMotion};
use crate::core::scaffold::TreeScaffold;
use nalgebra::{Point3, Unit};
use std::f64::consts::PI;
use tracing::{debug, error, instrument, trace};

/// Outcome of one pivot move.
///
/// The discriminants index the outcome histogram accumulated by the random
/// drivers, so their values are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldStatus {
    /// The move passed every check and the tree now holds the new conformation.
    Accepted = 0,
    /// The pivot pair bounds no rotatable arc; nothing was touched.
    InvalidPivots = 1,
    /// Hard-sphere violation at the hinge around the first pivot; nothing was touched.
    FirstHingeCollision = 2,
    /// Hard-sphere violation at the hinge around the second pivot; nothing was touched.
    SecondHingeCollision = 3,
    /// The global overlap test found a collision; the move was rolled back.
    TreeCollision = 4,
}

impl FoldStatus {
    /// Number of distinct outcomes.
    pub const COUNT: usize = 5;

    /// Histogram bucket of this outcome.
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node<M> {
    /// Bounds every vertex of the node's range once all ancestor pending
    /// motions are composed in. For leaves the center is the vertex position
    /// and the radius is zero.
    pub(crate) ball: Ball,
    /// Motion not yet applied to the node's children; `None` means identity.
    /// Always `None` at leaves.
    pub(crate) pending: Option<M>,
}

/// A balanced tree over the vertices of a self-avoiding closed polygon.
///
/// Each Monte Carlo step rotates the shorter arc between two pivot vertices
/// about the chord through them, then re-validates the polygon against the
/// hard-sphere constraint. The tree keeps that step at O(log n) amortized: the
/// rotation is recorded lazily on O(log n) subtree roots, and the overlap test
/// prunes every node pair that cannot contain one moved and one unmoved
/// vertex.
///
/// The motion representation `M` is a compile-time choice; see
/// [`crate::core::motion`].
#[derive(Debug, Clone)]
pub struct PivotTree<M: RigidMotion = MatrixMotion> {
    pub(crate) scaffold: TreeScaffold,
    pub(crate) nodes: Vec<Node<M>>,
    pub(crate) hard_sphere_diameter: f64,
    last_witness: Option<(usize, usize)>,
}

impl<M: RigidMotion> PivotTree<M> {
    /// Builds a tree over a regular polygon of `vertex_count` vertices with
    /// edge length 1, lying in the z = 0 plane.
    pub fn new(vertex_count: usize, hard_sphere_diameter: f64) -> Result<Self, EngineError> {
        if vertex_count < 3 {
            return Err(EngineError::TooFewVertices(vertex_count));
        }
        let circumradius = 0.5 / (PI / vertex_count as f64).sin();
        let positions: Vec<_> = (0..vertex_count)
            .map(|v| {
                let theta = 2.0 * PI * v as f64 / vertex_count as f64;
                Point3::new(circumradius * theta.cos(), circumradius * theta.sin(), 0.0)
            })
            .collect();
        Self::build(&positions, hard_sphere_diameter)
    }

    /// Builds a tree over explicitly supplied vertex coordinates, in chain
    /// order. The configuration is trusted to be self-avoiding.
    pub fn from_coordinates(
        coordinates: &[Point3<f64>],
        hard_sphere_diameter: f64,
    ) -> Result<Self, EngineError> {
        if coordinates.len() < 3 {
            return Err(EngineError::TooFewVertices(coordinates.len()));
        }
        Self::build(coordinates, hard_sphere_diameter)
    }

    fn build(positions: &[Point3<f64>], hard_sphere_diameter: f64) -> Result<Self, EngineError> {
        if !hard_sphere_diameter.is_finite() || hard_sphere_diameter <= 0.0 {
            return Err(EngineError::InvalidDiameter(hard_sphere_diameter));
        }
        let scaffold = TreeScaffold::new(positions.len());
        let mut tree = Self {
            scaffold,
            nodes: vec![
                Node {
                    ball: Ball::point(Point3::origin()),
                    pending: None,
                };
                scaffold.node_count()
            ],
            hard_sphere_diameter,
            last_witness: None,
        };
        for (vertex, position) in positions.iter().enumerate() {
            tree.nodes[scaffold.leaf_id(vertex)].ball = Ball::point(*position);
        }
        for id in (1..scaffold.node_count() / 2).rev() {
            tree.compute_ball(id);
        }
        debug!(
            vertex_count = positions.len(),
            hard_sphere_diameter, "built pivot tree"
        );
        Ok(tree)
    }

    /// Number of polygon vertices.
    pub fn vertex_count(&self) -> usize {
        self.scaffold.leaf_count()
    }

    /// The hard-sphere collision threshold for non-adjacent vertices.
    pub fn hard_sphere_diameter(&self) -> f64 {
        self.hard_sphere_diameter
    }

    /// Witness pair of the most recent move rejected by the global overlap
    /// test. Diagnostics only.
    pub fn collision_witness(&self) -> Option<(usize, usize)> {
        self.last_witness
    }

    // ---- Lazy propagation ----------------------------------------------

    /// Applies `motion` to one node in O(1): the ball center moves now, and
    /// for interior nodes the motion is composed into the pending slot so the
    /// children inherit it later. Never recurses.
    fn update_node(&mut self, motion: &M, id: usize) {
        let node = &mut self.nodes[id];
        node.ball.center = motion.apply_point(&node.ball.center);
        if self.scaffold.is_interior(id) {
            node.pending = Some(match node.pending.take() {
                Some(pending) => motion.compose(&pending),
                None => motion.clone(),
            });
        }
    }

    /// Hands a node's pending motion down one level. This is the only
    /// mechanism by which a pending motion descends; it never changes any
    /// vertex's true global position.
    pub(crate) fn push_transform(&mut self, id: usize) {
        debug_assert!(self.scaffold.is_interior(id));
        if let Some(motion) = self.nodes[id].pending.take() {
            let (left, right) = self.scaffold.children(id);
            self.update_node(&motion, left);
            self.update_node(&motion, right);
        }
    }

    /// Full top-down flush; afterwards every leaf ball center is the vertex's
    /// true global position. O(n), used before bulk export.
    pub fn push_all_transforms(&mut self) {
        for id in 1..self.scaffold.node_count() / 2 {
            self.push_transform(id);
        }
    }

    /// Flushes only the root-to-leaf path above `vertex`. O(log n).
    fn pull_transforms(&mut self, vertex: usize) {
        let leaf = self.scaffold.leaf_id(vertex);
        for shift in (1..=self.scaffold.max_depth()).rev() {
            self.push_transform(leaf >> shift);
        }
    }

    /// True global position of one vertex, via a single-path flush.
    fn position(&mut self, vertex: usize) -> Point3<f64> {
        self.pull_transforms(vertex);
        self.nodes[self.scaffold.leaf_id(vertex)].ball.center
    }

    /// True global position of one vertex. O(log n); does not flush the whole
    /// tree.
    pub fn vertex_position(&mut self, vertex: usize) -> Result<Point3<f64>, EngineError> {
        if vertex >= self.vertex_count() {
            return Err(EngineError::VertexOutOfRange {
                index: vertex,
                len: self.vertex_count(),
            });
        }
        Ok(self.position(vertex))
    }

    // ---- Bounding-ball maintenance --------------------------------------

    /// Recomputes an interior node's ball from its children. The node's
    /// pending slot must be identity, so that parent and children balls live
    /// in the same frame.
    fn compute_ball(&mut self, id: usize) {
        debug_assert!(self.scaffold.is_interior(id));
        debug_assert!(self.nodes[id].pending.is_none());
        let (left, right) = self.scaffold.children(id);
        let (right_begin, right_end) = self.scaffold.node_range(right);
        self.nodes[id].ball = if right_begin >= right_end {
            self.nodes[left].ball
        } else {
            self.nodes[left].ball.merge(&self.nodes[right].ball)
        };
    }

    /// Provisioned bound for the explicit traversal stacks. Exceeding it is a
    /// configuration error (tree far larger than provisioned) and is logged
    /// loudly; the stacks still grow rather than truncate.
    pub(crate) fn work_stack_capacity(&self) -> usize {
        4 * self.scaffold.max_depth().max(1) as usize
    }

    // ---- Pivot application ----------------------------------------------

    /// Validates the pivot pair and builds the pivot motion plus the choice of
    /// which side to rotate. Returns `None` for degenerate pivots.
    fn pivot_motion(&mut self, p: usize, q: usize, angle: f64, mirror: bool) -> Option<(M, bool)> {
        let n = self.vertex_count();
        // Either open arc between the pivots must be non-empty.
        if q >= n || q <= p + 1 || (p == 0 && q == n - 1) {
            return None;
        }
        let anchor = self.position(p);
        let chord = self.position(q) - anchor;
        if chord.norm_squared() < f64::EPSILON {
            return None;
        }
        let axis = Unit::new_normalize(chord);
        let interior = q - p - 1;
        // Rotate whichever side holds fewer vertices; the pivots themselves
        // sit on the rotation axis and belong to neither side.
        let mid_moved = interior <= n - interior - 2;
        Some((M::pivot(&anchor, &axis, angle, mirror), mid_moved))
    }

    /// Applies `motion` to the moved side of the `[p, q]` split: the open arc
    /// `(p, q)`, or its complement across the seam.
    fn apply_motion(&mut self, motion: &M, p: usize, q: usize, mid_moved: bool) {
        let n = self.vertex_count();
        if mid_moved {
            self.apply_to_range(motion, p + 1, q);
        } else {
            if p > 0 {
                self.apply_to_range(motion, 0, p);
            }
            if q + 1 < n {
                self.apply_to_range(motion, q + 1, n);
            }
        }
    }

    /// Applies `motion` lazily to every vertex in `[lo, hi)` by descending
    /// only into nodes whose range straddles a boundary of the interval, then
    /// repairs the balls of exactly those nodes bottom-up. O(log n).
    fn apply_to_range(&mut self, motion: &M, lo: usize, hi: usize) {
        debug_assert!(lo < hi && hi <= self.vertex_count());
        let capacity = self.work_stack_capacity();
        let mut stack: Vec<usize> = Vec::with_capacity(capacity);
        let mut splits: Vec<usize> = Vec::with_capacity(capacity);
        let mut overflow_logged = false;

        stack.push(self.scaffold.root());
        while let Some(id) = stack.pop() {
            let (begin, end) = self.scaffold.node_range(id);
            if begin >= end || end <= lo || begin >= hi {
                continue;
            }
            if lo <= begin && end <= hi {
                self.update_node(motion, id);
                continue;
            }
            // Straddles a boundary: materialize the pending motion one level
            // down and keep descending.
            self.push_transform(id);
            splits.push(id);
            let (left, right) = self.scaffold.children(id);
            stack.push(left);
            stack.push(right);
            if stack.len() > capacity && !overflow_logged {
                error!(
                    capacity,
                    vertex_count = self.vertex_count(),
                    "pivot traversal stack exceeded its provisioned bound"
                );
                overflow_logged = true;
            }
        }

        // Children of every split node were recorded after it, so the reverse
        // order repairs balls bottom-up.
        for &id in splits.iter().rev() {
            self.compute_ball(id);
        }
    }

    /// Applies the pivot rotation without any collision checking. Returns
    /// false when the pivot pair is degenerate. Replaying with the negated
    /// angle undoes an un-mirrored update.
    ///
    /// The resulting conformation may self-intersect; callers that need the
    /// hard-sphere guarantee use [`Self::fold`] instead.
    pub fn update(&mut self, p: usize, q: usize, angle: f64, mirror: bool) -> bool {
        match self.pivot_motion(p, q, angle, mirror) {
            Some((motion, mid_moved)) => {
                self.apply_motion(&motion, p, q, mid_moved);
                true
            }
            None => false,
        }
    }

    // ---- Per-move lifecycle ----------------------------------------------

    /// One Monte Carlo step: rotate the shorter arc between pivots `p < q` by
    /// `angle` radians about the chord through them, test the polygon for
    /// hard-sphere self-intersection, and accept or roll back.
    pub fn fold(&mut self, p: usize, q: usize, angle: f64) -> FoldStatus {
        self.fold_with(p, q, angle, false)
    }

    /// Like [`Self::fold`], with the rotation additionally mirrored across a
    /// plane containing the chord. Extends the move set.
    pub fn fold_mirrored(&mut self, p: usize, q: usize, angle: f64) -> FoldStatus {
        self.fold_with(p, q, angle, true)
    }

    #[instrument(level = "trace", skip(self))]
    pub(crate) fn fold_with(&mut self, p: usize, q: usize, angle: f64, mirror: bool) -> FoldStatus {
        let (motion, mid_moved) = match self.pivot_motion(p, q, angle, mirror) {
            Some(prepared) => prepared,
            None => return FoldStatus::InvalidPivots,
        };

        // Cheap local rejection before the tree is touched.
        if let Some(status) = self.hinge_collision(&motion, p, q, mid_moved) {
            trace!(?status, "pivot move rejected at a hinge");
            return status;
        }

        self.apply_motion(&motion, p, q, mid_moved);

        let changed = ChangedRange::new(p, q, mid_moved, self.vertex_count());
        if let Some(witness) = self.detect_overlap(&changed) {
            trace!(?witness, "pivot move rejected by the global overlap test");
            self.last_witness = Some(witness);
            // Algebraic rollback: replay the inverse motion over the same side.
            self.apply_motion(&motion.inverse(), p, q, mid_moved);
            return FoldStatus::TreeCollision;
        }

        FoldStatus::Accepted
    }

    /// O(1) pre-check of the two hinges: at each pivot boundary the nearest
    /// moved/unmoved vertex pair (circular distance two apart) must not come
    /// closer than the hard-sphere diameter under the candidate motion.
    /// Runs against current positions plus the not-yet-applied motion, so a
    /// failure leaves the tree untouched.
    fn hinge_collision(&mut self, motion: &M, p: usize, q: usize, mid_moved: bool) -> Option<FoldStatus> {
        let n = self.vertex_count();
        let before_p = self.position((p + n - 1) % n);
        let after_p = self.position(p + 1);
        let before_q = self.position(q - 1);
        let after_q = self.position((q + 1) % n);

        let (first_gap, second_gap) = if mid_moved {
            (
                (motion.apply_point(&after_p) - before_p).norm(),
                (motion.apply_point(&before_q) - after_q).norm(),
            )
        } else {
            (
                (motion.apply_point(&before_p) - after_p).norm(),
                (motion.apply_point(&after_q) - before_q).norm(),
            )
        };

        if first_gap < self.hard_sphere_diameter {
            return Some(FoldStatus::FirstHingeCollision);
        }
        if second_gap < self.hard_sphere_diameter {
            return Some(FoldStatus::SecondHingeCollision);
        }
        None
    }

    // ---- Read-out ---------------------------------------------------------

    /// Writes all vertex coordinates, vertex-major (x, y, z per vertex), after
    /// flushing every pending motion. The buffer must hold exactly
    /// `3 * vertex_count` values.
    pub fn write_vertex_coordinates(&mut self, buffer: &mut [f64]) -> Result<(), EngineError> {
        let n = self.vertex_count();
        if buffer.len() != 3 * n {
            return Err(EngineError::BufferSize {
                expected: 3 * n,
                actual: buffer.len(),
            });
        }
        self.push_all_transforms();
        for vertex in 0..n {
            let center = self.nodes[self.scaffold.leaf_id(vertex)].ball.center;
            buffer[3 * vertex] = center.x;
            buffer[3 * vertex + 1] = center.y;
            buffer[3 * vertex + 2] = center.z;
        }
        Ok(())
    }

    /// All vertex positions in chain order, after a full flush.
    pub fn positions(&mut self) -> Vec<Point3<f64>> {
        self.push_all_transforms();
        (0..self.vertex_count())
            .map(|vertex| self.nodes[self.scaffold.leaf_id(vertex)].ball.center)
            .collect()
    }

    // ---- Diagnostics (never on the hot path) ------------------------------

    /// Independent O(n²) hard-sphere check over flushed coordinates, with the
    /// first violating pair as witness. For validation only.
    pub fn find_collision_brute_force(&mut self) -> Option<(usize, usize)> {
        let positions = self.positions();
        let n = positions.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let separation = j - i;
                if separation.min(n - separation) <= 1 {
                    continue;
                }
                if (positions[i] - positions[j]).norm() < self.hard_sphere_diameter {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Boolean form of [`Self::find_collision_brute_force`].
    pub fn has_collision_brute_force(&mut self) -> bool {
        self.find_collision_brute_force().is_some()
    }
}
