//! Random pivot sampling over a self-avoiding polygon.
//!
//! The sampler owns a [`PivotTree`] and a seeded PRNG, draws uniformly random
//! pivot moves, and keeps a histogram of outcomes. Rejected moves leave the
//! conformation exactly as it was, so the walk stays inside the self-avoiding
//! state space by construction.

use crate::core::motion::{MatrixMotion, RigidMotion};
use crate::engine::config::{InitialPolygon, SamplerConfig};
use crate::engine::error::EngineError;
use crate::engine::tree::{FoldStatus, PivotTree};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::{debug, instrument};

/// Histogram of pivot-move outcomes, indexed by [`FoldStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStatistics {
    counts: [u64; FoldStatus::COUNT],
}

impl FoldStatistics {
    pub fn record(&mut self, status: FoldStatus) {
        self.counts[status.index()] += 1;
    }

    /// Raw counts, indexed by [`FoldStatus::index`].
    pub fn counts(&self) -> [u64; FoldStatus::COUNT] {
        self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn accepted(&self) -> u64 {
        self.counts[FoldStatus::Accepted.index()]
    }

    pub fn invalid_pivots(&self) -> u64 {
        self.counts[FoldStatus::InvalidPivots.index()]
    }

    pub fn first_hinge_collisions(&self) -> u64 {
        self.counts[FoldStatus::FirstHingeCollision.index()]
    }

    pub fn second_hinge_collisions(&self) -> u64 {
        self.counts[FoldStatus::SecondHingeCollision.index()]
    }

    pub fn tree_collisions(&self) -> u64 {
        self.counts[FoldStatus::TreeCollision.index()]
    }
}

/// Monte Carlo driver: a pivot tree plus the randomness that steers it.
///
/// Every candidate move draws the pivot pair uniformly over all valid pairs,
/// the angle uniformly over `[-pi, pi)`, and mirrors the rotation with the
/// configured probability.
#[derive(Debug, Clone)]
pub struct PivotSampler<M: RigidMotion = MatrixMotion> {
    tree: PivotTree<M>,
    rng: StdRng,
    mirror_probability: f64,
}

impl<M: RigidMotion> PivotSampler<M> {
    /// Builds the sampler from a validated configuration.
    ///
    /// Random sampling needs at least 4 vertices; smaller polygons have no
    /// valid pivot pair at all.
    pub fn new(config: SamplerConfig) -> Result<Self, EngineError> {
        let tree = match &config.polygon {
            InitialPolygon::Circle { vertex_count } => {
                PivotTree::new(*vertex_count, config.hard_sphere_diameter)?
            }
            InitialPolygon::Coordinates(coordinates) => {
                PivotTree::from_coordinates(coordinates, config.hard_sphere_diameter)?
            }
        };
        if tree.vertex_count() < 4 {
            return Err(EngineError::PolygonTooSmall(tree.vertex_count()));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        debug!(
            vertex_count = tree.vertex_count(),
            seed = ?config.seed,
            mirror_probability = config.mirror_probability,
            "initialized pivot sampler"
        );
        Ok(Self {
            tree,
            rng,
            mirror_probability: config.mirror_probability,
        })
    }

    /// One uniformly random candidate move: pivots, angle, mirror flag.
    fn draw_candidate(&mut self) -> (usize, usize, f64, bool) {
        let n = self.tree.vertex_count();
        let p = self.rng.gen_range(0..=n - 3);
        // q = n - 1 with p = 0 would leave the complement side empty.
        let upper = if p == 0 { n - 2 } else { n - 1 };
        let q = self.rng.gen_range(p + 2..=upper);
        let angle = self.rng.gen_range(-PI..PI);
        let mirror = self.mirror_probability > 0.0 && self.rng.gen_bool(self.mirror_probability);
        (p, q, angle, mirror)
    }

    /// Applies one deterministic pivot move. See [`PivotTree::fold`].
    pub fn fold(&mut self, p: usize, q: usize, angle: f64) -> FoldStatus {
        self.tree.fold(p, q, angle)
    }

    /// Applies one deterministic mirrored pivot move.
    pub fn fold_mirrored(&mut self, p: usize, q: usize, angle: f64) -> FoldStatus {
        self.tree.fold_mirrored(p, q, angle)
    }

    /// Attempts exactly `attempts` random pivot moves and returns the outcome
    /// histogram. Rejections count as attempts.
    #[instrument(level = "debug", skip(self))]
    pub fn fold_random(&mut self, attempts: u64) -> FoldStatistics {
        let mut statistics = FoldStatistics::default();
        for _ in 0..attempts {
            let (p, q, angle, mirror) = self.draw_candidate();
            statistics.record(self.tree.fold_with(p, q, angle, mirror));
        }
        debug!(
            attempts,
            accepted = statistics.accepted(),
            "random sampling pass finished"
        );
        statistics
    }

    /// Attempts random pivot moves until exactly `accepted_target` of them
    /// have been accepted, and returns the full histogram of everything tried
    /// along the way.
    #[instrument(level = "debug", skip(self))]
    pub fn fold_random_until(&mut self, accepted_target: u64) -> FoldStatistics {
        let mut statistics = FoldStatistics::default();
        while statistics.accepted() < accepted_target {
            let (p, q, angle, mirror) = self.draw_candidate();
            statistics.record(self.tree.fold_with(p, q, angle, mirror));
        }
        statistics
    }

    /// Like [`Self::fold_random`], but evaluates candidates speculatively in
    /// parallel, `batch_size` at a time.
    ///
    /// Each candidate in a batch is checked against a clone of the current
    /// conformation. Verdicts are consumed in draw order up to and including
    /// the first acceptance, which is then replayed on the canonical tree;
    /// the rest of the batch was evaluated against a stale conformation and is
    /// discarded. Rejections carry no state change, so every recorded verdict
    /// is the one a serial driver would have reached for the same candidate.
    #[cfg(feature = "parallel")]
    #[instrument(level = "debug", skip(self))]
    pub fn fold_random_speculative(&mut self, attempts: u64, batch_size: usize) -> FoldStatistics {
        use rayon::prelude::*;

        let batch_size = batch_size.max(1);
        let mut statistics = FoldStatistics::default();
        let mut remaining = attempts;
        while remaining > 0 {
            let take = usize::try_from(remaining).unwrap_or(usize::MAX).min(batch_size);
            let candidates: Vec<(usize, usize, f64, bool)> =
                (0..take).map(|_| self.draw_candidate()).collect();
            let verdicts: Vec<FoldStatus> = candidates
                .par_iter()
                .map(|&(p, q, angle, mirror)| {
                    let mut scratch = self.tree.clone();
                    scratch.fold_with(p, q, angle, mirror)
                })
                .collect();
            for (&(p, q, angle, mirror), &verdict) in candidates.iter().zip(verdicts.iter()) {
                statistics.record(verdict);
                remaining -= 1;
                if verdict == FoldStatus::Accepted {
                    let replayed = self.tree.fold_with(p, q, angle, mirror);
                    debug_assert_eq!(replayed, FoldStatus::Accepted);
                    break;
                }
            }
        }
        statistics
    }

    pub fn vertex_count(&self) -> usize {
        self.tree.vertex_count()
    }

    pub fn hard_sphere_diameter(&self) -> f64 {
        self.tree.hard_sphere_diameter()
    }

    /// See [`PivotTree::vertex_position`].
    pub fn vertex_position(&mut self, vertex: usize) -> Result<Point3<f64>, EngineError> {
        self.tree.vertex_position(vertex)
    }

    /// See [`PivotTree::positions`].
    pub fn positions(&mut self) -> Vec<Point3<f64>> {
        self.tree.positions()
    }

    /// See [`PivotTree::write_vertex_coordinates`].
    pub fn write_vertex_coordinates(&mut self, buffer: &mut [f64]) -> Result<(), EngineError> {
        self.tree.write_vertex_coordinates(buffer)
    }

    /// See [`PivotTree::collision_witness`].
    pub fn collision_witness(&self) -> Option<(usize, usize)> {
        self.tree.collision_witness()
    }

    /// See [`PivotTree::find_collision_brute_force`].
    pub fn find_collision_brute_force(&mut self) -> Option<(usize, usize)> {
        self.tree.find_collision_brute_force()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SamplerConfigBuilder;

    fn circle_sampler(vertex_count: usize, seed: u64) -> PivotSampler {
        let config = SamplerConfigBuilder::new()
            .circle(vertex_count)
            .hard_sphere_diameter(1.0)
            .seed(seed)
            .build()
            .unwrap();
        PivotSampler::new(config).unwrap()
    }

    #[test]
    fn sampling_needs_at_least_four_vertices() {
        let config = SamplerConfigBuilder::new()
            .circle(3)
            .hard_sphere_diameter(1.0)
            .build()
            .unwrap();
        assert_eq!(
            PivotSampler::<MatrixMotion>::new(config).err(),
            Some(EngineError::PolygonTooSmall(3))
        );
    }

    #[test]
    fn random_sampling_accounts_for_every_attempt() {
        let mut sampler = circle_sampler(64, 42);
        let statistics = sampler.fold_random(10_000);
        assert_eq!(statistics.total(), 10_000);
        assert_eq!(statistics.counts().iter().sum::<u64>(), 10_000);
        assert!(statistics.accepted() > 0);
        assert!(statistics.accepted() < 10_000);
        assert!(sampler.find_collision_brute_force().is_none());
    }

    #[test]
    fn random_pivot_draws_are_never_degenerate() {
        let mut sampler = circle_sampler(16, 9);
        let statistics = sampler.fold_random(5_000);
        assert_eq!(statistics.invalid_pivots(), 0);
    }

    #[test]
    fn fold_random_until_hits_the_acceptance_target_exactly() {
        let mut sampler = circle_sampler(32, 7);
        let statistics = sampler.fold_random_until(50);
        assert_eq!(statistics.accepted(), 50);
        assert!(statistics.total() >= 50);
    }

    #[test]
    fn mirrored_moves_keep_the_walk_self_avoiding() {
        let config = SamplerConfigBuilder::new()
            .circle(24)
            .hard_sphere_diameter(1.0)
            .seed(13)
            .mirror_probability(1.0)
            .build()
            .unwrap();
        let mut sampler = PivotSampler::<MatrixMotion>::new(config).unwrap();
        let statistics = sampler.fold_random(2_000);
        assert!(statistics.accepted() > 0);
        assert!(sampler.find_collision_brute_force().is_none());
    }

    #[test]
    fn coordinate_configs_seed_the_walk_from_the_given_conformation() {
        let square = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let config = SamplerConfigBuilder::new()
            .coordinates(square.clone())
            .hard_sphere_diameter(1.0)
            .seed(1)
            .build()
            .unwrap();
        let mut sampler = PivotSampler::<MatrixMotion>::new(config).unwrap();
        assert_eq!(sampler.positions(), square);
        sampler.fold_random(500);
        assert!(sampler.find_collision_brute_force().is_none());
    }

    #[test]
    fn identical_seeds_reproduce_identical_trajectories() {
        let mut first = circle_sampler(40, 123);
        let mut second = circle_sampler(40, 123);
        let a = first.fold_random(1_000);
        let b = second.fold_random(1_000);
        assert_eq!(a, b);
        assert_eq!(first.positions(), second.positions());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn speculative_driver_accounts_for_every_attempt_and_stays_valid() {
        let mut sampler = circle_sampler(48, 99);
        let statistics = sampler.fold_random_speculative(4_000, 8);
        assert_eq!(statistics.total(), 4_000);
        assert!(statistics.accepted() > 0);
        assert!(sampler.find_collision_brute_force().is_none());
    }
}
