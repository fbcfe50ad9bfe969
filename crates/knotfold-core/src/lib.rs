//! # Knotfold Core Library
//!
//! A Monte Carlo sampler for self-avoiding closed polygons in 3-space, used to
//! generate random polymer and knot conformations. Each sampling step rotates a
//! contiguous sub-arc of the polygon about the chord through two pivot vertices
//! and re-validates the whole polygon against a hard-sphere self-intersection
//! constraint. A balanced tree over the vertices, with lazily propagated rigid
//! motions and hierarchical bounding balls, makes each step run in O(log n)
//! amortized time instead of O(n).
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless mathematics: the complete
//!   binary tree index arithmetic (`scaffold`), conservative bounding balls
//!   (`ball`), and the rigid-motion algebra (`motion`) with matrix- and
//!   quaternion-backed implementations behind one trait.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer owns the pivot tree:
//!   the flat node store, the lazy transform propagation machinery, the O(log n)
//!   pivot application with algebraic rollback, and the pruned hierarchical
//!   collision test.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer. It
//!   drives complete sampling runs: random pivot selection from an explicit,
//!   seedable PRNG, outcome bookkeeping, and the optional speculative parallel
//!   driver.

pub mod core;
pub mod engine;
pub mod workflows;
