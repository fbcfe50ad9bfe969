//! # Engine Module
//!
//! The stateful heart of the sampler: the pivot tree over the polygon's
//! vertices, with lazily propagated rigid motions, hierarchical bounding balls,
//! and the pruned collision test that keeps each Monte Carlo step at O(log n)
//! amortized cost.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Sampler parameters and their builder
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Pivot Tree** ([`tree`]) - Node store, lazy propagation, pivot
//!   application with algebraic rollback, and the per-move `fold` lifecycle
//! - **Collision Detection** (`collision`) - The change-pruned hierarchical
//!   overlap test and its moved-range bookkeeping

pub(crate) mod collision;
pub mod config;
pub mod error;
pub mod tree;
