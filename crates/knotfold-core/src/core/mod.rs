//! # Core Module
//!
//! This module provides the stateless mathematical building blocks of the
//! sampler. Nothing in here holds polygon state; everything is plain arithmetic
//! that the stateful [`crate::engine`] layer composes into the pivot tree.
//!
//! ## Architecture
//!
//! - **Tree Geometry** ([`scaffold`]) - Index arithmetic for the fixed-shape
//!   complete binary tree over the polygon's vertices
//! - **Bounding Volumes** ([`ball`]) - Conservative bounding balls and their
//!   O(1) merge and overlap tests
//! - **Rigid Motions** ([`motion`]) - Rotation + translation algebra with
//!   matrix- and quaternion-backed backends selected at compile time

pub mod ball;
pub mod motion;
pub mod scaffold;
