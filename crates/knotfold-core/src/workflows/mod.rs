//! # Workflows Module
//!
//! High-level drivers over the engine: random pivot sampling with a private
//! PRNG, outcome statistics, and the optional speculative parallel driver.

pub mod sample;
