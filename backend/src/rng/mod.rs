//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: All randomness in the simulator MUST go through this module.
//!
//! Generators are never stored in the population table. They are derived on
//! demand from `(experiment seed, key)` by [`RandomStreamAllocator`].

mod streams;
mod xorshift;

pub use streams::{splitmix64, PopulationStream, RandomStreamAllocator, StreamKey};
pub use xorshift::RngManager;
