//! xorshift64* random number generator
//!
//! This is a fast, high-quality PRNG that is deterministic and suitable
//! for simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers. This is CRITICAL for:
//! - Debugging (reproduce exact simulation)
//! - Testing (verify behavior)
//! - Research (validate projections)

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use aud_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let u = rng.next_f64(); // [0.0, 1.0)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// # Example
    /// ```
    /// use aud_simulator_core_rs::RngManager;
    ///
    /// let rng = RngManager::new(12345);
    /// assert_eq!(rng.get_state(), 12345);
    /// ```
    pub fn new(seed: u64) -> Self {
        // Ensure seed is never zero (xorshift requirement)
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    ///
    /// This advances the internal state and returns a random value.
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Get current RNG state (for replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    ///
    /// # Example
    /// ```
    /// use aud_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let probability = rng.next_f64();
    /// assert!(probability >= 0.0 && probability < 1.0);
    /// ```
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // Convert to [0.0, 1.0) by dividing by 2^53
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Bernoulli trial: true with probability `p`
    ///
    /// Consumes exactly one draw. `p <= 0` is never true, `p >= 1` always is.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index from cumulative weights
    ///
    /// `cumulative` must be non-decreasing with a positive last element.
    /// Returns the first index whose cumulative weight exceeds the draw.
    /// Indices with zero weight (equal to their predecessor) are never chosen.
    /// Consumes exactly one draw.
    ///
    /// # Example
    /// ```
    /// use aud_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// // Index 1 has zero weight
    /// let idx = rng.choose_cumulative(&[0.5, 0.5, 1.0]);
    /// assert!(idx == 0 || idx == 2);
    /// ```
    pub fn choose_cumulative(&mut self, cumulative: &[f64]) -> usize {
        let total = cumulative.last().copied().unwrap_or(0.0);
        assert!(total > 0.0, "cumulative weights must have positive total");

        let target = self.next_f64() * total;
        let mut previous = 0.0;
        let mut last_positive = 0;
        for (idx, &cum) in cumulative.iter().enumerate() {
            if cum > previous {
                if target < cum {
                    return idx;
                }
                last_positive = idx;
            }
            previous = cum;
        }

        // Float rounding left the draw past the final boundary
        last_positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(
                (0.0..1.0).contains(&val),
                "next_f64() produced value {} outside [0.0, 1.0)",
                val
            );
        }
    }

    #[test]
    fn test_bernoulli_extremes() {
        let mut rng = RngManager::new(99);
        for _ in 0..100 {
            assert!(!rng.bernoulli(0.0));
            assert!(rng.bernoulli(1.0));
        }
    }

    #[test]
    fn test_choose_cumulative_skips_zero_weights() {
        let mut rng = RngManager::new(2024);
        for _ in 0..1000 {
            let idx = rng.choose_cumulative(&[0.0, 0.3, 0.3, 1.0]);
            assert!(idx == 1 || idx == 3, "zero-weight index {} chosen", idx);
        }
    }

    #[test]
    #[should_panic(expected = "positive total")]
    fn test_choose_cumulative_rejects_empty_weights() {
        let mut rng = RngManager::new(1);
        rng.choose_cumulative(&[0.0, 0.0]);
    }
}
