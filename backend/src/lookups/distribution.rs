//! Normalized categorical distributions
//!
//! Categories are held in ascending key order, which fixes the tie-break rule
//! for sampling: one uniform draw selects the first category whose cumulative
//! probability exceeds it. Zero-probability categories are never selected.

use crate::core::error::SimulationError;
use crate::models::person::CategoryCode;
use crate::rng::{splitmix64, RngManager};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Tolerance for input proportions that are expected to sum to one
pub const PROPORTION_TOLERANCE: f64 = 1e-6;

/// Categorical distribution over keys `K`, normalized to sum to one
///
/// # Example
/// ```
/// use aud_simulator_core_rs::lookups::Distribution;
/// use aud_simulator_core_rs::models::Race;
///
/// let dist = Distribution::from_weights(
///     "race",
///     vec![(Race::White, 3.0), (Race::Black, 1.0)],
/// )
/// .unwrap();
/// assert_eq!(dist.probability(&Race::White), 0.75);
/// assert_eq!(dist.probability(&Race::Other), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<K> {
    entries: Vec<(K, f64)>,
    cumulative: Vec<f64>,
}

impl<K: Ord + Copy + Debug> Distribution<K> {
    /// Normalize non-negative weights
    ///
    /// Weights for repeated keys are summed first. Fails with
    /// `InvalidDistribution` on a negative or non-finite weight, or when the
    /// total is zero.
    pub fn from_weights(
        table: &str,
        weights: impl IntoIterator<Item = (K, f64)>,
    ) -> Result<Self, SimulationError> {
        let mut summed: BTreeMap<K, f64> = BTreeMap::new();
        for (key, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(SimulationError::invalid_distribution(
                    table,
                    format!("weight {} for {:?} is not a non-negative number", weight, key),
                ));
            }
            *summed.entry(key).or_insert(0.0) += weight;
        }

        let total: f64 = summed.values().sum();
        if total <= 0.0 {
            return Err(SimulationError::invalid_distribution(
                table,
                "weights sum to zero",
            ));
        }

        let entries: Vec<(K, f64)> = summed.into_iter().map(|(k, w)| (k, w / total)).collect();
        Ok(Self::from_normalized(entries))
    }

    /// Validate proportions that must already sum to one
    ///
    /// Each value must lie in [0,1] and the total must be within `tolerance`
    /// of one. The result is renormalized exactly.
    pub fn from_proportions(
        table: &str,
        proportions: impl IntoIterator<Item = (K, f64)>,
        tolerance: f64,
    ) -> Result<Self, SimulationError> {
        let proportions: Vec<(K, f64)> = proportions.into_iter().collect();
        for (key, p) in &proportions {
            if !(0.0..=1.0).contains(p) {
                return Err(SimulationError::invalid_distribution(
                    table,
                    format!("proportion {} for {:?} outside [0,1]", p, key),
                ));
            }
        }

        let total: f64 = proportions.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > tolerance {
            return Err(SimulationError::invalid_distribution(
                table,
                format!("proportions sum to {}, expected 1", total),
            ));
        }

        Self::from_weights(table, proportions)
    }

    /// Distribution with all mass on one key
    pub fn certain(key: K) -> Self {
        Self::from_normalized(vec![(key, 1.0)])
    }

    fn from_normalized(entries: Vec<(K, f64)>) -> Self {
        let mut running = 0.0;
        let cumulative = entries
            .iter()
            .map(|(_, p)| {
                running += p;
                running
            })
            .collect();
        Self {
            entries,
            cumulative,
        }
    }

    /// Probability of `key`, zero when absent
    pub fn probability(&self, key: &K) -> f64 {
        self.entries
            .binary_search_by(|(k, _)| k.cmp(key))
            .map(|i| self.entries[i].1)
            .unwrap_or(0.0)
    }

    /// `(key, probability)` pairs in ascending key order
    pub fn entries(&self) -> &[(K, f64)] {
        &self.entries
    }

    /// Keys with positive probability
    pub fn support(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().filter(|(_, p)| *p > 0.0).map(|(k, _)| *k)
    }

    /// Draw one key (consumes exactly one draw)
    pub fn sample(&self, rng: &mut RngManager) -> K {
        self.entries[rng.choose_cumulative(&self.cumulative)].0
    }

    /// Draw `n` keys in sequence from the same generator
    pub fn sample_many(&self, rng: &mut RngManager, n: usize) -> Vec<K> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl<K: Ord + Copy + Debug + CategoryCode> Distribution<K> {
    /// Exact identity of this distribution's outgoing probabilities
    pub fn signature(&self) -> DistributionSignature<K> {
        DistributionSignature {
            entries: self.entries.iter().map(|(k, p)| (*k, p.to_bits())).collect(),
        }
    }
}

/// Sorted `(key, probability bits)` list identifying a distribution exactly
///
/// Two distributions share a signature only if every probability is bitwise
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistributionSignature<K> {
    entries: Vec<(K, u64)>,
}

impl<K: CategoryCode> DistributionSignature<K> {
    /// Stable 64-bit fingerprint, used as a random stream key
    pub fn fingerprint(&self) -> u64 {
        self.entries.iter().fold(0x5349_474E, |acc, (key, bits)| {
            splitmix64(splitmix64(acc ^ key.code()) ^ bits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::person::DrinkingStage;

    #[test]
    fn test_duplicate_keys_are_summed() {
        let dist = Distribution::from_weights(
            "t",
            vec![(1u32, 1.0), (2u32, 1.0), (1u32, 2.0)],
        )
        .unwrap();
        assert_eq!(dist.probability(&1), 0.75);
        assert_eq!(dist.probability(&2), 0.25);
    }

    #[test]
    fn test_rejects_negative_and_zero_total() {
        assert!(Distribution::from_weights("t", vec![(1u32, -0.1)]).is_err());
        assert!(Distribution::from_weights("t", vec![(1u32, 0.0)]).is_err());
        assert!(Distribution::<u32>::from_weights("t", vec![]).is_err());
    }

    #[test]
    fn test_proportions_checked_against_tolerance() {
        let ok = Distribution::from_proportions("t", vec![(1u32, 0.5), (2u32, 0.5000001)], 1e-6);
        assert!(ok.is_ok());
        let bad = Distribution::from_proportions("t", vec![(1u32, 0.5), (2u32, 0.6)], 1e-6);
        assert!(matches!(bad, Err(SimulationError::InvalidDistribution { .. })));
    }

    #[test]
    fn test_normalized_sum() {
        let dist = Distribution::from_weights(
            "t",
            vec![(1u32, 0.1), (2u32, 0.2), (3u32, 0.3), (4u32, 0.7)],
        )
        .unwrap();
        let total: f64 = dist.entries().iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_probability_never_sampled() {
        let dist = Distribution::from_weights(
            "t",
            vec![(DrinkingStage::Abstinent, 0.0), (DrinkingStage::High, 1.0)],
        )
        .unwrap();
        let mut rng = RngManager::new(5);
        for stage in dist.sample_many(&mut rng, 500) {
            assert_eq!(stage, DrinkingStage::High);
        }
    }

    #[test]
    fn test_signature_equal_for_equal_distributions() {
        let a = Distribution::from_weights(
            "t",
            vec![(DrinkingStage::Low, 1.0), (DrinkingStage::High, 3.0)],
        )
        .unwrap();
        let b = Distribution::from_weights(
            "t",
            vec![(DrinkingStage::High, 0.75), (DrinkingStage::Low, 0.25)],
        )
        .unwrap();
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().fingerprint(), b.signature().fingerprint());

        let c = Distribution::from_weights(
            "t",
            vec![(DrinkingStage::Low, 1.0), (DrinkingStage::High, 1.0)],
        )
        .unwrap();
        assert_ne!(a.signature().fingerprint(), c.signature().fingerprint());
    }
}
