//! Immutable lookup tables
//!
//! Every accessor that can miss returns `LookupMiss` naming the table and key.

use crate::core::calendar::TransitionPeriod;
use crate::core::error::SimulationError;
use crate::lookups::distribution::Distribution;
use crate::models::age_group::{DrinkingAgeGroup, DrinkingAgeScheme, TransitionAgeGroup};
use crate::models::person::{Composite, DrinkingStage, Race};
use std::collections::BTreeMap;
use std::fmt::Debug;

fn check_unit_interval(table: &str, key: impl Debug, value: f64) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::invalid_distribution(
            table,
            format!("value {} for {:?} outside [0,1]", value, key),
        ))
    }
}

/// year → rate in [0,1]
#[derive(Debug, Clone, PartialEq)]
pub struct YearRateTable {
    name: &'static str,
    rates: BTreeMap<i32, f64>,
}

impl YearRateTable {
    pub fn new(
        name: &'static str,
        rates: impl IntoIterator<Item = (i32, f64)>,
    ) -> Result<Self, SimulationError> {
        let mut map = BTreeMap::new();
        for (year, rate) in rates {
            check_unit_interval(name, year, rate)?;
            if map.insert(year, rate).is_some() {
                return Err(SimulationError::invalid_distribution(
                    name,
                    format!("duplicate entry for year {}", year),
                ));
            }
        }
        Ok(Self { name, rates: map })
    }

    pub fn get(&self, year: i32) -> Result<f64, SimulationError> {
        self.rates
            .get(&year)
            .copied()
            .ok_or_else(|| SimulationError::lookup_miss(self.name, year))
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.rates.contains_key(&year)
    }
}

/// year → category → value in [0,1]
#[derive(Debug, Clone, PartialEq)]
pub struct YearCategoryTable<K> {
    name: &'static str,
    values: BTreeMap<(i32, K), f64>,
}

impl<K: Ord + Copy + Debug> YearCategoryTable<K> {
    pub fn new(
        name: &'static str,
        values: impl IntoIterator<Item = (i32, K, f64)>,
    ) -> Result<Self, SimulationError> {
        let mut map = BTreeMap::new();
        for (year, key, value) in values {
            check_unit_interval(name, (year, key), value)?;
            if map.insert((year, key), value).is_some() {
                return Err(SimulationError::invalid_distribution(
                    name,
                    format!("duplicate entry for {:?}", (year, key)),
                ));
            }
        }
        Ok(Self { name, values: map })
    }

    pub fn get(&self, year: i32, key: K) -> Result<f64, SimulationError> {
        self.values
            .get(&(year, key))
            .copied()
            .ok_or_else(|| SimulationError::lookup_miss(self.name, (year, key)))
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.values.keys().any(|(y, _)| *y == year)
    }
}

/// year → distribution over `K`
#[derive(Debug, Clone, PartialEq)]
pub struct YearDistributionTable<K> {
    name: &'static str,
    by_year: BTreeMap<i32, Distribution<K>>,
}

impl<K: Ord + Copy + Debug> YearDistributionTable<K> {
    pub fn new(name: &'static str, by_year: BTreeMap<i32, Distribution<K>>) -> Self {
        Self { name, by_year }
    }

    pub fn get(&self, year: i32) -> Result<&Distribution<K>, SimulationError> {
        self.by_year
            .get(&year)
            .ok_or_else(|| SimulationError::lookup_miss(self.name, year))
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.by_year.contains_key(&year)
    }
}

/// key → {race → proportion}
///
/// Keys are `(year, sex)` for newborns, `(year, sex, census group)` for
/// immigrants and `(census group, sex)` for the initial population.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceDistributionTable<Key> {
    name: &'static str,
    by_key: BTreeMap<Key, Distribution<Race>>,
}

impl<Key: Ord + Debug> RaceDistributionTable<Key> {
    pub fn new(name: &'static str, by_key: BTreeMap<Key, Distribution<Race>>) -> Self {
        Self { name, by_key }
    }

    pub fn get(&self, key: &Key) -> Result<&Distribution<Race>, SimulationError> {
        self.by_key
            .get(key)
            .ok_or_else(|| SimulationError::lookup_miss(self.name, key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.by_key.keys()
    }
}

/// Death probabilities for one year, keyed by (composite, age)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearDeathRates {
    rates: BTreeMap<(Composite, u32), f64>,
}

impl YearDeathRates {
    pub fn get(&self, composite: Composite, age: u32) -> Option<f64> {
        self.rates.get(&(composite, age)).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// (year, composite, age) → death probability
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeathRateTable {
    by_year: BTreeMap<i32, YearDeathRates>,
}

impl DeathRateTable {
    pub const NAME: &'static str = "death_rates";

    pub fn new(
        rates: impl IntoIterator<Item = (i32, Composite, u32, f64)>,
    ) -> Result<Self, SimulationError> {
        let mut by_year: BTreeMap<i32, YearDeathRates> = BTreeMap::new();
        for (year, composite, age, rate) in rates {
            check_unit_interval(Self::NAME, (year, composite, age), rate)?;
            let previous = by_year
                .entry(year)
                .or_default()
                .rates
                .insert((composite, age), rate);
            if previous.is_some() {
                return Err(SimulationError::invalid_distribution(
                    Self::NAME,
                    format!("duplicate entry for {:?}", (year, composite, age)),
                ));
            }
        }
        Ok(Self { by_year })
    }

    /// Rates for `year`; a year with no rows is a miss
    pub fn for_year(&self, year: i32) -> Result<&YearDeathRates, SimulationError> {
        self.by_year
            .get(&year)
            .filter(|rates| !rates.is_empty())
            .ok_or_else(|| SimulationError::lookup_miss(Self::NAME, year))
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.for_year(year).is_ok()
    }
}

/// Key of one outgoing transition distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionKey {
    pub period: TransitionPeriod,
    pub age_group: TransitionAgeGroup,
    pub composite: Composite,
    pub stage: DrinkingStage,
}

/// (period, transition age group, composite, stage) → {next stage → probability}
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrinkingTransitionTable {
    by_key: BTreeMap<TransitionKey, Distribution<DrinkingStage>>,
}

impl DrinkingTransitionTable {
    pub const NAME: &'static str = "drinking_transitions";

    pub fn new(by_key: BTreeMap<TransitionKey, Distribution<DrinkingStage>>) -> Self {
        Self { by_key }
    }

    /// Outgoing distribution, `None` when the table has no row for `key`
    pub fn get(&self, key: &TransitionKey) -> Option<&Distribution<DrinkingStage>> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// (drinking age group, composite) → {stage → probability}
///
/// The age scheme is detected once here from the table's own keys and reused
/// by every caller.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialDrinkingDistributionTable {
    scheme: DrinkingAgeScheme,
    by_key: BTreeMap<(DrinkingAgeGroup, Composite), Distribution<DrinkingStage>>,
}

impl InitialDrinkingDistributionTable {
    pub const NAME: &'static str = "initial_drinking";

    pub fn new(
        by_key: BTreeMap<(DrinkingAgeGroup, Composite), Distribution<DrinkingStage>>,
    ) -> Result<Self, SimulationError> {
        let scheme = DrinkingAgeScheme::detect(by_key.keys().map(|(group, _)| *group))?;
        Ok(Self { scheme, by_key })
    }

    pub fn scheme(&self) -> DrinkingAgeScheme {
        self.scheme
    }

    /// Distribution for a person of `age` and `composite`
    pub fn distribution_for(
        &self,
        age: u32,
        composite: Composite,
    ) -> Result<&Distribution<DrinkingStage>, SimulationError> {
        let group = self.scheme.group_for(age);
        self.by_key
            .get(&(group, composite))
            .ok_or_else(|| SimulationError::lookup_miss(Self::NAME, (group, composite)))
    }
}
