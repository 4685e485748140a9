//! Initial population construction.
//!
//! Builds the snapshot-year population from joint age, sex, race and drinking
//! distributions. All sampling is deterministic based on the experiment seed.
//!
//! # Key Principles
//!
//! 1. **Exact Size**: the table always holds exactly N rows
//! 2. **Ordered IDs**: rows are laid out by ascending age and numbered 0..N-1
//! 3. **Per-Person Streams**: each person's sex, race and drinking stage are drawn
//!    (in that order) from `stream(Person(id))`, so a person's attributes do not
//!    depend on how many people were built before them
//! 4. **Shared Drinking Scheme**: the drinking age scheme comes from the
//!    [`InitialDrinkingDistributionTable`], the same policy immigrants use
//!
//! # Example
//!
//! ```rust
//! use aud_simulator_core_rs::initialization::InitialPopulationBuilder;
//! use aud_simulator_core_rs::lookups::{LookupRecords, LookupRepository};
//! use aud_simulator_core_rs::rng::RandomStreamAllocator;
//!
//! let records: LookupRecords = serde_json::from_str(r#"{
//!     "initial_drinking": [
//!         {"age_group": "18-34", "sex": "Male", "race": "White", "stage": "Low", "proportion": 1.0},
//!         {"age_group": "18-34", "sex": "Female", "race": "White", "stage": "Abs", "proportion": 1.0}
//!     ],
//!     "initial_population": {
//!         "ages": [{"age": 20, "proportion": 0.5}, {"age": 30, "proportion": 0.5}],
//!         "sex": [{"age": 20, "male_ratio": 0.5}, {"age": 30, "male_ratio": 0.5}],
//!         "races": [
//!             {"age_group": "20 to 24 years", "sex": "Male", "race": "White", "proportion": 1.0},
//!             {"age_group": "20 to 24 years", "sex": "Female", "race": "White", "proportion": 1.0},
//!             {"age_group": "30 to 34 years", "sex": "Male", "race": "White", "proportion": 1.0},
//!             {"age_group": "30 to 34 years", "sex": "Female", "race": "White", "proportion": 1.0}
//!         ]
//!     }
//! }"#)?;
//! let lookups = LookupRepository::from_records(&records)?;
//!
//! let builder = InitialPopulationBuilder::new(
//!     lookups.initial_population(),
//!     lookups.initial_drinking(),
//!     RandomStreamAllocator::new(42),
//! );
//! let table = builder.build(2000, 1000)?;
//! assert_eq!(table.len(), 1000);
//! assert_eq!(table.iter().filter(|p| p.age() == 20).count(), 500);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::core::error::SimulationError;
use crate::lookups::distribution::{Distribution, PROPORTION_TOLERANCE};
use crate::lookups::records::InitialPopulationRecords;
use crate::lookups::tables::{InitialDrinkingDistributionTable, RaceDistributionTable};
use crate::models::age_group::CensusAgeGroup;
use crate::models::person::{Composite, Person, Race, Sex};
use crate::models::population::PersonTable;
use crate::rng::{PopulationStream, RandomStreamAllocator, StreamKey};
use std::collections::BTreeMap;
use tracing::debug;

const AGE_TABLE: &str = "initial_age";
const SEX_TABLE: &str = "initial_sex";
const RACE_TABLE: &str = "initial_race";

/// Validated joint distributions of the snapshot population
#[derive(Debug, Clone, PartialEq)]
pub struct InitialPopulationInputs {
    ages: Distribution<u32>,
    male_ratios: BTreeMap<u32, f64>,
    races: RaceDistributionTable<(CensusAgeGroup, Sex)>,
}

impl InitialPopulationInputs {
    /// Validate the three input distributions
    ///
    /// # Arguments
    ///
    /// * `ages` - age → proportion, summing to one within 1e-6
    /// * `male_ratios` - age → male proportion in [0,1]
    /// * `races` - (census group, sex, race) → proportion, summing to one per
    ///   (census group, sex) within 1e-6
    ///
    /// # Errors
    ///
    /// `InvalidDistribution` on any violation
    pub fn new(
        ages: impl IntoIterator<Item = (u32, f64)>,
        male_ratios: impl IntoIterator<Item = (u32, f64)>,
        races: impl IntoIterator<Item = (CensusAgeGroup, Sex, Race, f64)>,
    ) -> Result<Self, SimulationError> {
        let ages = Distribution::from_proportions(AGE_TABLE, ages, PROPORTION_TOLERANCE)?;

        let mut ratios = BTreeMap::new();
        for (age, ratio) in male_ratios {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(SimulationError::invalid_distribution(
                    SEX_TABLE,
                    format!("male ratio {} for age {} outside [0,1]", ratio, age),
                ));
            }
            if ratios.insert(age, ratio).is_some() {
                return Err(SimulationError::invalid_distribution(
                    SEX_TABLE,
                    format!("duplicate entry for age {}", age),
                ));
            }
        }

        let mut grouped: BTreeMap<(CensusAgeGroup, Sex), Vec<(Race, f64)>> = BTreeMap::new();
        for (group, sex, race, proportion) in races {
            grouped.entry((group, sex)).or_default().push((race, proportion));
        }
        let mut by_key = BTreeMap::new();
        for (key, proportions) in grouped {
            let table = format!("{} {} {}", RACE_TABLE, key.0, key.1);
            let dist = Distribution::from_proportions(&table, proportions, PROPORTION_TOLERANCE)?;
            by_key.insert(key, dist);
        }

        Ok(Self {
            ages,
            male_ratios: ratios,
            races: RaceDistributionTable::new(RACE_TABLE, by_key),
        })
    }

    pub fn from_records(records: &InitialPopulationRecords) -> Result<Self, SimulationError> {
        Self::new(
            records.ages.iter().map(|r| (r.age, r.proportion)),
            records.sex.iter().map(|r| (r.age, r.male_ratio)),
            records
                .races
                .iter()
                .map(|r| (r.age_group, r.sex, r.race, r.proportion)),
        )
    }

    pub fn ages(&self) -> &Distribution<u32> {
        &self.ages
    }

    pub fn male_ratio(&self, age: u32) -> Result<f64, SimulationError> {
        self.male_ratios
            .get(&age)
            .copied()
            .ok_or_else(|| SimulationError::lookup_miss(SEX_TABLE, age))
    }

    pub fn race_distribution(
        &self,
        group: CensusAgeGroup,
        sex: Sex,
    ) -> Result<&Distribution<Race>, SimulationError> {
        self.races.get(&(group, sex))
    }
}

/// Builder for the snapshot-year population table
pub struct InitialPopulationBuilder<'a> {
    inputs: &'a InitialPopulationInputs,
    drinking: &'a InitialDrinkingDistributionTable,
    streams: RandomStreamAllocator,
}

impl<'a> InitialPopulationBuilder<'a> {
    pub fn new(
        inputs: &'a InitialPopulationInputs,
        drinking: &'a InitialDrinkingDistributionTable,
        streams: RandomStreamAllocator,
    ) -> Self {
        Self {
            inputs,
            drinking,
            streams,
        }
    }

    /// Build exactly `size` persons for the snapshot `year`
    ///
    /// # Errors
    ///
    /// - `InvalidAge` if an age with positive proportion exceeds the census bands
    /// - `LookupMiss` if a sampled age has no male ratio, or a sampled
    ///   (census group, sex) or (drinking group, composite) has no distribution
    pub fn build(&self, year: i32, size: usize) -> Result<PersonTable, SimulationError> {
        let counts = self.age_counts(year, size);

        let mut persons = Vec::with_capacity(size);
        let mut next_id: u64 = 0;
        for (&age, &count) in &counts {
            if count == 0 {
                continue;
            }
            let group = CensusAgeGroup::from_age(age)?;
            for _ in 0..count {
                persons.push(self.build_person(next_id, age, group)?);
                next_id += 1;
            }
        }

        let mut table = PersonTable::new();
        table.append_new(persons);
        debug!(year, population = table.len(), "initial population built");
        Ok(table)
    }

    fn build_person(
        &self,
        id: u64,
        age: u32,
        group: CensusAgeGroup,
    ) -> Result<Person, SimulationError> {
        let mut rng = self.streams.stream(StreamKey::Person(id));

        let sex = if rng.bernoulli(self.inputs.male_ratio(age)?) {
            Sex::Male
        } else {
            Sex::Female
        };
        let race = self.inputs.race_distribution(group, sex)?.sample(&mut rng);
        let composite = Composite::new(sex, race);
        let stage = self
            .drinking
            .distribution_for(age, composite)?
            .sample(&mut rng);

        Ok(Person::new(id, age, sex, race, stage))
    }

    /// Per-age counts summing to exactly `size`
    ///
    /// Floors `size * proportion`, then adds (or removes) the remaining delta
    /// one age at a time, each age drawn by the age distribution from the
    /// year's correction stream. Removal only picks ages that still have rows.
    fn age_counts(&self, year: i32, size: usize) -> BTreeMap<u32, usize> {
        let ages = self.inputs.ages();
        let mut counts: BTreeMap<u32, usize> = ages
            .entries()
            .iter()
            .map(|(age, p)| (*age, (size as f64 * p).floor() as usize))
            .collect();

        let assigned: usize = counts.values().sum();
        if assigned == size {
            return counts;
        }

        let mut rng = self.streams.stream(StreamKey::Population {
            purpose: PopulationStream::InitialAgeCorrection,
            year,
        });

        if assigned < size {
            for age in ages.sample_many(&mut rng, size - assigned) {
                *counts.entry(age).or_insert(0) += 1;
            }
        } else {
            for _ in 0..(assigned - size) {
                let mut running = 0.0;
                let (keys, cumulative): (Vec<u32>, Vec<f64>) = ages
                    .entries()
                    .iter()
                    .filter(|(age, _)| counts.get(age).copied().unwrap_or(0) > 0)
                    .map(|(age, p)| {
                        running += p;
                        (*age, running)
                    })
                    .unzip();
                if running <= 0.0 {
                    break;
                }
                let age = keys[rng.choose_cumulative(&cumulative)];
                if let Some(count) = counts.get_mut(&age) {
                    *count -= 1;
                }
            }
        }

        debug!(
            year,
            assigned,
            target = size,
            "initial age counts corrected"
        );
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::age_group::DrinkingAgeGroup;
    use crate::models::person::DrinkingStage;

    fn drinking_table() -> InitialDrinkingDistributionTable {
        let mut by_key = BTreeMap::new();
        for composite in Composite::all() {
            for group in [
                DrinkingAgeGroup::Under18,
                DrinkingAgeGroup::From18To34,
                DrinkingAgeGroup::From35To54,
                DrinkingAgeGroup::From55,
            ] {
                by_key.insert((group, composite), Distribution::certain(DrinkingStage::Low));
            }
        }
        InitialDrinkingDistributionTable::new(by_key).unwrap()
    }

    fn all_white(groups: &[CensusAgeGroup]) -> Vec<(CensusAgeGroup, Sex, Race, f64)> {
        groups
            .iter()
            .flat_map(|g| Sex::ALL.into_iter().map(move |s| (*g, s, Race::White, 1.0)))
            .collect()
    }

    #[test]
    fn test_counts_sum_to_size_with_fractional_shares() {
        let groups: Vec<_> = CensusAgeGroup::all().collect();
        let inputs = InitialPopulationInputs::new(
            vec![(10, 1.0 / 3.0), (40, 1.0 / 3.0), (70, 1.0 / 3.0)],
            vec![(10, 0.5), (40, 0.5), (70, 0.5)],
            all_white(&groups),
        )
        .unwrap();
        let drinking = drinking_table();
        let builder = InitialPopulationBuilder::new(&inputs, &drinking, RandomStreamAllocator::new(3));

        let table = builder.build(2000, 100).unwrap();
        assert_eq!(table.len(), 100);
        let ids: Vec<u64> = table.iter().map(|p| p.id()).collect();
        assert_eq!(ids, (0..100).collect::<Vec<u64>>());
    }

    #[test]
    fn test_rows_ordered_by_age() {
        let groups: Vec<_> = CensusAgeGroup::all().collect();
        let inputs = InitialPopulationInputs::new(
            vec![(60, 0.5), (20, 0.5)],
            vec![(20, 0.5), (60, 0.5)],
            all_white(&groups),
        )
        .unwrap();
        let drinking = drinking_table();
        let builder = InitialPopulationBuilder::new(&inputs, &drinking, RandomStreamAllocator::new(9));

        let table = builder.build(2000, 10).unwrap();
        let ages: Vec<u32> = table.iter().map(|p| p.age()).collect();
        assert_eq!(ages, vec![20, 20, 20, 20, 20, 60, 60, 60, 60, 60]);
    }

    #[test]
    fn test_rejects_bad_race_proportions() {
        let group = CensusAgeGroup::from_age(30).unwrap();
        let err = InitialPopulationInputs::new(
            vec![(30, 1.0)],
            vec![(30, 0.5)],
            vec![(group, Sex::Male, Race::White, 0.7), (group, Sex::Male, Race::Black, 0.2)],
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDistribution { .. }));
    }

    #[test]
    fn test_rejects_male_ratio_out_of_range() {
        let err = InitialPopulationInputs::new(vec![(30, 1.0)], vec![(30, 1.2)], vec![]).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDistribution { .. }));
    }

    #[test]
    fn test_rejects_repeated_male_ratio() {
        let err = InitialPopulationInputs::new(vec![(30, 1.0)], vec![(30, 0.5), (30, 0.4)], vec![])
            .unwrap_err();
        match err {
            SimulationError::InvalidDistribution { table, reason } => {
                assert_eq!(table, SEX_TABLE);
                assert!(reason.contains("duplicate"));
            }
            other => panic!("expected InvalidDistribution, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_race_key_is_lookup_miss() {
        let inputs = InitialPopulationInputs::new(vec![(30, 1.0)], vec![(30, 0.5)], vec![]).unwrap();
        let drinking = drinking_table();
        let builder = InitialPopulationBuilder::new(&inputs, &drinking, RandomStreamAllocator::new(1));

        let err = builder.build(2000, 5).unwrap_err();
        assert!(matches!(err, SimulationError::LookupMiss { table: "initial_race", .. }));
    }

    #[test]
    fn test_age_beyond_census_bands_is_invalid_age() {
        let groups: Vec<_> = CensusAgeGroup::all().collect();
        let inputs =
            InitialPopulationInputs::new(vec![(105, 1.0)], vec![(105, 0.5)], all_white(&groups))
                .unwrap();
        let drinking = drinking_table();
        let builder = InitialPopulationBuilder::new(&inputs, &drinking, RandomStreamAllocator::new(1));

        let err = builder.build(2000, 5).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidAge { age: 105, .. }));
    }
}
