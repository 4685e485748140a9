//! Lookup repository
//!
//! Immutable, time- and category-indexed probability tables consulted by every
//! updater. Built once from [`LookupRecords`] before the run starts and never
//! mutated afterwards.
//!
//! Construction is where input problems surface as `InvalidDistribution`. A
//! year or key that is simply absent is not an error here: it becomes a
//! `LookupMiss` at the point of use, naming the table and key.

pub mod distribution;
pub mod records;
pub mod tables;

pub use distribution::{Distribution, DistributionSignature, PROPORTION_TOLERANCE};
pub use records::{
    BirthRaceRecord, DeathRateRecord, DrinkingPrevalenceRecord, ImmigrationAgeRecord,
    ImmigrationRaceRecord, ImmigrationSexRecord, InitialAgeRecord, InitialPopulationRecords,
    InitialRaceRecord, InitialSexRecord, LookupRecords, TransitionRecord, YearRateRecord,
};
pub use tables::{
    DeathRateTable, DrinkingTransitionTable, InitialDrinkingDistributionTable,
    RaceDistributionTable, TransitionKey, YearCategoryTable, YearDeathRates,
    YearDistributionTable, YearRateTable,
};

use crate::core::error::SimulationError;
use crate::initialization::InitialPopulationInputs;
use crate::models::age_group::{CensusAgeGroup, DrinkingAgeGroup};
use crate::models::person::{Composite, DrinkingStage, Race, Sex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Immigrant age shares must sum to one within this tolerance
pub const IMMIGRATION_AGE_TOLERANCE: f64 = 0.01;

/// A year-indexed table with no entry for a year the run will simulate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub table: String,
    pub year: i32,
}

/// Every table the engine reads, immutable for the run
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRepository {
    birth_rates: YearRateTable,
    birth_male_ratios: YearRateTable,
    birth_races: RaceDistributionTable<(i32, Sex)>,
    immigration_rates: YearRateTable,
    immigration_ages: YearDistributionTable<u32>,
    immigration_male_ratios: YearCategoryTable<u32>,
    immigration_races: RaceDistributionTable<(i32, Sex, CensusAgeGroup)>,
    death_rates: DeathRateTable,
    drinking_transitions: DrinkingTransitionTable,
    initial_drinking: InitialDrinkingDistributionTable,
    initial_population: InitialPopulationInputs,
}

impl LookupRepository {
    /// Validate and index flat lookup records
    ///
    /// - rates (birth, male ratio, immigration, death) must lie in [0,1]
    /// - race shares for a repeated key are summed, then normalized per key
    /// - immigrant age shares must sum to one within 0.01 per year
    /// - transition rows are normalized per (period, age group, composite, stage)
    /// - initial drinking prevalence gains a `0-17 → Abs = 1` row for every
    ///   (sex, race) present that lacks one, and an all-zero row becomes `Abs = 1`
    ///
    /// # Errors
    ///
    /// `InvalidDistribution` on any violation
    pub fn from_records(records: &LookupRecords) -> Result<Self, SimulationError> {
        let birth_rates = YearRateTable::new(
            "birth_rate",
            records.birth_rates.iter().map(|r| (r.year, r.rate)),
        )?;
        let birth_male_ratios = YearRateTable::new(
            "birth_male_ratio",
            records.birth_male_ratios.iter().map(|r| (r.year, r.rate)),
        )?;
        let birth_races = RaceDistributionTable::new(
            "birth_race",
            normalize_grouped(
                "birth_race",
                records
                    .birth_races
                    .iter()
                    .map(|r| ((r.year, r.sex), r.race, r.proportion)),
            )?,
        );

        let immigration_rates = YearRateTable::new(
            "immigration_rate",
            records.immigration_rates.iter().map(|r| (r.year, r.rate)),
        )?;
        let immigration_ages = build_immigration_ages(records)?;
        let immigration_male_ratios = YearCategoryTable::new(
            "immigration_sex",
            records
                .immigration_sex
                .iter()
                .map(|r| (r.year, r.age, r.male_ratio)),
        )?;
        let immigration_races = RaceDistributionTable::new(
            "immigration_race",
            normalize_grouped(
                "immigration_race",
                records
                    .immigration_races
                    .iter()
                    .map(|r| ((r.year, r.sex, r.age_group), r.race, r.proportion)),
            )?,
        );

        let death_rates = DeathRateTable::new(
            records
                .death_rates
                .iter()
                .map(|r| (r.year, Composite::new(r.sex, r.race), r.age, r.rate)),
        )?;

        let drinking_transitions = DrinkingTransitionTable::new(normalize_grouped(
            DrinkingTransitionTable::NAME,
            records.drinking_transitions.iter().map(|r| {
                let key = TransitionKey {
                    period: r.period,
                    age_group: r.age_group,
                    composite: Composite::new(r.sex, r.race),
                    stage: r.from,
                };
                (key, r.to, r.probability)
            }),
        )?);

        let initial_drinking = build_initial_drinking(&records.initial_drinking)?;
        let initial_population = InitialPopulationInputs::from_records(&records.initial_population)?;

        Ok(Self {
            birth_rates,
            birth_male_ratios,
            birth_races,
            immigration_rates,
            immigration_ages,
            immigration_male_ratios,
            immigration_races,
            death_rates,
            drinking_transitions,
            initial_drinking,
            initial_population,
        })
    }

    pub fn birth_rate(&self, year: i32) -> Result<f64, SimulationError> {
        self.birth_rates.get(year)
    }

    pub fn birth_male_ratio(&self, year: i32) -> Result<f64, SimulationError> {
        self.birth_male_ratios.get(year)
    }

    /// Race distribution among newborns of `sex` (the under-5 census band)
    pub fn birth_race(&self, year: i32, sex: Sex) -> Result<&Distribution<Race>, SimulationError> {
        self.birth_races.get(&(year, sex))
    }

    pub fn immigration_rate(&self, year: i32) -> Result<f64, SimulationError> {
        self.immigration_rates.get(year)
    }

    pub fn immigration_ages(&self, year: i32) -> Result<&Distribution<u32>, SimulationError> {
        self.immigration_ages.get(year)
    }

    pub fn immigration_male_ratio(&self, year: i32, age: u32) -> Result<f64, SimulationError> {
        self.immigration_male_ratios.get(year, age)
    }

    pub fn immigration_race(
        &self,
        year: i32,
        sex: Sex,
        group: CensusAgeGroup,
    ) -> Result<&Distribution<Race>, SimulationError> {
        self.immigration_races.get(&(year, sex, group))
    }

    pub fn death_rates(&self, year: i32) -> Result<&YearDeathRates, SimulationError> {
        self.death_rates.for_year(year)
    }

    pub fn drinking_transitions(&self) -> &DrinkingTransitionTable {
        &self.drinking_transitions
    }

    pub fn initial_drinking(&self) -> &InitialDrinkingDistributionTable {
        &self.initial_drinking
    }

    pub fn initial_population(&self) -> &InitialPopulationInputs {
        &self.initial_population
    }

    /// Year-indexed tables lacking an entry in `first_year..=last_year`
    ///
    /// A pre-flight report only; the run still fails with `LookupMiss` at
    /// first access.
    pub fn coverage_gaps(&self, first_year: i32, last_year: i32) -> Vec<CoverageGap> {
        let birth_race_keys: BTreeSet<(i32, Sex)> = self.birth_races.keys().copied().collect();
        let immigration_race_years: BTreeSet<i32> =
            self.immigration_races.keys().map(|(year, _, _)| *year).collect();

        let mut gaps = Vec::new();
        for year in first_year..=last_year {
            let mut check = |table: &str, present: bool| {
                if !present {
                    gaps.push(CoverageGap {
                        table: table.to_string(),
                        year,
                    });
                }
            };
            check("birth_rate", self.birth_rates.has_year(year));
            check("birth_male_ratio", self.birth_male_ratios.has_year(year));
            check(
                "birth_race",
                Sex::ALL
                    .iter()
                    .all(|sex| birth_race_keys.contains(&(year, *sex))),
            );
            check("immigration_rate", self.immigration_rates.has_year(year));
            check("immigration_age", self.immigration_ages.has_year(year));
            check("immigration_sex", self.immigration_male_ratios.has_year(year));
            check("immigration_race", immigration_race_years.contains(&year));
            check(DeathRateTable::NAME, self.death_rates.has_year(year));
        }
        gaps
    }
}

/// Group `(key, category, weight)` rows by key and normalize each group
fn normalize_grouped<Key, K>(
    table: &str,
    rows: impl IntoIterator<Item = (Key, K, f64)>,
) -> Result<BTreeMap<Key, Distribution<K>>, SimulationError>
where
    Key: Ord + std::fmt::Debug,
    K: Ord + Copy + std::fmt::Debug,
{
    let mut grouped: BTreeMap<Key, Vec<(K, f64)>> = BTreeMap::new();
    for (key, category, weight) in rows {
        grouped.entry(key).or_default().push((category, weight));
    }

    grouped
        .into_iter()
        .map(|(key, weights)| {
            let dist = Distribution::from_weights(&format!("{} {:?}", table, key), weights)?;
            Ok((key, dist))
        })
        .collect()
}

fn build_immigration_ages(
    records: &LookupRecords,
) -> Result<YearDistributionTable<u32>, SimulationError> {
    let mut grouped: BTreeMap<i32, Vec<(u32, f64)>> = BTreeMap::new();
    for record in &records.immigration_ages {
        grouped
            .entry(record.year)
            .or_default()
            .push((record.age, record.proportion));
    }

    let mut by_year = BTreeMap::new();
    for (year, shares) in grouped {
        let dist = Distribution::from_proportions(
            &format!("immigration_age {}", year),
            shares,
            IMMIGRATION_AGE_TOLERANCE,
        )?;
        by_year.insert(year, dist);
    }
    Ok(YearDistributionTable::new("immigration_age", by_year))
}

fn build_initial_drinking(
    records: &[DrinkingPrevalenceRecord],
) -> Result<InitialDrinkingDistributionTable, SimulationError> {
    let mut grouped: BTreeMap<(DrinkingAgeGroup, Composite), Vec<(DrinkingStage, f64)>> =
        BTreeMap::new();
    for record in records {
        grouped
            .entry((record.age_group, Composite::new(record.sex, record.race)))
            .or_default()
            .push((record.stage, record.proportion));
    }

    let composites: BTreeSet<Composite> = grouped.keys().map(|(_, c)| *c).collect();
    for composite in composites {
        grouped
            .entry((DrinkingAgeGroup::Under18, composite))
            .or_insert_with(|| vec![(DrinkingStage::Abstinent, 1.0)]);
    }

    let mut by_key = BTreeMap::new();
    for (key, mut shares) in grouped {
        if shares.iter().all(|(_, p)| *p == 0.0) {
            shares = vec![(DrinkingStage::Abstinent, 1.0)];
        }
        let table = format!("{} {} {}", InitialDrinkingDistributionTable::NAME, key.0, key.1);
        by_key.insert(key, Distribution::from_weights(&table, shares)?);
    }
    InitialDrinkingDistributionTable::new(by_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prevalence(sex: Sex, race: Race, stage: DrinkingStage, proportion: f64) -> DrinkingPrevalenceRecord {
        DrinkingPrevalenceRecord {
            age_group: DrinkingAgeGroup::From18To34,
            sex,
            race,
            stage,
            proportion,
        }
    }

    #[test]
    fn test_initial_drinking_fills_minors_and_zero_rows() {
        let table = build_initial_drinking(&[
            prevalence(Sex::Male, Race::Black, DrinkingStage::Low, 0.0),
            prevalence(Sex::Male, Race::Black, DrinkingStage::High, 0.0),
        ])
        .unwrap();
        let composite = Composite::new(Sex::Male, Race::Black);

        let minors = table.distribution_for(12, composite).unwrap();
        assert_eq!(minors.probability(&DrinkingStage::Abstinent), 1.0);
        let adults = table.distribution_for(25, composite).unwrap();
        assert_eq!(adults.probability(&DrinkingStage::Abstinent), 1.0);
    }

    #[test]
    fn test_grouped_weights_are_summed_then_normalized() {
        let grouped = normalize_grouped(
            "birth_race",
            vec![
                ((2001, Sex::Male), Race::White, 0.3),
                ((2001, Sex::Male), Race::White, 0.3),
                ((2001, Sex::Male), Race::Black, 0.2),
            ],
        )
        .unwrap();
        let dist = &grouped[&(2001, Sex::Male)];
        assert!((dist.probability(&Race::White) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_immigration_ages_outside_tolerance_rejected() {
        let records = LookupRecords {
            immigration_ages: vec![
                ImmigrationAgeRecord {
                    year: 2001,
                    age: 20,
                    proportion: 0.5,
                },
                ImmigrationAgeRecord {
                    year: 2001,
                    age: 30,
                    proportion: 0.45,
                },
            ],
            ..Default::default()
        };
        let err = build_immigration_ages(&records).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDistribution { .. }));
    }
}
