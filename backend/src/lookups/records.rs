//! Flat lookup records
//!
//! The shape in which pre-built lookup data crosses into the engine. Each list
//! maps one-to-one onto a table in [`LookupRepository`](super::LookupRepository);
//! `LookupRepository::from_records` validates and indexes them.

use crate::core::calendar::TransitionPeriod;
use crate::models::age_group::{CensusAgeGroup, DrinkingAgeGroup, TransitionAgeGroup};
use crate::models::person::{DrinkingStage, Race, Sex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRateRecord {
    pub year: i32,
    pub rate: f64,
}

/// Race share among newborns of one sex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthRaceRecord {
    pub year: i32,
    pub sex: Sex,
    pub race: Race,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationAgeRecord {
    pub year: i32,
    pub age: u32,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationSexRecord {
    pub year: i32,
    pub age: u32,
    pub male_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationRaceRecord {
    pub year: i32,
    pub sex: Sex,
    pub age_group: CensusAgeGroup,
    pub race: Race,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRateRecord {
    pub year: i32,
    pub sex: Sex,
    pub race: Race,
    pub age: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub period: TransitionPeriod,
    pub age_group: TransitionAgeGroup,
    pub sex: Sex,
    pub race: Race,
    pub from: DrinkingStage,
    pub to: DrinkingStage,
    pub probability: f64,
}

/// Initial drinking prevalence for one (age group, sex, race, stage)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrinkingPrevalenceRecord {
    pub age_group: DrinkingAgeGroup,
    pub sex: Sex,
    pub race: Race,
    pub stage: DrinkingStage,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialAgeRecord {
    pub age: u32,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialSexRecord {
    pub age: u32,
    pub male_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialRaceRecord {
    pub age_group: CensusAgeGroup,
    pub sex: Sex,
    pub race: Race,
    pub proportion: f64,
}

/// Joint distributions of the snapshot-year population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPopulationRecords {
    pub ages: Vec<InitialAgeRecord>,
    pub sex: Vec<InitialSexRecord>,
    pub races: Vec<InitialRaceRecord>,
}

/// Every lookup category the engine consumes
///
/// Missing lists deserialize as empty; whether that is acceptable is decided
/// when the repository is built or first read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupRecords {
    pub birth_rates: Vec<YearRateRecord>,
    pub birth_male_ratios: Vec<YearRateRecord>,
    pub birth_races: Vec<BirthRaceRecord>,
    pub immigration_rates: Vec<YearRateRecord>,
    pub immigration_ages: Vec<ImmigrationAgeRecord>,
    pub immigration_sex: Vec<ImmigrationSexRecord>,
    pub immigration_races: Vec<ImmigrationRaceRecord>,
    pub death_rates: Vec<DeathRateRecord>,
    pub drinking_transitions: Vec<TransitionRecord>,
    pub initial_drinking: Vec<DrinkingPrevalenceRecord>,
    pub initial_population: InitialPopulationRecords,
}
