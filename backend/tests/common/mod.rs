//! Shared fixtures for integration tests
//!
//! `Rates` describes a small, fully covered lookup set; `records()` expands it
//! into the flat records the repository is built from.

#![allow(dead_code)]

use aud_simulator_core_rs::lookups::{
    BirthRaceRecord, DeathRateRecord, DrinkingPrevalenceRecord, ImmigrationAgeRecord,
    ImmigrationRaceRecord, ImmigrationSexRecord, InitialAgeRecord, InitialPopulationRecords,
    InitialRaceRecord, InitialSexRecord, LookupRecords, LookupRepository, TransitionRecord,
    YearRateRecord,
};
use aud_simulator_core_rs::models::{
    CensusAgeGroup, Composite, DrinkingAgeGroup, DrinkingStage, Person, PersonTable, Race, Sex,
    TransitionAgeGroup, MAX_AGE,
};
use aud_simulator_core_rs::rng::RandomStreamAllocator;
use aud_simulator_core_rs::updaters::YearContext;
use aud_simulator_core_rs::TransitionPeriod;

pub const INITIAL_YEAR: i32 = 2000;
pub const SEED: u64 = 12345;

pub const RACE_SHARES: [(Race, f64); 4] = [
    (Race::White, 0.6),
    (Race::Black, 0.2),
    (Race::Hispanic, 0.15),
    (Race::Other, 0.05),
];

/// How the drinking transition table is filled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transitions {
    /// Every stage stays put with probability 1
    Identity,
    /// Stay with 0.8, move one stage up with 0.2 (Very High stays)
    Drift,
    /// No rows at all
    Empty,
}

/// Knobs for a fully covered lookup set
#[derive(Debug, Clone)]
pub struct Rates {
    pub first_year: i32,
    pub last_year: i32,
    pub birth_rate: f64,
    pub birth_male_ratio: f64,
    pub immigration_rate: f64,
    pub death_rate: f64,
    pub transitions: Transitions,
    /// Initial age → proportion
    pub initial_ages: Vec<(u32, f64)>,
    pub initial_male_ratio: f64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            first_year: INITIAL_YEAR + 1,
            last_year: INITIAL_YEAR + 10,
            birth_rate: 0.012,
            birth_male_ratio: 0.51,
            immigration_rate: 0.004,
            death_rate: 0.008,
            transitions: Transitions::Drift,
            initial_ages: (0..=90).map(|age| (age, 1.0 / 91.0)).collect(),
            initial_male_ratio: 0.49,
        }
    }
}

impl Rates {
    /// Nothing is born, arrives or dies, and nobody changes stage
    pub fn null_op() -> Self {
        Self {
            birth_rate: 0.0,
            immigration_rate: 0.0,
            death_rate: 0.0,
            transitions: Transitions::Identity,
            ..Default::default()
        }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.first_year..=self.last_year
    }

    pub fn records(&self) -> LookupRecords {
        let years: Vec<i32> = self.years().collect();
        let mut records = LookupRecords::default();

        for &year in &years {
            records.birth_rates.push(YearRateRecord {
                year,
                rate: self.birth_rate,
            });
            records.birth_male_ratios.push(YearRateRecord {
                year,
                rate: self.birth_male_ratio,
            });
            records.immigration_rates.push(YearRateRecord {
                year,
                rate: self.immigration_rate,
            });

            for sex in Sex::ALL {
                for (race, proportion) in RACE_SHARES {
                    records.birth_races.push(BirthRaceRecord {
                        year,
                        sex,
                        race,
                        proportion,
                    });
                    for age_group in CensusAgeGroup::all() {
                        records.immigration_races.push(ImmigrationRaceRecord {
                            year,
                            sex,
                            age_group,
                            race,
                            proportion,
                        });
                    }
                }
            }

            for age in 20..=39 {
                records.immigration_ages.push(ImmigrationAgeRecord {
                    year,
                    age,
                    proportion: 0.05,
                });
            }
            for age in 0..=MAX_AGE {
                records.immigration_sex.push(ImmigrationSexRecord {
                    year,
                    age,
                    male_ratio: 0.55,
                });
                for composite in Composite::all() {
                    records.death_rates.push(DeathRateRecord {
                        year,
                        sex: composite.sex,
                        race: composite.race,
                        age,
                        rate: self.death_rate,
                    });
                }
            }
        }

        records.drinking_transitions = transition_records(self.transitions);
        records.initial_drinking = prevalence_records();
        records.initial_population = InitialPopulationRecords {
            ages: self
                .initial_ages
                .iter()
                .map(|&(age, proportion)| InitialAgeRecord { age, proportion })
                .collect(),
            sex: (0..=MAX_AGE)
                .map(|age| InitialSexRecord {
                    age,
                    male_ratio: self.initial_male_ratio,
                })
                .collect(),
            races: CensusAgeGroup::all()
                .flat_map(|age_group| {
                    Sex::ALL.into_iter().flat_map(move |sex| {
                        RACE_SHARES.into_iter().map(move |(race, proportion)| {
                            InitialRaceRecord {
                                age_group,
                                sex,
                                race,
                                proportion,
                            }
                        })
                    })
                })
                .collect(),
        };
        records
    }

    pub fn lookups(&self) -> LookupRepository {
        LookupRepository::from_records(&self.records()).expect("fixture records are valid")
    }
}

pub fn transition_records(mode: Transitions) -> Vec<TransitionRecord> {
    let mut records = Vec::new();
    if mode == Transitions::Empty {
        return records;
    }
    for period in TransitionPeriod::ALL {
        for age_group in TransitionAgeGroup::ALL {
            for composite in Composite::all() {
                for (index, from) in DrinkingStage::ALL.into_iter().enumerate() {
                    let next = DrinkingStage::ALL[(index + 1).min(DrinkingStage::ALL.len() - 1)];
                    let rows: Vec<(DrinkingStage, f64)> = match mode {
                        Transitions::Drift if next != from => vec![(from, 0.8), (next, 0.2)],
                        _ => vec![(from, 1.0)],
                    };
                    for (to, probability) in rows {
                        records.push(TransitionRecord {
                            period,
                            age_group,
                            sex: composite.sex,
                            race: composite.race,
                            from,
                            to,
                            probability,
                        });
                    }
                }
            }
        }
    }
    records
}

/// Four-group prevalence; minors get their row filled in by the repository
pub fn prevalence_records() -> Vec<DrinkingPrevalenceRecord> {
    let shares = [
        (DrinkingStage::Abstinent, 0.3),
        (DrinkingStage::Low, 0.4),
        (DrinkingStage::Moderate, 0.2),
        (DrinkingStage::High, 0.07),
        (DrinkingStage::VeryHigh, 0.03),
    ];
    let mut records = Vec::new();
    for age_group in [
        DrinkingAgeGroup::From18To34,
        DrinkingAgeGroup::From35To54,
        DrinkingAgeGroup::From55,
    ] {
        for composite in Composite::all() {
            for (stage, proportion) in shares {
                records.push(DrinkingPrevalenceRecord {
                    age_group,
                    sex: composite.sex,
                    race: composite.race,
                    stage,
                    proportion,
                });
            }
        }
    }
    records
}

pub fn context(lookups: &LookupRepository, year: i32) -> YearContext<'_> {
    YearContext {
        year,
        initial_year: INITIAL_YEAR,
        lookups,
        streams: RandomStreamAllocator::new(SEED),
    }
}

/// Table of adults with consecutive IDs from 0, cycling through composites
pub fn adults(count: usize, age: u32, stage: DrinkingStage) -> PersonTable {
    let composites: Vec<Composite> = Composite::all().collect();
    PersonTable::from_persons(
        (0..count)
            .map(|i| {
                let c = composites[i % composites.len()];
                Person::new(i as u64, age, c.sex, c.race, stage)
            })
            .collect(),
    )
}
