//! Yearly summaries, result sinks and soft validation

use crate::core::error::SimulationError;
use crate::models::person::{DrinkingStage, Person, Race, Sex};
use crate::models::population::PersonTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Age Bands
// ============================================================================

/// Adult age band used in summary cross-tabulations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdultAgeBand {
    #[serde(rename = "18-34")]
    From18To34,
    #[serde(rename = "35-54")]
    From35To54,
    #[serde(rename = "55+")]
    From55,
}

impl AdultAgeBand {
    pub const ALL: [AdultAgeBand; 3] = [
        AdultAgeBand::From18To34,
        AdultAgeBand::From35To54,
        AdultAgeBand::From55,
    ];

    /// Band containing `age`, `None` for children
    pub fn for_age(age: u32) -> Option<Self> {
        match age {
            0..=17 => None,
            18..=34 => Some(AdultAgeBand::From18To34),
            35..=54 => Some(AdultAgeBand::From35To54),
            _ => Some(AdultAgeBand::From55),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdultAgeBand::From18To34 => "18-34",
            AdultAgeBand::From35To54 => "35-54",
            AdultAgeBand::From55 => "55+",
        }
    }
}

impl fmt::Display for AdultAgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Share of each drinking stage within a group, every stage present
pub type StageShares = BTreeMap<DrinkingStage, f64>;

fn stage_shares<'a>(persons: impl Iterator<Item = &'a Person>) -> StageShares {
    let mut counts = [0usize; 5];
    let mut total = 0usize;
    for person in persons {
        counts[person.drinking_stage().index()] += 1;
        total += 1;
    }
    DrinkingStage::ALL
        .iter()
        .map(|stage| {
            let share = if total == 0 {
                0.0
            } else {
                counts[stage.index()] as f64 / total as f64
            };
            (*stage, share)
        })
        .collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

// ============================================================================
// Year Summary
// ============================================================================

/// Drinking-stage shares of one sex within one adult age band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SexBandShares {
    pub sex: Sex,
    pub band: AdultAgeBand,
    pub shares: StageShares,
}

/// Drinking-stage shares by single dimension
///
/// `by_age_band` covers adults only, since the bands start at 18.
/// `by_sex` and `by_race` cover every living person, children included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrinkingCrossTabs {
    pub by_age_band: BTreeMap<AdultAgeBand, StageShares>,
    pub by_sex: BTreeMap<Sex, StageShares>,
    pub by_race: BTreeMap<Race, StageShares>,
}

/// Structured summary of the population at the end of one year
///
/// `stage_counts` and `sex_band_shares` cover adults only; see
/// [`DrinkingCrossTabs`] for the scope of each cross-tabulation.
///
/// # Example
///
/// ```rust
/// use aud_simulator_core_rs::models::{DrinkingStage, Person, PersonTable, Race, Sex};
/// use aud_simulator_core_rs::orchestrator::YearSummary;
///
/// let table = PersonTable::from_persons(vec![
///     Person::new(0, 40, Sex::Male, Race::White, DrinkingStage::High),
///     Person::new(1, 8, Sex::Female, Race::Black, DrinkingStage::Abstinent),
/// ]);
/// let summary = YearSummary::from_table(2000, &table);
///
/// assert_eq!(summary.total_population, 2);
/// assert_eq!(summary.adult_count, 1);
/// assert_eq!(summary.stage_counts[&DrinkingStage::High], 1);
/// assert_eq!(summary.stage_counts[&DrinkingStage::Abstinent], 0);
/// assert_eq!(summary.row().len(), YearSummary::header().len());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub total_population: usize,
    pub child_count: usize,
    pub adult_count: usize,
    pub male_proportion: f64,
    pub immigration_proportion: f64,
    pub race_counts: BTreeMap<Race, usize>,
    /// Adults per drinking stage
    pub stage_counts: BTreeMap<DrinkingStage, usize>,
    /// Male then female, each in band order
    pub sex_band_shares: Vec<SexBandShares>,
    pub cross_tabs: DrinkingCrossTabs,
}

impl YearSummary {
    pub fn from_table(year: i32, table: &PersonTable) -> Self {
        let alive: Vec<&Person> = table.iter().filter(|p| p.is_alive()).collect();
        let adults: Vec<&Person> = alive.iter().copied().filter(|p| p.is_adult()).collect();

        let total = alive.len();
        let males = alive.iter().filter(|p| p.sex() == Sex::Male).count();
        let immigrants = alive.iter().filter(|p| p.is_immigrant()).count();

        let race_counts = Race::ALL
            .iter()
            .map(|race| (*race, alive.iter().filter(|p| p.race() == *race).count()))
            .collect();
        let stage_counts = DrinkingStage::ALL
            .iter()
            .map(|stage| {
                let count = adults.iter().filter(|p| p.drinking_stage() == *stage).count();
                (*stage, count)
            })
            .collect();

        let in_band = |p: &&Person, band: AdultAgeBand| AdultAgeBand::for_age(p.age()) == Some(band);

        let sex_band_shares = Sex::ALL
            .iter()
            .flat_map(|sex| AdultAgeBand::ALL.iter().map(move |band| (*sex, *band)))
            .map(|(sex, band)| SexBandShares {
                sex,
                band,
                shares: stage_shares(
                    adults
                        .iter()
                        .copied()
                        .filter(|p| p.sex() == sex && in_band(p, band)),
                ),
            })
            .collect();

        let cross_tabs = DrinkingCrossTabs {
            by_age_band: AdultAgeBand::ALL
                .iter()
                .map(|band| {
                    let shares = stage_shares(adults.iter().copied().filter(|p| in_band(p, *band)));
                    (*band, shares)
                })
                .collect(),
            by_sex: Sex::ALL
                .iter()
                .map(|sex| {
                    (*sex, stage_shares(alive.iter().copied().filter(|p| p.sex() == *sex)))
                })
                .collect(),
            by_race: Race::ALL
                .iter()
                .map(|race| {
                    (*race, stage_shares(alive.iter().copied().filter(|p| p.race() == *race)))
                })
                .collect(),
        };

        Self {
            year,
            total_population: total,
            child_count: total - adults.len(),
            adult_count: adults.len(),
            male_proportion: ratio(males, total),
            immigration_proportion: ratio(immigrants, total),
            race_counts,
            stage_counts,
            sex_band_shares,
            cross_tabs,
        }
    }

    /// Column names of [`row`](Self::row), in order
    pub fn header() -> Vec<String> {
        let mut columns: Vec<String> = [
            "Year",
            "TotalPopulation",
            "ChildCount",
            "AdultCount",
            "MaleProportion",
            "ImmigrationProportion",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        columns.extend(Race::ALL.iter().map(|r| r.label().to_string()));
        columns.extend(DrinkingStage::ALL.iter().map(|s| s.label().to_string()));
        for sex in Sex::ALL {
            for band in AdultAgeBand::ALL {
                for stage in DrinkingStage::ALL {
                    columns.push(format!("{}_{}_{}", sex, band, stage));
                }
            }
        }
        columns
    }

    /// Flat record for tabular sinks, matching [`header`](Self::header)
    pub fn row(&self) -> Vec<String> {
        let mut values = vec![
            self.year.to_string(),
            self.total_population.to_string(),
            self.child_count.to_string(),
            self.adult_count.to_string(),
            self.male_proportion.to_string(),
            self.immigration_proportion.to_string(),
        ];
        values.extend(
            Race::ALL
                .iter()
                .map(|r| self.race_counts.get(r).copied().unwrap_or(0).to_string()),
        );
        values.extend(
            DrinkingStage::ALL
                .iter()
                .map(|s| self.stage_counts.get(s).copied().unwrap_or(0).to_string()),
        );
        for entry in &self.sex_band_shares {
            values.extend(
                DrinkingStage::ALL
                    .iter()
                    .map(|s| entry.shares.get(s).copied().unwrap_or(0.0).to_string()),
            );
        }
        values
    }
}

// ============================================================================
// Result Sinks
// ============================================================================

/// Consumer of yearly summaries
///
/// Persistence format is entirely the sink's concern.
pub trait ResultSink {
    fn record(&mut self, summary: &YearSummary) -> Result<(), SimulationError>;
}

/// Sink that keeps every summary in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    summaries: Vec<YearSummary>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> &[YearSummary] {
        &self.summaries
    }

    pub fn into_summaries(self) -> Vec<YearSummary> {
        self.summaries
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, summary: &YearSummary) -> Result<(), SimulationError> {
        self.summaries.push(summary.clone());
        Ok(())
    }
}

// ============================================================================
// Soft Validation
// ============================================================================

/// Result of comparing one year's scaled total to its reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub year: i32,
    /// Simulated total multiplied by the population coefficient
    pub simulated: f64,
    pub reference: f64,
    pub relative_error: f64,
    pub within_tolerance: bool,
}

/// Compares scaled simulated totals against reference totals
///
/// Never fails a run: mismatches are reported, not raised.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationValidator {
    coefficient: f64,
    tolerance: f64,
    reference_totals: BTreeMap<i32, f64>,
}

impl PopulationValidator {
    pub fn new(coefficient: f64, tolerance: f64, reference_totals: BTreeMap<i32, f64>) -> Self {
        Self {
            coefficient,
            tolerance,
            reference_totals,
        }
    }

    /// Outcome for `year`, `None` when no reference exists
    pub fn check(&self, year: i32, total_population: usize) -> Option<ValidationOutcome> {
        let reference = *self.reference_totals.get(&year)?;
        let simulated = total_population as f64 * self.coefficient;
        let relative_error = if reference > 0.0 {
            (simulated - reference).abs() / reference
        } else if simulated == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        Some(ValidationOutcome {
            year,
            simulated,
            reference,
            relative_error,
            within_tolerance: relative_error < self.tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: u64, age: u32, sex: Sex, stage: DrinkingStage) -> Person {
        Person::new(id, age, sex, Race::Hispanic, stage)
    }

    #[test]
    fn test_header_has_forty_five_columns() {
        let header = YearSummary::header();
        assert_eq!(header.len(), 45);
        assert_eq!(header[6], "White");
        assert_eq!(header[10], "Abs");
        assert_eq!(header[15], "Male_18-34_Abs");
        assert_eq!(header[44], "Female_55+_Very High");
    }

    #[test]
    fn test_children_excluded_from_stage_counts() {
        let table = PersonTable::from_persons(vec![
            person(0, 10, Sex::Male, DrinkingStage::Low),
            person(1, 30, Sex::Male, DrinkingStage::Low),
            person(2, 30, Sex::Female, DrinkingStage::High),
            person(3, 60, Sex::Female, DrinkingStage::High).into_immigrant(),
        ]);
        let summary = YearSummary::from_table(2003, &table);

        assert_eq!(summary.child_count, 1);
        assert_eq!(summary.adult_count, 3);
        assert_eq!(summary.stage_counts[&DrinkingStage::Low], 1);
        assert_eq!(summary.stage_counts[&DrinkingStage::High], 2);
        assert_eq!(summary.male_proportion, 0.5);
        assert_eq!(summary.immigration_proportion, 0.25);
        assert_eq!(summary.race_counts[&Race::Hispanic], 4);
    }

    #[test]
    fn test_sex_band_shares() {
        let table = PersonTable::from_persons(vec![
            person(0, 20, Sex::Female, DrinkingStage::Low),
            person(1, 25, Sex::Female, DrinkingStage::Moderate),
            person(2, 40, Sex::Male, DrinkingStage::VeryHigh),
        ]);
        let summary = YearSummary::from_table(2003, &table);

        let female_young = &summary.sex_band_shares[3];
        assert_eq!(female_young.sex, Sex::Female);
        assert_eq!(female_young.band, AdultAgeBand::From18To34);
        assert_eq!(female_young.shares[&DrinkingStage::Low], 0.5);
        assert_eq!(female_young.shares[&DrinkingStage::Moderate], 0.5);

        let male_old = &summary.sex_band_shares[2];
        assert_eq!(male_old.shares[&DrinkingStage::Abstinent], 0.0);
        assert_eq!(summary.cross_tabs.by_sex[&Sex::Male][&DrinkingStage::VeryHigh], 1.0);
    }

    #[test]
    fn test_cross_tabs_by_sex_and_race_include_children() {
        let table = PersonTable::from_persons(vec![
            person(0, 8, Sex::Male, DrinkingStage::Abstinent),
            person(1, 30, Sex::Male, DrinkingStage::High),
            person(2, 40, Sex::Female, DrinkingStage::Low),
        ]);
        let summary = YearSummary::from_table(2003, &table);
        let tabs = &summary.cross_tabs;

        assert_eq!(tabs.by_sex[&Sex::Male][&DrinkingStage::Abstinent], 0.5);
        assert_eq!(tabs.by_sex[&Sex::Male][&DrinkingStage::High], 0.5);
        assert!((tabs.by_race[&Race::Hispanic][&DrinkingStage::Low] - 1.0 / 3.0).abs() < 1e-12);
        // Age bands start at 18
        let young = &tabs.by_age_band[&AdultAgeBand::From18To34];
        assert_eq!(young[&DrinkingStage::High], 1.0);
        assert_eq!(young[&DrinkingStage::Abstinent], 0.0);
    }

    #[test]
    fn test_validator_relative_error() {
        let mut references = BTreeMap::new();
        references.insert(2005, 1000.0);
        let validator = PopulationValidator::new(10.0, 0.01, references);

        let pass = validator.check(2005, 100).unwrap();
        assert!(pass.within_tolerance);
        let fail = validator.check(2005, 105).unwrap();
        assert!(!fail.within_tolerance);
        assert!((fail.relative_error - 0.05).abs() < 1e-12);
        assert!(validator.check(2006, 100).is_none());
    }
}
