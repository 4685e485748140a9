//! Year step orchestration
//!
//! Sequences the updaters for one simulated year in a fixed order and commits
//! the result only if every updater succeeds.

use crate::core::error::SimulationError;
use crate::models::event::Event;
use crate::models::population::PersonTable;
use crate::updaters::{
    AgingStep, BirthUpdater, DeathUpdater, DrinkingStatusUpdater, ImmigrationUpdater,
    PopulationUpdater, UnmatchedDeathPolicy, UpdateOutcome, YearContext,
};
use tracing::debug;

// ============================================================================
// Year Step Report
// ============================================================================

/// What one year step did to the population
#[derive(Debug, Clone, PartialEq)]
pub struct YearStepReport {
    /// Simulated year
    pub year: i32,

    /// Rows at the start of the year
    pub starting_population: usize,

    pub aging: UpdateOutcome,
    pub births: UpdateOutcome,
    pub immigration: UpdateOutcome,

    /// Rows present when drinking transitions ran
    pub transition_population: usize,
    pub drinking: UpdateOutcome,
    pub deaths: UpdateOutcome,

    /// Rows removed by the end-of-year filter
    pub removed: usize,

    /// Rows at the end of the year
    pub final_population: usize,
}

impl YearStepReport {
    /// Events describing this year step, in phase order
    pub fn events(&self) -> Vec<Event> {
        let year = self.year;
        vec![
            Event::Aged {
                year,
                count: self.aging.changed,
            },
            Event::Births {
                year,
                count: self.births.added,
                first_id: self.births.first_new_id,
            },
            Event::Immigration {
                year,
                count: self.immigration.added,
                first_id: self.immigration.first_new_id,
            },
            Event::DrinkingTransition {
                year,
                sampled: self.transition_population - self.drinking.unmatched,
                changed: self.drinking.changed,
                unmatched: self.drinking.unmatched,
                signatures: self.drinking.signatures,
            },
            Event::Deaths {
                year,
                count: self.removed,
                unmatched: self.deaths.unmatched,
            },
            Event::YearCompleted {
                year,
                population: self.final_population,
            },
        ]
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs one year's updaters in fixed order
///
/// 1. Aging
/// 2. Births (count from the population after aging)
/// 3. Immigration (count from the population after births)
/// 4. Drinking status transitions, including rows added this year
/// 5. Deaths (mark), then removal of every row not alive
///
/// # Atomicity
///
/// Updaters run against a working copy of the table. The caller's table is
/// replaced only when all five succeed; on error it is left exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct YearStepOrchestrator {
    aging: AgingStep,
    births: BirthUpdater,
    immigration: ImmigrationUpdater,
    drinking: DrinkingStatusUpdater,
    deaths: DeathUpdater,
}

impl YearStepOrchestrator {
    pub fn new(unmatched_death_policy: UnmatchedDeathPolicy) -> Self {
        Self {
            deaths: DeathUpdater::new(unmatched_death_policy),
            ..Default::default()
        }
    }

    /// Simulate `ctx.year` on `table`
    ///
    /// # Errors
    ///
    /// The first updater failure, wrapped in `YearAborted` naming the year and
    /// component. `table` is unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use aud_simulator_core_rs::lookups::{LookupRecords, LookupRepository};
    /// use aud_simulator_core_rs::models::{DrinkingStage, Person, PersonTable, Race, Sex};
    /// use aud_simulator_core_rs::rng::RandomStreamAllocator;
    /// use aud_simulator_core_rs::updaters::YearContext;
    /// use aud_simulator_core_rs::YearStepOrchestrator;
    ///
    /// # let records: LookupRecords = serde_json::from_str(r#"{
    /// #     "birth_rates": [{"year": 2001, "rate": 0.1}],
    /// #     "birth_male_ratios": [{"year": 2001, "rate": 0.5}],
    /// #     "birth_races": [
    /// #         {"year": 2001, "sex": "Male", "race": "White", "proportion": 1.0},
    /// #         {"year": 2001, "sex": "Female", "race": "White", "proportion": 1.0}
    /// #     ],
    /// #     "immigration_rates": [{"year": 2001, "rate": 0.0}],
    /// #     "immigration_ages": [{"year": 2001, "age": 25, "proportion": 1.0}],
    /// #     "death_rates": [{"year": 2001, "sex": "Female", "race": "White", "age": 31, "rate": 0.0}],
    /// #     "initial_drinking": [
    /// #         {"age_group": "18-34", "sex": "Female", "race": "White", "stage": "Low", "proportion": 1.0}
    /// #     ],
    /// #     "initial_population": {
    /// #         "ages": [{"age": 30, "proportion": 1.0}],
    /// #         "sex": [{"age": 30, "male_ratio": 0.0}],
    /// #         "races": [
    /// #             {"age_group": "30 to 34 years", "sex": "Female", "race": "White", "proportion": 1.0}
    /// #         ]
    /// #     }
    /// # }"#)?;
    /// let lookups = LookupRepository::from_records(&records)?;
    /// let mut table = PersonTable::from_persons(
    ///     (0..10)
    ///         .map(|id| Person::new(id, 30, Sex::Female, Race::White, DrinkingStage::Low))
    ///         .collect(),
    /// );
    ///
    /// let ctx = YearContext {
    ///     year: 2001,
    ///     initial_year: 2000,
    ///     lookups: &lookups,
    ///     streams: RandomStreamAllocator::new(42),
    /// };
    /// let report = YearStepOrchestrator::default().step(&mut table, &ctx)?;
    ///
    /// assert_eq!(report.births.added, 1);
    /// assert_eq!(report.final_population, 11);
    /// assert_eq!(table.iter().filter(|p| p.age() == 31).count(), 10);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn step(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<YearStepReport, SimulationError> {
        let mut working = table.clone();
        let starting_population = working.len();

        // STEP 1: AGING
        let aging = Self::run(&self.aging, &mut working, ctx)?;

        // STEP 2: BIRTHS
        let births = Self::run(&self.births, &mut working, ctx)?;

        // STEP 3: IMMIGRATION
        let immigration = Self::run(&self.immigration, &mut working, ctx)?;

        // STEP 4: DRINKING STATUS
        let transition_population = working.len();
        let drinking = Self::run(&self.drinking, &mut working, ctx)?;

        // STEP 5: DEATHS, then filter
        let deaths = Self::run(&self.deaths, &mut working, ctx)?;
        let removed = working.retain_alive();

        let report = YearStepReport {
            year: ctx.year,
            starting_population,
            aging,
            births,
            immigration,
            transition_population,
            drinking,
            deaths,
            removed,
            final_population: working.len(),
        };
        *table = working;

        debug!(
            year = report.year,
            start = report.starting_population,
            births = report.births.added,
            immigrants = report.immigration.added,
            deaths = report.removed,
            end = report.final_population,
            "year step committed"
        );
        Ok(report)
    }

    fn run(
        updater: &dyn PopulationUpdater,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError> {
        updater
            .apply(table, ctx)
            .map_err(|err| err.in_year(ctx.year, updater.component()))
    }
}
