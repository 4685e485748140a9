//! Multi-year simulation driver
//!
//! Builds the initial population, emits the snapshot-year summary, then runs
//! one year step per year up to the end year. Summaries for years inside the
//! reporting window go to the [`ResultSink`]; every year with a reference
//! total is soft-validated.
//!
//! # Critical Invariants
//!
//! - **Determinism**: same config + same lookups produce identical summaries
//! - **Fail Fast**: any updater error aborts the run; summaries already handed
//!   to the sink remain valid, nothing after the failing year is emitted
//! - **Config Identity**: the SHA-256 of the canonical config JSON is logged at
//!   start and stamped on the [`RunReport`]

use crate::core::calendar::SimulationCalendar;
use crate::core::error::{Component, SimulationError};
use crate::initialization::InitialPopulationBuilder;
use crate::lookups::LookupRepository;
use crate::models::event::{Event, EventLog};
use crate::models::population::PersonTable;
use crate::orchestrator::engine::{YearStepOrchestrator, YearStepReport};
use crate::orchestrator::summary::{
    PopulationValidator, ResultSink, ValidationOutcome, YearSummary,
};
use crate::rng::RandomStreamAllocator;
use crate::updaters::{UnmatchedDeathPolicy, YearContext};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{info, warn};

// ============================================================================
// Configuration
// ============================================================================

fn default_coefficient() -> f64 {
    1.0
}

fn default_tolerance() -> f64 {
    0.01
}

/// Run configuration, immutable for the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Experiment seed for every random stream
    pub seed: u64,

    /// Snapshot year of the initial population
    pub initial_year: i32,

    /// Last simulated year (inclusive)
    pub end_year: i32,

    /// First year whose summary goes to the sink
    pub output_start_year: i32,

    /// Last year whose summary goes to the sink
    pub output_end_year: i32,

    /// Size of the initial population
    pub initial_population: usize,

    /// Multiplier from simulated to real population, for validation
    #[serde(default = "default_coefficient")]
    pub population_coefficient: f64,

    /// Known real totals by year
    #[serde(default)]
    pub reference_totals: BTreeMap<i32, f64>,

    /// Relative error below which a validation passes
    #[serde(default = "default_tolerance")]
    pub validation_tolerance: f64,

    #[serde(default)]
    pub unmatched_death_policy: UnmatchedDeathPolicy,
}

impl RunConfig {
    /// Config with defaults for every optional field
    pub fn new(seed: u64, initial_year: i32, end_year: i32, initial_population: usize) -> Self {
        Self {
            seed,
            initial_year,
            end_year,
            output_start_year: initial_year,
            output_end_year: end_year,
            initial_population,
            population_coefficient: default_coefficient(),
            reference_totals: BTreeMap::new(),
            validation_tolerance: default_tolerance(),
            unmatched_death_policy: UnmatchedDeathPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.end_year < self.initial_year {
            return Err(SimulationError::InvalidConfig(format!(
                "end_year {} precedes initial_year {}",
                self.end_year, self.initial_year
            )));
        }
        if self.output_end_year < self.output_start_year {
            return Err(SimulationError::InvalidConfig(format!(
                "output window {}..={} is reversed",
                self.output_start_year, self.output_end_year
            )));
        }
        if self.initial_population == 0 {
            return Err(SimulationError::InvalidConfig(
                "initial_population must be positive".to_string(),
            ));
        }
        if !(self.population_coefficient.is_finite() && self.population_coefficient > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "population_coefficient {} must be a positive number",
                self.population_coefficient
            )));
        }
        if !(self.validation_tolerance.is_finite() && self.validation_tolerance > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "validation_tolerance {} must be a positive number",
                self.validation_tolerance
            )));
        }
        Ok(())
    }

    /// Whether `year`'s summary goes to the sink
    pub fn in_output_window(&self, year: i32) -> bool {
        (self.output_start_year..=self.output_end_year).contains(&year)
    }

    /// SHA-256 of the canonical (sorted-key) JSON encoding
    pub fn config_hash(&self) -> Result<String, SimulationError> {
        use serde_json::Value;

        let value = serde_json::to_value(self).map_err(|e| {
            SimulationError::InvalidConfig(format!("config serialization failed: {}", e))
        })?;

        // Recursively sort all object keys
        fn canonicalize(value: Value) -> Value {
            match value {
                Value::Object(map) => {
                    let sorted: BTreeMap<String, Value> =
                        map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                    Value::Object(sorted.into_iter().collect())
                }
                Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
                other => other,
            }
        }

        let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
            SimulationError::InvalidConfig(format!("config serialization failed: {}", e))
        })?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub config_hash: String,
    pub final_year: i32,
    pub final_population: usize,
    pub years_simulated: usize,
    pub summaries_emitted: usize,
    pub validations: Vec<ValidationOutcome>,
    pub events: EventLog,
}

// ============================================================================
// Runner
// ============================================================================

/// Multi-year driver
///
/// # Example
///
/// ```rust
/// use aud_simulator_core_rs::lookups::{LookupRecords, LookupRepository};
/// use aud_simulator_core_rs::{MemorySink, RunConfig, SimulationRunner};
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
/// #     "death_rates": [{"year": 2001, "sex": "Male", "race": "White", "age": 31, "rate": 0.0}],
/// #     "initial_drinking": [
/// #         {"age_group": "18-34", "sex": "Male", "race": "White", "stage": "Low", "proportion": 1.0},
/// #         {"age_group": "18-34", "sex": "Female", "race": "White", "stage": "Abs", "proportion": 1.0}
/// #     ],
/// #     "initial_population": {
/// #         "ages": [{"age": 30, "proportion": 1.0}],
/// #         "sex": [{"age": 30, "male_ratio": 0.5}],
/// #         "races": [
/// #             {"age_group": "30 to 34 years", "sex": "Male", "race": "White", "proportion": 1.0},
/// #             {"age_group": "30 to 34 years", "sex": "Female", "race": "White", "proportion": 1.0}
/// #         ]
/// #     }
/// # }"#)?;
/// let lookups = LookupRepository::from_records(&records)?;
/// let runner = SimulationRunner::new(RunConfig::new(42, 2000, 2001, 100), &lookups)?;
///
/// let mut sink = MemorySink::new();
/// let report = runner.run(&mut sink)?;
/// assert_eq!(sink.len(), 2);
/// assert_eq!(report.final_population, 110);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SimulationRunner<'a> {
    config: RunConfig,
    config_hash: String,
    lookups: &'a LookupRepository,
    streams: RandomStreamAllocator,
    calendar: SimulationCalendar,
    population: PersonTable,
    orchestrator: YearStepOrchestrator,
    validator: PopulationValidator,
    event_log: EventLog,
    validations: Vec<ValidationOutcome>,
    summaries_emitted: usize,
    snapshot_emitted: bool,
}

impl<'a> SimulationRunner<'a> {
    /// Validate config and build the initial population
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the config is inconsistent
    /// - any initialization failure, wrapped in `YearAborted` for the
    ///   snapshot year and the initialization component
    pub fn new(config: RunConfig, lookups: &'a LookupRepository) -> Result<Self, SimulationError> {
        config.validate()?;
        let config_hash = config.config_hash()?;

        info!(
            seed = config.seed,
            initial_year = config.initial_year,
            end_year = config.end_year,
            initial_population = config.initial_population,
            config_hash = %config_hash,
            "simulation run starting"
        );

        if config.end_year > config.initial_year {
            for gap in lookups.coverage_gaps(config.initial_year + 1, config.end_year) {
                warn!(table = %gap.table, year = gap.year, "lookup table has no entry for year");
            }
        }

        let streams = RandomStreamAllocator::new(config.seed);
        let population = InitialPopulationBuilder::new(
            lookups.initial_population(),
            lookups.initial_drinking(),
            streams,
        )
        .build(config.initial_year, config.initial_population)
        .map_err(|e| e.in_year(config.initial_year, Component::Initialization))?;

        let mut event_log = EventLog::new();
        event_log.log(Event::PopulationInitialized {
            year: config.initial_year,
            size: population.len(),
        });

        Ok(Self {
            calendar: SimulationCalendar::new(config.initial_year, config.end_year),
            orchestrator: YearStepOrchestrator::new(config.unmatched_death_policy),
            validator: PopulationValidator::new(
                config.population_coefficient,
                config.validation_tolerance,
                config.reference_totals.clone(),
            ),
            config,
            config_hash,
            lookups,
            streams,
            population,
            event_log,
            validations: Vec::new(),
            summaries_emitted: 0,
            snapshot_emitted: false,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn population(&self) -> &PersonTable {
        &self.population
    }

    pub fn calendar(&self) -> &SimulationCalendar {
        &self.calendar
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn validations(&self) -> &[ValidationOutcome] {
        &self.validations
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Emit the snapshot-year summary, once, before any transition
    ///
    /// The snapshot year is always reported, whatever the output window.
    pub fn emit_snapshot(&mut self, sink: &mut dyn ResultSink) -> Result<(), SimulationError> {
        if self.snapshot_emitted {
            return Ok(());
        }
        let year = self.config.initial_year;
        self.report_year(year, true, sink)?;
        self.snapshot_emitted = true;
        Ok(())
    }

    /// Simulate the next year
    ///
    /// Returns `None` once the end year has been simulated. Emits the snapshot
    /// first if that has not happened yet.
    pub fn advance_year(
        &mut self,
        sink: &mut dyn ResultSink,
    ) -> Result<Option<YearStepReport>, SimulationError> {
        self.emit_snapshot(sink)?;
        if self.calendar.is_finished() {
            return Ok(None);
        }

        let year = self.calendar.next_year();
        let ctx = YearContext {
            year,
            initial_year: self.config.initial_year,
            lookups: self.lookups,
            streams: self.streams,
        };
        let report = self.orchestrator.step(&mut self.population, &ctx)?;
        self.calendar.advance_year();
        for event in report.events() {
            self.event_log.log(event);
        }

        info!(year, population = report.final_population, "year completed");
        let in_window = self.config.in_output_window(year);
        self.report_year(year, in_window, sink)?;
        Ok(Some(report))
    }

    /// Run every remaining year
    pub fn run(mut self, sink: &mut dyn ResultSink) -> Result<RunReport, SimulationError> {
        self.emit_snapshot(sink)?;
        while self.advance_year(sink)?.is_some() {}

        info!(
            final_year = self.calendar.current_year(),
            population = self.population.len(),
            summaries = self.summaries_emitted,
            "simulation run finished"
        );
        Ok(RunReport {
            config_hash: self.config_hash,
            final_year: self.calendar.current_year(),
            final_population: self.population.len(),
            years_simulated: self.calendar.years_since_start() as usize,
            summaries_emitted: self.summaries_emitted,
            validations: self.validations,
            events: self.event_log,
        })
    }

    fn report_year(
        &mut self,
        year: i32,
        emit: bool,
        sink: &mut dyn ResultSink,
    ) -> Result<(), SimulationError> {
        if emit {
            let summary = YearSummary::from_table(year, &self.population);
            sink.record(&summary)
                .map_err(|e| e.in_year(year, Component::Summary))?;
            self.summaries_emitted += 1;
            self.event_log.log(Event::SummaryEmitted {
                year,
                total: summary.total_population,
            });
            info!(year, total = summary.total_population, "summary emitted");
        }

        if let Some(outcome) = self.validator.check(year, self.population.len()) {
            if outcome.within_tolerance {
                info!(
                    year,
                    simulated = outcome.simulated,
                    reference = outcome.reference,
                    "population matches reference total"
                );
            } else {
                warn!(
                    year,
                    simulated = outcome.simulated,
                    reference = outcome.reference,
                    relative_error = outcome.relative_error,
                    "population differs from reference total"
                );
            }
            self.event_log.log(Event::ValidationChecked {
                year,
                simulated: outcome.simulated,
                reference: outcome.reference,
                relative_error: outcome.relative_error,
                within_tolerance: outcome.within_tolerance,
            });
            self.validations.push(outcome);
        }
        Ok(())
    }
}
