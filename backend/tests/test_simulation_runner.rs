//! Simulation runner integration tests
//!
//! End-to-end runs over the fixture lookups: snapshot emission, reporting
//! window, soft validation, fail-fast behavior and run determinism.

mod common;

use std::collections::BTreeMap;

use aud_simulator_core_rs::lookups::{InitialAgeRecord, LookupRepository};
use aud_simulator_core_rs::orchestrator::ResultSink;
use aud_simulator_core_rs::{
    Component, MemorySink, RunConfig, SimulationError, SimulationRunner, YearSummary,
};
use common::{Rates, INITIAL_YEAR};

fn config(seed: u64, end_year: i32, size: usize) -> RunConfig {
    RunConfig::new(seed, INITIAL_YEAR, end_year, size)
}

fn run(config: RunConfig, lookups: &LookupRepository) -> Vec<YearSummary> {
    let mut sink = MemorySink::new();
    SimulationRunner::new(config, lookups)
        .unwrap()
        .run(&mut sink)
        .unwrap();
    sink.into_summaries()
}

fn years(summaries: &[YearSummary]) -> Vec<i32> {
    summaries.iter().map(|s| s.year).collect()
}

/// Sink that refuses every summary
struct BrokenSink;

impl ResultSink for BrokenSink {
    fn record(&mut self, _summary: &YearSummary) -> Result<(), SimulationError> {
        Err(SimulationError::Sink("disk full".to_string()))
    }
}

#[test]
fn test_full_run_emits_every_year() {
    let lookups = Rates::default().lookups();
    let mut sink = MemorySink::new();

    let report = SimulationRunner::new(config(42, 2010, 2000), &lookups)
        .unwrap()
        .run(&mut sink)
        .unwrap();

    assert_eq!(years(sink.summaries()), (2000..=2010).collect::<Vec<_>>());
    assert_eq!(sink.summaries()[0].total_population, 2000);
    assert_eq!(report.final_year, 2010);
    assert_eq!(report.years_simulated, 10);
    assert_eq!(report.summaries_emitted, 11);
    assert_eq!(
        sink.summaries().last().unwrap().total_population,
        report.final_population
    );
}

#[test]
fn test_snapshot_only_run() {
    let lookups = Rates::default().lookups();
    let summaries = run(config(1, INITIAL_YEAR, 300), &lookups);
    assert_eq!(years(&summaries), vec![INITIAL_YEAR]);
    assert_eq!(summaries[0].total_population, 300);
}

#[test]
fn test_output_window_limits_yearly_summaries() {
    let lookups = Rates::default().lookups();
    let mut config = config(7, 2010, 500);
    config.output_start_year = 2005;
    config.output_end_year = 2007;

    let summaries = run(config, &lookups);

    // Snapshot year is always reported
    assert_eq!(years(&summaries), vec![2000, 2005, 2006, 2007]);
}

#[test]
fn test_same_seed_same_summaries() {
    let lookups = Rates::default().lookups();
    let a = run(config(2024, 2008, 1500), &lookups);
    let b = run(config(2024, 2008, 1500), &lookups);
    assert_eq!(a, b);
}

#[test]
fn test_different_seed_different_summaries() {
    let lookups = Rates::default().lookups();
    let a = run(config(1, 2008, 1500), &lookups);
    let b = run(config(2, 2008, 1500), &lookups);
    assert_ne!(a, b);
}

#[test]
fn test_population_with_no_events_is_stable() {
    let lookups = Rates::null_op().lookups();
    let summaries = run(config(3, 2005, 400), &lookups);
    assert!(summaries.iter().all(|s| s.total_population == 400));
    assert!(summaries.iter().all(|s| s.immigration_proportion == 0.0));
}

#[test]
fn test_validation_is_soft() {
    let lookups = Rates::null_op().lookups();
    let mut config = config(3, 2005, 400);
    config.population_coefficient = 10.0;
    config.reference_totals = BTreeMap::from([(2000, 4000.0), (2003, 8000.0)]);

    let mut sink = MemorySink::new();
    let report = SimulationRunner::new(config, &lookups)
        .unwrap()
        .run(&mut sink)
        .unwrap();

    assert_eq!(report.validations.len(), 2);
    let first = &report.validations[0];
    assert_eq!(first.year, 2000);
    assert_eq!(first.simulated, 4000.0);
    assert!(first.within_tolerance);

    let second = &report.validations[1];
    assert_eq!(second.year, 2003);
    assert_eq!(second.relative_error, 0.5);
    assert!(!second.within_tolerance);

    assert_eq!(sink.len(), 6, "a failed validation does not stop the run");
    assert_eq!(
        report.events.events_of_type("ValidationChecked").len(),
        2
    );
}

#[test]
fn test_missing_year_aborts_run_after_prior_summaries() {
    let mut records = Rates::default().records();
    records.birth_rates.retain(|r| r.year != 2004);
    let lookups = LookupRepository::from_records(&records).unwrap();
    let mut sink = MemorySink::new();

    let err = SimulationRunner::new(config(9, 2010, 800), &lookups)
        .unwrap()
        .run(&mut sink)
        .unwrap_err();

    assert!(matches!(
        err,
        SimulationError::YearAborted {
            year: 2004,
            component: Component::Births,
            ..
        }
    ));
    assert_eq!(years(sink.summaries()), vec![2000, 2001, 2002, 2003]);
}

#[test]
fn test_advance_year_steps_one_year_at_a_time() {
    let lookups = Rates::default().lookups();
    let mut runner = SimulationRunner::new(config(5, 2003, 600), &lookups).unwrap();
    let mut sink = MemorySink::new();

    let mut stepped = Vec::new();
    while let Some(report) = runner.advance_year(&mut sink).unwrap() {
        assert_eq!(report.final_population, runner.population().len());
        stepped.push(report.year);
    }

    assert_eq!(stepped, vec![2001, 2002, 2003]);
    assert!(runner.calendar().is_finished());
    assert_eq!(years(sink.summaries()), vec![2000, 2001, 2002, 2003]);

    // Snapshot is not emitted twice
    runner.emit_snapshot(&mut sink).unwrap();
    assert_eq!(sink.len(), 4);
}

#[test]
fn test_event_log_records_run() {
    let lookups = Rates::default().lookups();
    let config = config(11, 2004, 700);
    let expected_hash = config.config_hash().unwrap();

    let report = SimulationRunner::new(config, &lookups)
        .unwrap()
        .run(&mut MemorySink::new())
        .unwrap();

    let events = report.events.events();
    assert_eq!(events[0].event_type(), "PopulationInitialized");
    assert_eq!(report.events.events_of_type("YearCompleted").len(), 4);
    assert_eq!(report.events.events_of_type("SummaryEmitted").len(), 5);
    assert_eq!(report.events.events_for_year(2002).len(), 7);
    assert_eq!(report.config_hash, expected_hash);
    assert_eq!(report.config_hash.len(), 64);
}

#[test]
fn test_invalid_config_rejected() {
    let lookups = Rates::default().lookups();
    let err = SimulationRunner::new(RunConfig::new(1, 2005, 2000, 10), &lookups)
        .err()
        .unwrap();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_initialization_failure_attributed() {
    let mut records = Rates::default().records();
    records.initial_population.ages = vec![InitialAgeRecord {
        age: 120,
        proportion: 1.0,
    }];
    let lookups = LookupRepository::from_records(&records).unwrap();

    let err = SimulationRunner::new(config(1, 2005, 10), &lookups)
        .err()
        .unwrap();

    assert!(matches!(
        err,
        SimulationError::YearAborted {
            year: INITIAL_YEAR,
            component: Component::Initialization,
            ..
        }
    ));
    assert!(matches!(
        err.root_cause(),
        SimulationError::InvalidAge { age: 120, .. }
    ));
}

#[test]
fn test_sink_failure_aborts_run() {
    let lookups = Rates::default().lookups();
    let err = SimulationRunner::new(config(1, 2005, 100), &lookups)
        .unwrap()
        .run(&mut BrokenSink)
        .unwrap_err();

    assert!(matches!(
        err,
        SimulationError::YearAborted {
            year: INITIAL_YEAR,
            component: Component::Summary,
            ..
        }
    ));
}

#[test]
fn test_scenario_config_deserializes_with_defaults() {
    let json = r#"{
        "seed": 42,
        "initial_year": 2000,
        "end_year": 2010,
        "output_start_year": 2000,
        "output_end_year": 2010,
        "initial_population": 1000
    }"#;
    let config: RunConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config, RunConfig::new(42, 2000, 2010, 1000));
}
