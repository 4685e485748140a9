//! Orchestrator - year step and multi-year run loop
//!
//! - `engine.rs`: one year's fixed-order updater sequence
//! - `runner.rs`: initial population, year loop, summaries, validation
//! - `summary.rs`: yearly summary record, result sinks, soft validation

pub mod engine;
pub mod runner;
pub mod summary;

// Re-export main types for convenience
pub use engine::{YearStepOrchestrator, YearStepReport};
pub use runner::{RunConfig, RunReport, SimulationRunner};
pub use summary::{
    AdultAgeBand, DrinkingCrossTabs, MemorySink, PopulationValidator, ResultSink, SexBandShares,
    StageShares, ValidationOutcome, YearSummary,
};
