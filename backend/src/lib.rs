//! AUD Simulator Core - Rust Engine
//!
//! Agent-based demographic microsimulation of drinking behavior, advancing a
//! synthetic population one year at a time with deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Calendar, transition periods and the error taxonomy
//! - **rng**: Deterministic keyed random streams
//! - **models**: Domain types (Person, PersonTable, age groups, events)
//! - **lookups**: Immutable probability tables consumed by every updater
//! - **initialization**: Snapshot-year population construction
//! - **updaters**: Aging, births, immigration, drinking transitions, deaths
//! - **orchestrator**: Year step, multi-year runner and yearly summaries
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (seed + key → stream)
//! 2. Person IDs are unique for the whole run and never reused
//! 3. A failing year commits nothing

// Module declarations
pub mod core;
pub mod initialization;
pub mod lookups;
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod updaters;

// Re-exports for convenience
pub use crate::core::{Component, SimulationCalendar, SimulationError, TransitionPeriod};
pub use initialization::{InitialPopulationBuilder, InitialPopulationInputs};
pub use lookups::{LookupRecords, LookupRepository};
pub use models::{
    event::{Event, EventLog},
    person::{Composite, DrinkingStage, Person, Race, Sex},
    population::PersonTable,
};
pub use orchestrator::{
    MemorySink, ResultSink, RunConfig, RunReport, SimulationRunner, YearStepOrchestrator,
    YearStepReport, YearSummary,
};
pub use rng::{RandomStreamAllocator, RngManager, StreamKey};
pub use updaters::UnmatchedDeathPolicy;
