//! Life-event updaters
//!
//! Each updater is one transformation of the population table for one year:
//!
//! 1. **AgingStep**: every living person ages one year (clamped at 100)
//! 2. **BirthUpdater**: appends newborns
//! 3. **ImmigrationUpdater**: appends immigrants
//! 4. **DrinkingStatusUpdater**: samples each person's next drinking stage
//! 5. **DeathUpdater**: marks rows dead (removal happens after the whole year)
//!
//! The year step runs them in exactly that order; see
//! [`YearStepOrchestrator`](crate::orchestrator::YearStepOrchestrator).
//!
//! # Updater Interface
//!
//! All updaters implement the `PopulationUpdater` trait:
//! ```rust
//! use aud_simulator_core_rs::models::PersonTable;
//! use aud_simulator_core_rs::updaters::{PopulationUpdater, UpdateOutcome, YearContext};
//! use aud_simulator_core_rs::{Component, SimulationError};
//!
//! struct NoOp;
//!
//! impl PopulationUpdater for NoOp {
//!     fn component(&self) -> Component {
//!         Component::Aging
//!     }
//!
//!     fn apply(
//!         &self,
//!         _table: &mut PersonTable,
//!         _ctx: &YearContext<'_>,
//!     ) -> Result<UpdateOutcome, SimulationError> {
//!         Ok(UpdateOutcome::default())
//!     }
//! }
//! ```
//!
//! # Randomness
//!
//! Updaters never hold generators. They ask the context's
//! [`RandomStreamAllocator`] for a stream keyed by person ID, distribution
//! signature, or (purpose, year) for the few population-level draws.

use crate::core::error::{Component, SimulationError};
use crate::lookups::LookupRepository;
use crate::models::population::PersonTable;
use crate::rng::RandomStreamAllocator;

pub mod aging;
pub mod birth;
pub mod death;
pub mod drinking;
pub mod immigration;

pub use aging::AgingStep;
pub use birth::BirthUpdater;
pub use death::{DeathUpdater, UnmatchedDeathPolicy};
pub use drinking::DrinkingStatusUpdater;
pub use immigration::ImmigrationUpdater;

/// Read-only inputs shared by every updater in one year step
#[derive(Debug, Clone, Copy)]
pub struct YearContext<'a> {
    /// Year being simulated
    pub year: i32,
    /// Snapshot year of the initial population
    pub initial_year: i32,
    pub lookups: &'a LookupRepository,
    pub streams: RandomStreamAllocator,
}

/// What one updater did to the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Rows appended
    pub added: usize,
    /// Rows whose fields changed
    pub changed: usize,
    /// Rows with no matching lookup entry, left as they were
    pub unmatched: usize,
    /// Rows newly marked not alive
    pub marked_dead: usize,
    /// ID of the first appended row
    pub first_new_id: Option<u64>,
    /// Distinct outgoing distributions sampled
    pub signatures: usize,
}

/// One transformation of the population table for one year
pub trait PopulationUpdater {
    /// Component named in errors raised by this updater
    fn component(&self) -> Component;

    /// Apply this updater to `table` for `ctx.year`
    ///
    /// # Errors
    ///
    /// Any error aborts the year; the caller discards the partially updated table.
    fn apply(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError>;
}

/// `round(population * rate)`, ties to even, never negative
pub(crate) fn scaled_count(population: usize, rate: f64) -> usize {
    let count = (population as f64 * rate).round_ties_even();
    if count > 0.0 {
        count as usize
    } else {
        0
    }
}
