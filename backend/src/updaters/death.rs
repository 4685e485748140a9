//! Death updater
//!
//! Rows are left-joined to the year's death probabilities on (composite, age).
//! One shared stream per year supplies exactly one uniform draw per row, in
//! row order, whether or not the row matched. A row stays alive iff it was
//! alive and its draw is at least its probability.
//!
//! Rows are only marked here. Removal happens once the whole year step has run.

use super::{PopulationUpdater, UpdateOutcome, YearContext};
use crate::core::error::{Component, SimulationError};
use crate::models::population::PersonTable;
use crate::rng::{PopulationStream, StreamKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a row whose (composite, age) has no death probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedDeathPolicy {
    /// The row survives the year
    #[default]
    Survive,
    /// The year fails with `LookupMiss`
    Fail,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeathUpdater {
    policy: UnmatchedDeathPolicy,
}

impl DeathUpdater {
    pub fn new(policy: UnmatchedDeathPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnmatchedDeathPolicy {
        self.policy
    }
}

impl PopulationUpdater for DeathUpdater {
    fn component(&self) -> Component {
        Component::Deaths
    }

    fn apply(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError> {
        let rates = ctx.lookups.death_rates(ctx.year)?;
        let probabilities = table.left_join(|person| rates.get(person.composite(), person.age()));

        if self.policy == UnmatchedDeathPolicy::Fail {
            if let Some(index) = probabilities.iter().position(Option::is_none) {
                let person = &table.persons()[index];
                return Err(SimulationError::lookup_miss(
                    "death_rates",
                    (ctx.year, person.composite(), person.age()),
                ));
            }
        }

        let mut rng = ctx.streams.stream(StreamKey::Population {
            purpose: PopulationStream::Deaths,
            year: ctx.year,
        });

        let mut marked_dead = 0;
        let mut unmatched = 0;
        for (person, probability) in table.iter_mut().zip(probabilities) {
            let draw = rng.next_f64();
            match probability {
                Some(p) if person.is_alive() && draw < p => {
                    person.mark_dead();
                    marked_dead += 1;
                }
                Some(_) => {}
                None => unmatched += 1,
            }
        }

        debug!(year = ctx.year, deaths = marked_dead, unmatched, "deaths marked");
        Ok(UpdateOutcome {
            marked_dead,
            unmatched,
            ..Default::default()
        })
    }
}
