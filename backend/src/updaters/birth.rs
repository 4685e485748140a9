//! Birth updater
//!
//! Newborns are drawn at population level: individuals do not exist yet, so
//! one shared stream per year supplies every draw, in this order:
//!
//! 1. one sex per newborn
//! 2. one race per male newborn, from the male under-5 race distribution
//! 3. one race per female newborn, from the female under-5 race distribution

use super::{scaled_count, PopulationUpdater, UpdateOutcome, YearContext};
use crate::core::error::{Component, SimulationError};
use crate::models::person::{DrinkingStage, Person, Race, Sex};
use crate::models::population::PersonTable;
use crate::rng::{PopulationStream, StreamKey};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct BirthUpdater;

impl PopulationUpdater for BirthUpdater {
    fn component(&self) -> Component {
        Component::Births
    }

    /// Append `round(|table| * birth_rate[year])` newborns
    ///
    /// All three lookups are resolved before anything is appended, so a
    /// missing year leaves the table untouched.
    fn apply(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError> {
        let lookups = ctx.lookups;
        let rate = lookups.birth_rate(ctx.year)?;
        let male_ratio = lookups.birth_male_ratio(ctx.year)?;
        let male_races = lookups.birth_race(ctx.year, Sex::Male)?;
        let female_races = lookups.birth_race(ctx.year, Sex::Female)?;

        let count = scaled_count(table.len(), rate);
        if count == 0 {
            debug!(year = ctx.year, births = 0, "births applied");
            return Ok(UpdateOutcome::default());
        }

        let mut rng = ctx.streams.stream(StreamKey::Population {
            purpose: PopulationStream::Births,
            year: ctx.year,
        });

        let sexes: Vec<Sex> = (0..count)
            .map(|_| {
                if rng.bernoulli(male_ratio) {
                    Sex::Male
                } else {
                    Sex::Female
                }
            })
            .collect();

        let (male_rows, female_rows): (Vec<usize>, Vec<usize>) =
            (0..count).partition(|&i| sexes[i] == Sex::Male);

        // Every slot is overwritten: the two row sets partition 0..count
        let mut races = vec![Race::White; count];
        let male_draws = male_races.sample_many(&mut rng, male_rows.len());
        for (row, race) in male_rows.into_iter().zip(male_draws) {
            races[row] = race;
        }
        let female_draws = female_races.sample_many(&mut rng, female_rows.len());
        for (row, race) in female_rows.into_iter().zip(female_draws) {
            races[row] = race;
        }

        let first_id = table.next_id();
        let newborns: Vec<Person> = sexes
            .into_iter()
            .zip(races)
            .enumerate()
            .map(|(offset, (sex, race))| {
                Person::new(first_id + offset as u64, 0, sex, race, DrinkingStage::Abstinent)
            })
            .collect();
        table.append_new(newborns);

        debug!(year = ctx.year, births = count, first_id, "births applied");
        Ok(UpdateOutcome {
            added: count,
            first_new_id: Some(first_id),
            ..Default::default()
        })
    }
}
