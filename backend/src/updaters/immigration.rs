//! Immigration updater
//!
//! Immigrant ages come from one shared stream per year. Everything else about
//! an immigrant is drawn from that immigrant's own stream, keyed by the ID the
//! table allocates to them: sex, then race, then drinking stage.
//!
//! The drinking stage uses the same [`InitialDrinkingDistributionTable`] (and
//! so the same detected age scheme) as the initial population.
//!
//! [`InitialDrinkingDistributionTable`]: crate::lookups::InitialDrinkingDistributionTable

use super::{scaled_count, PopulationUpdater, UpdateOutcome, YearContext};
use crate::core::error::{Component, SimulationError};
use crate::models::age_group::CensusAgeGroup;
use crate::models::person::{Composite, Person, Sex};
use crate::models::population::PersonTable;
use crate::rng::{PopulationStream, StreamKey};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImmigrationUpdater;

impl ImmigrationUpdater {
    fn build_immigrant(
        &self,
        id: u64,
        age: u32,
        ctx: &YearContext<'_>,
    ) -> Result<Person, SimulationError> {
        let lookups = ctx.lookups;
        let mut rng = ctx.streams.stream(StreamKey::Person(id));

        let sex = if rng.bernoulli(lookups.immigration_male_ratio(ctx.year, age)?) {
            Sex::Male
        } else {
            Sex::Female
        };
        let group = CensusAgeGroup::from_age(age)?;
        let race = lookups.immigration_race(ctx.year, sex, group)?.sample(&mut rng);
        let stage = lookups
            .initial_drinking()
            .distribution_for(age, Composite::new(sex, race))?
            .sample(&mut rng);

        Ok(Person::new(id, age, sex, race, stage).into_immigrant())
    }
}

impl PopulationUpdater for ImmigrationUpdater {
    fn component(&self) -> Component {
        Component::Immigration
    }

    /// Append `round(|table| * immigration_rate[year])` immigrants
    ///
    /// Immigrants are fully built before any is appended; a missing lookup for
    /// any sampled age, sex or race leaves the table untouched.
    fn apply(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError> {
        let rate = ctx.lookups.immigration_rate(ctx.year)?;
        let ages = ctx.lookups.immigration_ages(ctx.year)?;

        let count = scaled_count(table.len(), rate);
        if count == 0 {
            debug!(year = ctx.year, immigrants = 0, "immigration applied");
            return Ok(UpdateOutcome::default());
        }

        let mut age_rng = ctx.streams.stream(StreamKey::Population {
            purpose: PopulationStream::ImmigrantAges,
            year: ctx.year,
        });
        let sampled_ages = ages.sample_many(&mut age_rng, count);

        let first_id = table.next_id();
        let immigrants = sampled_ages
            .into_iter()
            .enumerate()
            .map(|(offset, age)| self.build_immigrant(first_id + offset as u64, age, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        table.append_new(immigrants);

        debug!(year = ctx.year, immigrants = count, first_id, "immigration applied");
        Ok(UpdateOutcome {
            added: count,
            first_new_id: Some(first_id),
            ..Default::default()
        })
    }
}
