//! Drinking-status updater
//!
//! Each row is joined on (transition age group, composite, current stage) for
//! the year's [`TransitionPeriod`] to find its outgoing distribution. Rows
//! without a match keep their stage.
//!
//! Sampling is batched by distribution signature: every row whose outgoing
//! distribution is bitwise identical shares one stream,
//! `stream(Signature(fingerprint))`, and takes its own draw from it in row
//! order. Streams are independent across signatures, not across rows sharing a
//! signature.

use super::{PopulationUpdater, UpdateOutcome, YearContext};
use crate::core::calendar::TransitionPeriod;
use crate::core::error::{Component, SimulationError};
use crate::lookups::{Distribution, DistributionSignature, TransitionKey};
use crate::models::age_group::TransitionAgeGroup;
use crate::models::person::DrinkingStage;
use crate::models::population::PersonTable;
use crate::rng::StreamKey;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct DrinkingStatusUpdater;

type SignatureGroups<'a> =
    BTreeMap<DistributionSignature<DrinkingStage>, (&'a Distribution<DrinkingStage>, Vec<usize>)>;

impl PopulationUpdater for DrinkingStatusUpdater {
    fn component(&self) -> Component {
        Component::DrinkingStatus
    }

    fn apply(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError> {
        let period = TransitionPeriod::for_year(ctx.year, ctx.initial_year)?;
        let transitions = ctx.lookups.drinking_transitions();

        let by_key = table.group_indices_by(|person| TransitionKey {
            period,
            age_group: TransitionAgeGroup::from_age(person.age()),
            composite: person.composite(),
            stage: person.drinking_stage(),
        });

        let mut groups: SignatureGroups<'_> = BTreeMap::new();
        let mut unmatched = 0;
        for (key, rows) in by_key {
            match transitions.get(&key) {
                Some(dist) => groups
                    .entry(dist.signature())
                    .or_insert_with(|| (dist, Vec::new()))
                    .1
                    .extend(rows),
                None => unmatched += rows.len(),
            }
        }

        let signatures = groups.len();
        let mut sampled = 0;
        let mut changed = 0;
        for (signature, (dist, mut rows)) in groups {
            rows.sort_unstable();
            let mut rng = ctx
                .streams
                .stream(StreamKey::Signature(signature.fingerprint()));
            let draws = dist.sample_many(&mut rng, rows.len());
            for (row, stage) in rows.into_iter().zip(draws) {
                if let Some(person) = table.get_mut(row) {
                    if person.drinking_stage() != stage {
                        changed += 1;
                    }
                    person.set_drinking_stage(stage);
                    sampled += 1;
                }
            }
        }

        debug!(
            year = ctx.year,
            period = %period,
            sampled,
            changed,
            unmatched,
            signatures,
            "drinking transitions applied"
        );
        Ok(UpdateOutcome {
            changed,
            unmatched,
            signatures,
            ..Default::default()
        })
    }
}
