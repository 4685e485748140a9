//! Aging step

use super::{PopulationUpdater, UpdateOutcome, YearContext};
use crate::core::error::{Component, SimulationError};
use crate::models::person::MAX_AGE;
use crate::models::population::PersonTable;
use tracing::debug;

/// Adds one year to every living person, clamped at [`MAX_AGE`]
///
/// No randomness. `changed` counts persons whose age actually moved, so people
/// already at the cap are not counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgingStep;

impl PopulationUpdater for AgingStep {
    fn component(&self) -> Component {
        Component::Aging
    }

    fn apply(
        &self,
        table: &mut PersonTable,
        ctx: &YearContext<'_>,
    ) -> Result<UpdateOutcome, SimulationError> {
        let mut changed = 0;
        for person in table.iter_mut().filter(|p| p.is_alive()) {
            if person.age() < MAX_AGE {
                changed += 1;
            }
            person.advance_age();
        }

        debug!(year = ctx.year, aged = changed, "aging applied");
        Ok(UpdateOutcome {
            changed,
            ..Default::default()
        })
    }
}
