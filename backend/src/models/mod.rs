//! Domain models for the population simulator

pub mod age_group;
pub mod event;
pub mod person;
pub mod population;

// Re-exports
pub use age_group::{CensusAgeGroup, DrinkingAgeGroup, DrinkingAgeScheme, TransitionAgeGroup};
pub use event::{Event, EventLog};
pub use person::{
    CategoryCode, Composite, DrinkingStage, Person, Race, Sex, ADULT_AGE, MAX_AGE,
};
pub use population::PersonTable;
