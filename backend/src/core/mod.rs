//! Core building blocks: simulated time and the error taxonomy

pub mod calendar;
pub mod error;

pub use calendar::{SimulationCalendar, TransitionPeriod};
pub use error::{Component, SimulationError};
