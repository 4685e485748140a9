//! Year management for the simulation
//!
//! The simulation operates in discrete one-year steps between an initial
//! (snapshot) year and an end year, inclusive. This module provides
//! deterministic year advancement and the coarse "years since start" periods
//! that select the drinking-transition table.

use crate::core::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Manages simulated years
///
/// The initial year is the snapshot year of the starting population; no
/// transitions are applied to it. Year steps run for `initial_year + 1 ..= end_year`.
///
/// # Example
/// ```
/// use aud_simulator_core_rs::SimulationCalendar;
///
/// let mut calendar = SimulationCalendar::new(2000, 2010);
/// assert_eq!(calendar.current_year(), 2000);
/// assert_eq!(calendar.years_since_start(), 0);
///
/// calendar.advance_year();
/// assert_eq!(calendar.current_year(), 2001);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationCalendar {
    /// Snapshot year of the initial population
    initial_year: i32,
    /// Last simulated year (inclusive)
    end_year: i32,
    /// Year most recently completed (starts at `initial_year`)
    current_year: i32,
}

impl SimulationCalendar {
    /// Create a new calendar positioned at the initial year
    ///
    /// # Panics
    /// Panics if `end_year < initial_year`
    ///
    /// # Example
    /// ```
    /// use aud_simulator_core_rs::SimulationCalendar;
    ///
    /// let calendar = SimulationCalendar::new(2000, 2000);
    /// assert!(calendar.is_finished());
    /// ```
    pub fn new(initial_year: i32, end_year: i32) -> Self {
        assert!(
            end_year >= initial_year,
            "end_year must not precede initial_year"
        );
        Self {
            initial_year,
            end_year,
            current_year: initial_year,
        }
    }

    /// Advance the calendar by one year
    pub fn advance_year(&mut self) {
        self.current_year += 1;
    }

    /// Year most recently completed
    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Year the next step will simulate
    pub fn next_year(&self) -> i32 {
        self.current_year + 1
    }

    pub fn initial_year(&self) -> i32 {
        self.initial_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    /// Whole years elapsed since the initial year
    pub fn years_since_start(&self) -> i32 {
        self.current_year - self.initial_year
    }

    /// Number of year steps still to run
    ///
    /// # Example
    /// ```
    /// use aud_simulator_core_rs::SimulationCalendar;
    ///
    /// let mut calendar = SimulationCalendar::new(2000, 2005);
    /// assert_eq!(calendar.remaining_years(), 5);
    /// calendar.advance_year();
    /// assert_eq!(calendar.remaining_years(), 4);
    /// ```
    pub fn remaining_years(&self) -> usize {
        (self.end_year - self.current_year).max(0) as usize
    }

    /// True once the end year has been simulated
    pub fn is_finished(&self) -> bool {
        self.current_year >= self.end_year
    }
}

/// Coarse bucket of years since the initial year, selecting which
/// drinking-transition probabilities apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionPeriod {
    /// 0 to 3 years since start
    #[serde(rename = "0-3", alias = "early")]
    Early,
    /// 4 to 8 years since start
    #[serde(rename = "3-8", alias = "mid")]
    Mid,
    /// More than 8 years since start
    #[serde(rename = "8+", alias = "late")]
    Late,
}

impl TransitionPeriod {
    pub const ALL: [TransitionPeriod; 3] = [Self::Early, Self::Mid, Self::Late];

    /// Bucket a number of elapsed years
    ///
    /// # Example
    /// ```
    /// use aud_simulator_core_rs::TransitionPeriod;
    ///
    /// assert_eq!(TransitionPeriod::from_years_since_start(3), Some(TransitionPeriod::Early));
    /// assert_eq!(TransitionPeriod::from_years_since_start(4), Some(TransitionPeriod::Mid));
    /// assert_eq!(TransitionPeriod::from_years_since_start(9), Some(TransitionPeriod::Late));
    /// assert_eq!(TransitionPeriod::from_years_since_start(-1), None);
    /// ```
    pub fn from_years_since_start(years: i32) -> Option<Self> {
        match years {
            y if y < 0 => None,
            0..=3 => Some(Self::Early),
            4..=8 => Some(Self::Mid),
            _ => Some(Self::Late),
        }
    }

    /// Bucket a calendar year relative to the initial year
    pub fn for_year(year: i32, initial_year: i32) -> Result<Self, SimulationError> {
        Self::from_years_since_start(year - initial_year).ok_or_else(|| {
            SimulationError::InvalidConfig(format!(
                "year {} precedes initial year {}",
                year, initial_year
            ))
        })
    }

    /// Label used by the transition-probability input tables
    pub fn label(&self) -> &'static str {
        match self {
            Self::Early => "0-3",
            Self::Mid => "3-8",
            Self::Late => "8+",
        }
    }
}

impl fmt::Display for TransitionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
