//! Event logging for run auditing.
//!
//! This module defines the Event enum which records each life-event phase of a
//! run. Events enable:
//! - Debugging (understand what happened in which year)
//! - Auditing (verify counts behind each yearly summary)
//! - Analysis (extract births, deaths and migration over time)
//!
//! # Example
//!
//! ```rust
//! use aud_simulator_core_rs::models::Event;
//!
//! let event = Event::Births {
//!     year: 2001,
//!     count: 10,
//!     first_id: Some(1000),
//! };
//!
//! assert_eq!(event.year(), 2001);
//! assert_eq!(event.event_type(), "Births");
//! ```

use serde::{Deserialize, Serialize};

/// Simulation event capturing one phase of a year.
///
/// All events include the simulated year. Events are logged in the order they
/// occur within a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Initial population built for the snapshot year
    PopulationInitialized { year: i32, size: usize },

    /// Every living person aged one year
    Aged { year: i32, count: usize },

    /// Newborns appended
    Births {
        year: i32,
        count: usize,
        first_id: Option<u64>,
    },

    /// Immigrants appended
    Immigration {
        year: i32,
        count: usize,
        first_id: Option<u64>,
    },

    /// Drinking-stage transition pass
    ///
    /// `unmatched` rows had no transition entry and kept their stage.
    DrinkingTransition {
        year: i32,
        sampled: usize,
        changed: usize,
        unmatched: usize,
        signatures: usize,
    },

    /// Rows marked dead and removed
    Deaths {
        year: i32,
        count: usize,
        unmatched: usize,
    },

    /// Year step committed
    YearCompleted { year: i32, population: usize },

    /// Summary handed to the result sink
    SummaryEmitted { year: i32, total: usize },

    /// Soft validation against a reference total
    ValidationChecked {
        year: i32,
        simulated: f64,
        reference: f64,
        relative_error: f64,
        within_tolerance: bool,
    },
}

impl Event {
    /// Get the simulated year this event belongs to
    pub fn year(&self) -> i32 {
        match self {
            Event::PopulationInitialized { year, .. } => *year,
            Event::Aged { year, .. } => *year,
            Event::Births { year, .. } => *year,
            Event::Immigration { year, .. } => *year,
            Event::DrinkingTransition { year, .. } => *year,
            Event::Deaths { year, .. } => *year,
            Event::YearCompleted { year, .. } => *year,
            Event::SummaryEmitted { year, .. } => *year,
            Event::ValidationChecked { year, .. } => *year,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PopulationInitialized { .. } => "PopulationInitialized",
            Event::Aged { .. } => "Aged",
            Event::Births { .. } => "Births",
            Event::Immigration { .. } => "Immigration",
            Event::DrinkingTransition { .. } => "DrinkingTransition",
            Event::Deaths { .. } => "Deaths",
            Event::YearCompleted { .. } => "YearCompleted",
            Event::SummaryEmitted { .. } => "SummaryEmitted",
            Event::ValidationChecked { .. } => "ValidationChecked",
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// This is a simple wrapper around Vec<Event> with convenience methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Append every event from another log, preserving order
    pub fn extend(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific year
    pub fn events_for_year(&self, year: i32) -> Vec<&Event> {
        self.events.iter().filter(|e| e.year() == year).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
