//! Simulation error taxonomy
//!
//! - `InvalidDistribution`: input proportions fail to normalize or fall outside [0,1].
//!   Raised while lookup tables and initial inputs are constructed, before any year runs.
//! - `LookupMiss`: a required year/category/key is absent at the point of use.
//! - `InvalidAge`: an age falls outside the coverage of an age-bucketing scheme.
//!
//! Errors raised inside a year step are wrapped in `YearAborted`, which names
//! the year and the component that failed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Simulation component, used to attribute failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Initialization,
    Aging,
    Births,
    Immigration,
    DrinkingStatus,
    Deaths,
    Summary,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Initialization => "initialization",
            Component::Aging => "aging",
            Component::Births => "births",
            Component::Immigration => "immigration",
            Component::DrinkingStatus => "drinking status",
            Component::Deaths => "deaths",
            Component::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// Errors that can abort a simulation run
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid distribution in {table}: {reason}")]
    InvalidDistribution { table: String, reason: String },

    #[error("Lookup miss in {table}: no entry for {key}")]
    LookupMiss { table: &'static str, key: String },

    #[error("Invalid age {age}: not covered by the {scheme} scheme")]
    InvalidAge { age: u32, scheme: &'static str },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Year {year} aborted during {component}: {source}")]
    YearAborted {
        year: i32,
        component: Component,
        source: Box<SimulationError>,
    },
}

impl SimulationError {
    pub fn lookup_miss(table: &'static str, key: impl fmt::Debug) -> Self {
        SimulationError::LookupMiss {
            table,
            key: format!("{:?}", key),
        }
    }

    pub fn invalid_distribution(table: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulationError::InvalidDistribution {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Attribute this error to a year and component
    ///
    /// Errors that already carry year context are returned unchanged.
    pub fn in_year(self, year: i32, component: Component) -> Self {
        match self {
            already @ SimulationError::YearAborted { .. } => already,
            other => SimulationError::YearAborted {
                year,
                component,
                source: Box::new(other),
            },
        }
    }

    /// Innermost error, with year context stripped
    pub fn root_cause(&self) -> &SimulationError {
        match self {
            SimulationError::YearAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
