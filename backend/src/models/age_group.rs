//! Age bucketing schemes
//!
//! Three distinct partitions of age are in use and are deliberately kept apart:
//!
//! - [`CensusAgeGroup`]: 18 five-year bands, keying race and immigration lookups.
//! - [`DrinkingAgeGroup`] under a [`DrinkingAgeScheme`]: the 4- or 5-group partition
//!   keying the initial drinking distribution. The scheme is detected once from the
//!   table's keys and then shared by everything that samples from that table.
//! - [`TransitionAgeGroup`]: the 4-group partition keying drinking transitions.

use crate::core::error::SimulationError;
use crate::models::person::MAX_AGE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const CENSUS_LABELS: [&str; 18] = [
    "Under 5 years",
    "5 to 9 years",
    "10 to 14 years",
    "15 to 19 years",
    "20 to 24 years",
    "25 to 29 years",
    "30 to 34 years",
    "35 to 39 years",
    "40 to 44 years",
    "45 to 49 years",
    "50 to 54 years",
    "55 to 59 years",
    "60 to 64 years",
    "65 to 69 years",
    "70 to 74 years",
    "75 to 79 years",
    "80 to 84 years",
    "85 years and over",
];

/// One of the 18 five-year census age bands
///
/// # Example
/// ```
/// use aud_simulator_core_rs::models::CensusAgeGroup;
///
/// let group = CensusAgeGroup::from_age(37).unwrap();
/// assert_eq!(group.label(), "35 to 39 years");
/// assert_eq!(CensusAgeGroup::from_age(100).unwrap().label(), "85 years and over");
/// assert!(CensusAgeGroup::from_age(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CensusAgeGroup(u8);

impl CensusAgeGroup {
    pub const COUNT: usize = 18;

    /// Band containing `age`
    pub fn from_age(age: u32) -> Result<Self, SimulationError> {
        if age > MAX_AGE {
            return Err(SimulationError::InvalidAge {
                age,
                scheme: "census",
            });
        }
        let index = (age / 5).min(Self::COUNT as u32 - 1);
        Ok(Self(index as u8))
    }

    pub fn all() -> impl Iterator<Item = CensusAgeGroup> {
        (0..Self::COUNT as u8).map(CensusAgeGroup)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn label(&self) -> &'static str {
        CENSUS_LABELS[self.index()]
    }
}

impl fmt::Display for CensusAgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CensusAgeGroup {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CENSUS_LABELS
            .iter()
            .position(|label| *label == s.trim())
            .map(|index| CensusAgeGroup(index as u8))
            .ok_or_else(|| SimulationError::lookup_miss("census_age_groups", s))
    }
}

impl TryFrom<String> for CensusAgeGroup {
    type Error = SimulationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CensusAgeGroup> for String {
    fn from(group: CensusAgeGroup) -> Self {
        group.label().to_string()
    }
}

/// Age band used by the initial drinking distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DrinkingAgeGroup {
    #[serde(rename = "0-17")]
    Under18,
    #[serde(rename = "18-34")]
    From18To34,
    #[serde(rename = "18-24")]
    From18To24,
    #[serde(rename = "25-34")]
    From25To34,
    #[serde(rename = "35-54")]
    From35To54,
    #[serde(rename = "55 and over", alias = "55+")]
    From55,
}

impl DrinkingAgeGroup {
    pub fn label(&self) -> &'static str {
        match self {
            DrinkingAgeGroup::Under18 => "0-17",
            DrinkingAgeGroup::From18To34 => "18-34",
            DrinkingAgeGroup::From18To24 => "18-24",
            DrinkingAgeGroup::From25To34 => "25-34",
            DrinkingAgeGroup::From35To54 => "35-54",
            DrinkingAgeGroup::From55 => "55 and over",
        }
    }
}

impl fmt::Display for DrinkingAgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which drinking age partition a table uses
///
/// # Example
/// ```
/// use aud_simulator_core_rs::models::{DrinkingAgeGroup, DrinkingAgeScheme};
///
/// let scheme = DrinkingAgeScheme::detect([
///     DrinkingAgeGroup::Under18,
///     DrinkingAgeGroup::From18To24,
///     DrinkingAgeGroup::From55,
/// ])
/// .unwrap();
/// assert_eq!(scheme, DrinkingAgeScheme::FiveGroup);
/// assert_eq!(scheme.group_for(30), DrinkingAgeGroup::From25To34);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrinkingAgeScheme {
    /// 0-17, 18-34, 35-54, 55 and over
    FourGroup,
    /// 0-17, 18-24, 25-34, 35-54, 55 and over
    FiveGroup,
}

impl DrinkingAgeScheme {
    /// Detect the scheme whose labels cover every key present
    ///
    /// The four-group scheme is checked first, so a key set valid under both
    /// (e.g. only `0-17` and `55 and over`) resolves to four groups.
    pub fn detect(
        keys: impl IntoIterator<Item = DrinkingAgeGroup>,
    ) -> Result<Self, SimulationError> {
        let present: BTreeSet<DrinkingAgeGroup> = keys.into_iter().collect();
        if present.is_empty() {
            return Err(SimulationError::invalid_distribution(
                "initial_drinking",
                "no age groups present",
            ));
        }

        for scheme in [DrinkingAgeScheme::FourGroup, DrinkingAgeScheme::FiveGroup] {
            if present.iter().all(|group| scheme.groups().contains(group)) {
                return Ok(scheme);
            }
        }

        let labels: Vec<&str> = present.iter().map(|g| g.label()).collect();
        Err(SimulationError::invalid_distribution(
            "initial_drinking",
            format!("age groups {:?} match neither the 4- nor the 5-group scheme", labels),
        ))
    }

    pub fn groups(&self) -> &'static [DrinkingAgeGroup] {
        use DrinkingAgeGroup::*;
        match self {
            DrinkingAgeScheme::FourGroup => &[Under18, From18To34, From35To54, From55],
            DrinkingAgeScheme::FiveGroup => &[Under18, From18To24, From25To34, From35To54, From55],
        }
    }

    /// Band containing `age` under this scheme
    pub fn group_for(&self, age: u32) -> DrinkingAgeGroup {
        match (self, age) {
            (_, 0..=17) => DrinkingAgeGroup::Under18,
            (DrinkingAgeScheme::FourGroup, 18..=34) => DrinkingAgeGroup::From18To34,
            (DrinkingAgeScheme::FiveGroup, 18..=24) => DrinkingAgeGroup::From18To24,
            (DrinkingAgeScheme::FiveGroup, 25..=34) => DrinkingAgeGroup::From25To34,
            (_, 35..=54) => DrinkingAgeGroup::From35To54,
            _ => DrinkingAgeGroup::From55,
        }
    }
}

/// Age band used by the drinking transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionAgeGroup {
    #[serde(rename = "0-17")]
    Under18,
    #[serde(rename = "18-34")]
    From18To34,
    #[serde(rename = "35-50")]
    From35To50,
    #[serde(rename = "51+")]
    From51,
}

impl TransitionAgeGroup {
    pub const ALL: [TransitionAgeGroup; 4] = [
        TransitionAgeGroup::Under18,
        TransitionAgeGroup::From18To34,
        TransitionAgeGroup::From35To50,
        TransitionAgeGroup::From51,
    ];

    /// Every age maps to exactly one band
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=17 => TransitionAgeGroup::Under18,
            18..=34 => TransitionAgeGroup::From18To34,
            35..=50 => TransitionAgeGroup::From35To50,
            _ => TransitionAgeGroup::From51,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransitionAgeGroup::Under18 => "0-17",
            TransitionAgeGroup::From18To34 => "18-34",
            TransitionAgeGroup::From35To50 => "35-50",
            TransitionAgeGroup::From51 => "51+",
        }
    }
}

impl fmt::Display for TransitionAgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
