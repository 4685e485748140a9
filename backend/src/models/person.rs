//! Person model
//!
//! One row of the population table. Sex and race are fixed at creation; age
//! only moves forward; the drinking stage is always defined.
//!
//! # Example
//!
//! ```rust
//! use aud_simulator_core_rs::models::{DrinkingStage, Person, Race, Sex};
//!
//! let person = Person::new(7, 34, Sex::Female, Race::Hispanic, DrinkingStage::Low);
//! assert_eq!(person.id(), 7);
//! assert!(person.is_alive());
//! assert!(person.is_adult());
//! assert_eq!(person.composite().to_string(), "Female_Hispanic");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Oldest representable age; aging clamps here
pub const MAX_AGE: u32 = 100;

/// First age counted as an adult in summaries
pub const ADULT_AGE: u32 = 18;

/// Stable integer code for a category, used to fingerprint distributions
///
/// Codes must not depend on the Rust toolchain or process, so they are
/// written out per type instead of derived from `Hash`.
pub trait CategoryCode {
    fn code(&self) -> u64;
}

impl CategoryCode for u32 {
    fn code(&self) -> u64 {
        u64::from(*self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    pub fn label(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

impl CategoryCode for Sex {
    fn code(&self) -> u64 {
        *self as u64
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Race {
    White,
    Black,
    Hispanic,
    Other,
}

impl Race {
    pub const ALL: [Race; 4] = [Race::White, Race::Black, Race::Hispanic, Race::Other];

    pub fn label(&self) -> &'static str {
        match self {
            Race::White => "White",
            Race::Black => "Black",
            Race::Hispanic => "Hispanic",
            Race::Other => "Other",
        }
    }
}

impl CategoryCode for Race {
    fn code(&self) -> u64 {
        *self as u64
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Behavioral risk level
///
/// Input tables use the short labels `Abs`, `Low`, `Med`, `High`, `Very High`;
/// the long names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DrinkingStage {
    #[serde(rename = "Abs", alias = "Abstinent")]
    Abstinent,
    Low,
    #[serde(rename = "Med", alias = "Moderate")]
    Moderate,
    High,
    #[serde(rename = "Very High", alias = "VeryHigh")]
    VeryHigh,
}

impl DrinkingStage {
    pub const ALL: [DrinkingStage; 5] = [
        DrinkingStage::Abstinent,
        DrinkingStage::Low,
        DrinkingStage::Moderate,
        DrinkingStage::High,
        DrinkingStage::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DrinkingStage::Abstinent => "Abs",
            DrinkingStage::Low => "Low",
            DrinkingStage::Moderate => "Med",
            DrinkingStage::High => "High",
            DrinkingStage::VeryHigh => "Very High",
        }
    }

    /// Position in `ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl CategoryCode for DrinkingStage {
    fn code(&self) -> u64 {
        *self as u64
    }
}

impl fmt::Display for DrinkingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sex and race combined, as used to key race, death and drinking tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Composite {
    pub sex: Sex,
    pub race: Race,
}

impl Composite {
    pub fn new(sex: Sex, race: Race) -> Self {
        Self { sex, race }
    }

    /// Every sex/race combination, sex-major
    pub fn all() -> impl Iterator<Item = Composite> {
        Sex::ALL
            .into_iter()
            .flat_map(|sex| Race::ALL.into_iter().map(move |race| Composite::new(sex, race)))
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.sex, self.race)
    }
}

/// One individual in the population table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    id: u64,
    age: u32,
    sex: Sex,
    race: Race,
    drinking_stage: DrinkingStage,
    alive: bool,
    is_immigrant: bool,
}

impl Person {
    /// Create a living, native-born person
    ///
    /// Ages above [`MAX_AGE`] are clamped.
    pub fn new(id: u64, age: u32, sex: Sex, race: Race, drinking_stage: DrinkingStage) -> Self {
        Self {
            id,
            age: age.min(MAX_AGE),
            sex,
            race,
            drinking_stage,
            alive: true,
            is_immigrant: false,
        }
    }

    /// Mark this person as having arrived by immigration
    pub fn into_immigrant(mut self) -> Self {
        self.is_immigrant = true;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn race(&self) -> Race {
        self.race
    }

    pub fn composite(&self) -> Composite {
        Composite::new(self.sex, self.race)
    }

    pub fn drinking_stage(&self) -> DrinkingStage {
        self.drinking_stage
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_immigrant(&self) -> bool {
        self.is_immigrant
    }

    pub fn is_adult(&self) -> bool {
        self.age >= ADULT_AGE
    }

    pub(crate) fn advance_age(&mut self) {
        self.age = (self.age + 1).min(MAX_AGE);
    }

    pub(crate) fn set_drinking_stage(&mut self, stage: DrinkingStage) {
        self.drinking_stage = stage;
    }

    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }
}
