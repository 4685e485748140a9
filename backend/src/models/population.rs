//! Population table
//!
//! The collection of [`Person`] rows evolved by the simulation. Row order
//! carries no meaning; updaters address rows by index only within a single
//! pass.
//!
//! # Critical Invariants
//!
//! 1. **ID Uniqueness**: no two rows ever share an ID
//! 2. **No Reuse**: IDs of removed rows are never issued again. The table keeps
//!    a high-water mark (`next_id`) that only moves forward.
//! 3. **Monotone Allocation**: rows appended in a year carry IDs greater than
//!    every ID that existed before that year

use crate::models::person::Person;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Population table with an ID high-water mark
///
/// # Example
///
/// ```rust
/// use aud_simulator_core_rs::models::{DrinkingStage, Person, PersonTable, Race, Sex};
///
/// let mut table = PersonTable::new();
/// assert_eq!(table.next_id(), 0);
///
/// table.append_new(vec![
///     Person::new(0, 30, Sex::Male, Race::White, DrinkingStage::Low),
///     Person::new(1, 4, Sex::Female, Race::Black, DrinkingStage::Abstinent),
/// ]);
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.next_id(), 2);
/// assert_eq!(table.max_id(), Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonTable {
    persons: Vec<Person>,
    next_id: u64,
}

impl PersonTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from existing rows
    ///
    /// # Panics
    ///
    /// Panics if two rows share an ID
    pub fn from_persons(persons: Vec<Person>) -> Self {
        let mut seen = HashSet::with_capacity(persons.len());
        for person in &persons {
            assert!(seen.insert(person.id()), "Person ID {} already exists", person.id());
        }
        let next_id = persons.iter().map(|p| p.id() + 1).max().unwrap_or(0);
        Self { persons, next_id }
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.persons.iter()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    /// First ID the next appended row must carry
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Largest ID currently in the table
    pub fn max_id(&self) -> Option<u64> {
        self.persons.iter().map(Person::id).max()
    }

    /// Append freshly created rows
    ///
    /// # Panics
    ///
    /// Panics unless the rows carry consecutive IDs starting at `next_id()`
    pub fn append_new(&mut self, persons: Vec<Person>) {
        for (offset, person) in persons.iter().enumerate() {
            let expected = self.next_id + offset as u64;
            assert_eq!(
                person.id(),
                expected,
                "Appended person ID {} was not allocated by the table (expected {})",
                person.id(),
                expected
            );
        }
        self.next_id += persons.len() as u64;
        self.persons.extend(persons);
    }

    /// Drop rows no longer alive, returning how many were removed
    pub fn retain_alive(&mut self) -> usize {
        let before = self.persons.len();
        self.persons.retain(Person::is_alive);
        before - self.persons.len()
    }

    /// Left join each row against a keyed lookup
    ///
    /// Returns one entry per row, in row order; `None` where the row's key has
    /// no match.
    pub fn left_join<V, F>(&self, lookup: F) -> Vec<Option<V>>
    where
        F: Fn(&Person) -> Option<V>,
    {
        self.persons.iter().map(lookup).collect()
    }

    /// Row indices grouped by key, keys in ascending order
    pub fn group_indices_by<K, F>(&self, key: F) -> BTreeMap<K, Vec<usize>>
    where
        K: Ord,
        F: Fn(&Person) -> K,
    {
        let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
        for (index, person) in self.persons.iter().enumerate() {
            groups.entry(key(person)).or_default().push(index);
        }
        groups
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Person> {
        self.persons.get_mut(index)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Person> {
        self.persons.iter_mut()
    }
}
