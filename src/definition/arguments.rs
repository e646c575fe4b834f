//! Constructor and factory arguments.

use crate::error::{ContainerResult, OutOfBounds};
use crate::value::{Argument, ArgumentKey};

/// Ordered argument list keyed by position or parameter name.
///
/// Insertion order is kept; numeric keys are what `add` appends and what
/// positional binding reads, named keys bind by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(ArgumentKey, Argument)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &ArgumentKey) -> bool {
        self.position(key).is_some()
    }

    /// Sets the argument at `key`, replacing an existing value in place.
    pub fn set(&mut self, key: ArgumentKey, value: Argument) {
        match self.position(&key) {
            Some(position) => self.entries[position].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Appends after the highest numeric index.
    pub fn add(&mut self, value: Argument) {
        let next = self
            .entries
            .iter()
            .filter_map(|(key, _)| key.index())
            .max()
            .map_or(0, |max| max + 1);
        self.entries.push((ArgumentKey::Index(next), value));
    }

    pub fn get(&self, key: &ArgumentKey) -> ContainerResult<&Argument> {
        self.position(key)
            .map(|position| &self.entries[position].1)
            .ok_or_else(|| OutOfBounds::Missing { key: key.to_string() }.into())
    }

    /// Replaces an existing argument.
    ///
    /// Validation order is fixed: empty list, then numeric range, then
    /// presence of the key.
    pub fn replace(&mut self, key: ArgumentKey, value: Argument) -> ContainerResult<()> {
        if self.entries.is_empty() {
            return Err(OutOfBounds::NoneConfigured { key: key.to_string() }.into());
        }

        if let ArgumentKey::Index(index) = key {
            let max = self.entries.len() - 1;
            if index < 0 || index as usize > max {
                return Err(OutOfBounds::OutOfRange { index, max }.into());
            }
        }

        match self.position(&key) {
            Some(position) => {
                self.entries[position].1 = value;
                Ok(())
            }
            None => Err(OutOfBounds::Missing { key: key.to_string() }.into()),
        }
    }

    pub fn remove(&mut self, key: &ArgumentKey) -> Option<Argument> {
        self.position(key).map(|position| self.entries.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArgumentKey, &Argument)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Numeric entries sorted by index.
    pub fn positional(&self) -> Vec<(i64, &Argument)> {
        let mut positional: Vec<(i64, &Argument)> = self
            .entries
            .iter()
            .filter_map(|(key, value)| key.index().map(|index| (index, value)))
            .collect();
        positional.sort_by_key(|(index, _)| *index);
        positional
    }

    pub fn named(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find_map(|(key, value)| match key {
            ArgumentKey::Named(candidate) if candidate == name => Some(value),
            _ => None,
        })
    }

    fn position(&self, key: &ArgumentKey) -> Option<usize> {
        self.entries.iter().position(|(candidate, _)| candidate == key)
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        let mut arguments = Arguments::new();
        for argument in iter {
            arguments.add(argument);
        }
        arguments
    }
}
