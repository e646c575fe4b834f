//! Properties assigned after construction.

use std::collections::BTreeMap;

use crate::value::Argument;

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: Argument,
    pub is_static: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    properties: BTreeMap<String, Property>,
}

impl Properties {
    pub fn set(&mut self, name: impl Into<String>, value: Argument, is_static: bool) {
        self.properties.insert(name.into(), Property { value, is_static });
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Property)> {
        self.properties.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
