//! Mapping registry
//!
//! Built once from an explicit, ordered list of format definitions and
//! read-only afterwards, so one registry can serve concurrent runs.

use std::collections::HashSet;

use crate::adapters::mappers;
use crate::domain::result::{Error, Result};
use crate::domain::MappingDefinition;

#[derive(Debug, Clone)]
pub struct MappingRegistry {
    definitions: Vec<MappingDefinition>,
}

impl MappingRegistry {
    /// Register definitions in order. Duplicate ids and an empty list are
    /// configuration errors.
    pub fn new(definitions: Vec<MappingDefinition>) -> Result<Self> {
        if definitions.is_empty() {
            return Err(Error::Config("no mapping definitions registered".to_string()));
        }

        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.id) {
                return Err(Error::Config(format!("duplicate mapping id found: {}", def.id)));
            }
        }

        Ok(Self { definitions })
    }

    /// Registry of the built-in formats
    pub fn builtin() -> Result<Self> {
        Self::new(mappers::all())
    }

    pub fn get(&self, id: &str) -> Option<&MappingDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MappingDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
