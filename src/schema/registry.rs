//! Name-keyed lookup of shared schemas so deserializers can resolve a layout
//! from a type name at runtime.

use ahash::AHashMap;

use super::Schema;
use super::desc::{Descriptor, FieldDesc};

pub struct SchemaRegistry<'s, D: Descriptor<'s> = FieldDesc<'s>> {
    entries: AHashMap<&'s str, &'s Schema<'s, D>>,
}

impl<'s, D: Descriptor<'s>> SchemaRegistry<'s, D> {
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Registers a schema under `name`, returning the schema previously
    /// registered under that name, if any.
    pub fn register(
        &mut self,
        name: &'s str,
        schema: &'s Schema<'s, D>,
    ) -> Option<&'s Schema<'s, D>> {
        self.entries.insert(name, schema)
    }

    pub fn get(&self, name: &str) -> Option<&'s Schema<'s, D>> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'s, D: Descriptor<'s>> Default for SchemaRegistry<'s, D> {
    fn default() -> Self {
        Self::new()
    }
}
