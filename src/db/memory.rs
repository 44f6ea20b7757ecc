use std::{collections::HashMap, convert::Infallible};

use crate::db::Db;

/// A simple in-memory database implementation for testing
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> &HashMap<Vec<u8>, Vec<u8>> {
        &self.entries
    }
}

impl Db for MemoryDb {
    type DbError = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::DbError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::DbError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::DbError> {
        self.entries.remove(key);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::DbError> {
        self.entries.shrink_to_fit();
        Ok(())
    }
}
