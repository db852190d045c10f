//! In-memory BIN metadata repository

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::bin::{BinRecord, BinRepository};
use crate::domain::DomainError;

/// In-memory implementation of [`BinRepository`]
#[derive(Debug, Default)]
pub struct InMemoryBinRepository {
    records: RwLock<HashMap<String, BinRecord>>,
}

impl InMemoryBinRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-loaded with records
    pub fn with_records(records: impl IntoIterator<Item = BinRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.bin.clone(), r))
            .collect();

        Self {
            records: RwLock::new(map),
        }
    }

    /// Insert or replace a record
    pub fn insert(&self, record: BinRecord) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| DomainError::storage("BIN repository lock poisoned"))?;

        records.insert(record.bin.clone(), record);
        Ok(())
    }
}

impl BinRepository for InMemoryBinRepository {
    fn lookup(&self, bin: &str) -> Result<Option<BinRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::storage("BIN repository lock poisoned"))?;

        let key = &bin[..6.min(bin.len())];
        Ok(records.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_found() {
        let repo = InMemoryBinRepository::with_records([
            BinRecord::new("413567", "VISA").with_country("US", "United States"),
        ]);

        let record = repo.lookup("413567").unwrap().unwrap();
        assert_eq!(record.brand, "VISA");
    }

    #[test]
    fn test_lookup_truncates_long_prefixes() {
        let repo =
            InMemoryBinRepository::with_records([BinRecord::new("413567", "VISA")]);

        assert!(repo.lookup("41356712").unwrap().is_some());
    }

    #[test]
    fn test_lookup_missing() {
        let repo = InMemoryBinRepository::new();
        assert!(repo.lookup("999999").unwrap().is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let repo = InMemoryBinRepository::new();
        repo.insert(BinRecord::new("413567", "VISA")).unwrap();
        repo.insert(BinRecord::new("413567", "VISA").with_category("PREPAID"))
            .unwrap();

        let record = repo.lookup("413567").unwrap().unwrap();
        assert!(record.is_prepaid());
    }
}
