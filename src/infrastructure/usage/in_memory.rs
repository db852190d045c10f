//! In-memory usage log

use std::sync::RwLock;

use crate::domain::api_key::ApiKeyId;
use crate::domain::usage::{UsageLogRepository, UsageRecord};
use crate::domain::DomainError;

/// Append-only in-memory implementation of [`UsageLogRepository`]
#[derive(Debug, Default)]
pub struct InMemoryUsageLog {
    records: RwLock<Vec<UsageRecord>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageLogRepository for InMemoryUsageLog {
    fn append(&self, record: UsageRecord) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| DomainError::storage("usage log lock poisoned"))?;

        records.push(record);
        Ok(())
    }

    fn list_for_key(&self, key_id: &ApiKeyId) -> Result<Vec<UsageRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::storage("usage log lock poisoned"))?;

        let mut matching: Vec<UsageRecord> = records
            .iter()
            .filter(|r| &r.key_id == key_id)
            .cloned()
            .collect();

        matching.reverse();
        Ok(matching)
    }

    fn count(&self) -> Result<usize, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::storage("usage log lock poisoned"))?;

        Ok(records.len())
    }
}
