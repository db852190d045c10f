//! In-memory quota store
//!
//! Keeps every key behind one `RwLock`ed map. The compare-and-swap runs under
//! the write lock, which is what makes the daily check-then-increment safe
//! for concurrent authorize calls against the same key.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, QuotaStore, UsageCounters};
use crate::domain::DomainError;

/// In-memory implementation of [`QuotaStore`]
#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    keys: RwLock<HashMap<String, ApiKey>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_guard(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, ApiKey>>, DomainError> {
        self.keys
            .read()
            .map_err(|_| DomainError::storage("quota store lock poisoned"))
    }

    fn write_guard(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, ApiKey>>, DomainError> {
        self.keys
            .write()
            .map_err(|_| DomainError::storage("quota store lock poisoned"))
    }
}

impl QuotaStore for InMemoryQuotaStore {
    fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.read_guard()?;
        Ok(keys.get(id.as_str()).cloned())
    }

    fn find_by_secret_hash(&self, hash: &str) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.read_guard()?;
        Ok(keys.values().find(|k| k.secret_hash() == hash).cloned())
    }

    fn create(&self, key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.write_guard()?;
        let id = key.id().as_str().to_string();

        if keys.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "API key with ID '{id}' already exists"
            )));
        }

        keys.insert(id, key.clone());
        Ok(key)
    }

    fn update(&self, key: &ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.write_guard()?;
        let id = key.id().as_str();

        let stored = keys
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("API key '{id}' not found")))?;

        // Counters stay under CAS control; carry the stored ones forward.
        let mut next = key.clone();
        next.set_counters(stored.counters());
        *stored = next.clone();

        Ok(next)
    }

    fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let mut keys = self.write_guard()?;
        Ok(keys.remove(id.as_str()).is_some())
    }

    fn list(&self, owner_id: Option<&str>) -> Result<Vec<ApiKey>, DomainError> {
        let keys = self.read_guard()?;

        let mut result: Vec<ApiKey> = keys
            .values()
            .filter(|k| owner_id.is_none_or(|owner| k.owner_id() == owner))
            .cloned()
            .collect();

        result.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        Ok(result)
    }

    fn compare_and_swap_counters(
        &self,
        id: &ApiKeyId,
        expected: &UsageCounters,
        next: &UsageCounters,
    ) -> Result<bool, DomainError> {
        let mut keys = self.write_guard()?;

        let stored = keys.get_mut(id.as_str()).ok_or_else(|| {
            DomainError::not_found(format!("API key '{}' not found", id.as_str()))
        })?;

        if stored.counters() != *expected {
            return Ok(false);
        }

        stored.set_counters(*next);
        Ok(true)
    }
}
