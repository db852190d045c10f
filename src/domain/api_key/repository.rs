//! Quota store trait
//!
//! Durable storage for API keys and their usage counters. The authorize path
//! needs check-then-increment semantics on the daily counters, so mutation
//! goes through a compare-and-swap primitive rather than a blind update:
//! callers re-read and retry when the swap reports a lost race.

use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId, UsageCounters};
use crate::domain::DomainError;

/// Repository for API keys and their quota counters
pub trait QuotaStore: Send + Sync + Debug {
    /// Get a key by its ID
    fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Get a key by the hash of its secret (authentication lookup)
    fn find_by_secret_hash(&self, hash: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Store a new key
    fn create(&self, key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Update a key's metadata (permissions, limits, active flag, expiry).
    ///
    /// Counters are deliberately excluded; they change only through
    /// [`compare_and_swap_counters`](Self::compare_and_swap_counters).
    fn update(&self, key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// Delete a key
    fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    /// List keys, optionally filtered by owner
    fn list(&self, owner_id: Option<&str>) -> Result<Vec<ApiKey>, DomainError>;

    /// Atomically replace the usage counters if they still equal `expected`.
    ///
    /// Returns `false` when another writer got there first; the caller must
    /// re-read and re-evaluate its quota decision before retrying.
    fn compare_and_swap_counters(
        &self,
        id: &ApiKeyId,
        expected: &UsageCounters,
        next: &UsageCounters,
    ) -> Result<bool, DomainError>;
}
