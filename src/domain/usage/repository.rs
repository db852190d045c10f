//! Usage log sink trait

use super::record::UsageRecord;
use crate::domain::api_key::ApiKeyId;
use crate::domain::DomainError;

/// Append-only sink for per-request usage records
#[cfg_attr(test, mockall::automock)]
pub trait UsageLogRepository: Send + Sync {
    /// Append a record
    fn append(&self, record: UsageRecord) -> Result<(), DomainError>;

    /// List records for a key, newest first
    fn list_for_key(&self, key_id: &ApiKeyId) -> Result<Vec<UsageRecord>, DomainError>;

    /// Total number of stored records
    fn count(&self) -> Result<usize, DomainError>;
}
