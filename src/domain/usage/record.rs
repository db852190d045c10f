//! Usage record entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::api_key::ApiKeyId;

/// Unique identifier for a usage record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageRecordId(String);

impl UsageRecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("usage-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UsageRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome recorded for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Allowed,
}

/// One authorized request, append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique ID
    pub id: UsageRecordId,
    /// Key that made the request
    pub key_id: ApiKeyId,
    /// Endpoint path requested
    pub endpoint: String,
    /// HTTP method of the request
    pub method: String,
    /// When the request was authorized
    pub timestamp: DateTime<Utc>,
    /// Authorization outcome; only allowed requests are recorded
    pub outcome: RequestOutcome,
}

impl UsageRecord {
    /// Create a record for an allowed request
    pub fn allowed(
        key_id: ApiKeyId,
        endpoint: impl Into<String>,
        method: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UsageRecordId::generate(),
            key_id,
            endpoint: endpoint.into(),
            method: method.into(),
            timestamp,
            outcome: RequestOutcome::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_unique() {
        assert_ne!(UsageRecordId::generate(), UsageRecordId::generate());
    }

    #[test]
    fn test_allowed_record() {
        let key_id = ApiKeyId::new("test-key").unwrap();
        let record = UsageRecord::allowed(key_id.clone(), "/generate", "POST", Utc::now());

        assert_eq!(record.key_id, key_id);
        assert_eq!(record.endpoint, "/generate");
        assert_eq!(record.method, "POST");
        assert_eq!(record.outcome, RequestOutcome::Allowed);
        assert!(record.id.as_str().starts_with("usage-"));
    }
}
