//! Authorization decision types
//!
//! Denials are expected traffic-shaping outcomes, so they are plain values
//! rather than errors; callers branch on the reason and surface `reset_at`
//! for client-side backoff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The rate-limit window that rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateWindow {
    Minute,
    Day,
}

impl std::fmt::Display for RateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minute => write!(f, "minute"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// Why an authorization request was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    /// No key was presented in any accepted location
    MissingKey,
    /// The presented key matches no stored key
    InvalidKey,
    /// The key's expiration timestamp has passed
    Expired,
    /// The key has been deactivated
    Revoked,
    /// A rate-limit window is exhausted
    RateLimited {
        window: RateWindow,
        /// When the exhausted window opens again
        reset_at: DateTime<Utc>,
    },
    /// No permission rule matches the requested endpoint
    PermissionDenied,
}

/// Outcome of [`QuotaManager::authorize`](crate::infrastructure::api_key::QuotaManager::authorize)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthDecision {
    /// The request may proceed
    Allowed {
        /// Requests left in the current minute window
        remaining_minute: u32,
        /// Requests left in the current daily window; `None` when unlimited
        remaining_day: Option<i64>,
    },
    /// The request was rejected
    Denied { reason: DenialReason },
}

impl AuthDecision {
    pub fn denied(reason: DenialReason) -> Self {
        Self::Denied { reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// The backoff hint attached to a rate-limit denial, if any
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Denied {
                reason: DenialReason::RateLimited { reset_at, .. },
            } => Some(*reset_at),
            _ => None,
        }
    }
}
