//! API key entity and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::permission::PermissionSet;
use super::validation::{validate_key_id, KeyIdError};

/// Length of one daily quota window in seconds.
const DAY_SECS: i64 = 24 * 60 * 60;

/// API key identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Create a new ApiKeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, KeyIdError> {
        let id = id.into();
        validate_key_id(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKeyId {
    type Error = KeyIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyId> for String {
    fn from(id: ApiKeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service tier of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    /// Built-in quota defaults for the tier.
    ///
    /// Deployments override these through configuration; the constants here
    /// keep freshly issued keys usable without any config file.
    pub fn default_limits(&self) -> TierLimits {
        match self {
            Self::Free => TierLimits {
                per_minute: 10,
                per_day: 50,
            },
            Self::Pro => TierLimits {
                per_minute: 60,
                per_day: 5_000,
            },
            Self::Enterprise => TierLimits {
                per_minute: 300,
                per_day: TierLimits::UNLIMITED,
            },
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Pro => write!(f, "pro"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// Request quota limits attached to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Maximum requests per minute
    pub per_minute: u32,
    /// Maximum requests per day; negative means unlimited
    pub per_day: i64,
}

impl TierLimits {
    /// Sentinel for an unlimited daily quota.
    pub const UNLIMITED: i64 = -1;

    pub fn new(per_minute: u32, per_day: i64) -> Self {
        Self {
            per_minute,
            per_day,
        }
    }

    /// The daily cap, `None` when unlimited
    pub fn daily_cap(&self) -> Option<i64> {
        (self.per_day >= 0).then_some(self.per_day)
    }
}

/// Usage counters persisted alongside a key.
///
/// `daily_reset_anchor` only ever advances in whole 24 h steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    /// Requests consumed in the current daily window
    pub daily_usage_count: i64,
    /// Start of the current daily window
    pub daily_reset_anchor: DateTime<Utc>,
    /// Lifetime allowed-request count
    pub usage_count_total: u64,
}

impl UsageCounters {
    /// Fresh counters anchored at `now`
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            daily_usage_count: 0,
            daily_reset_anchor: now,
            usage_count_total: 0,
        }
    }

    /// Counters after applying any due daily reset at `now`.
    ///
    /// When at least one full 24 h period has elapsed since the anchor, the
    /// anchor advances by exactly that many periods (computed, not looped)
    /// and the daily count starts over. The anchor never moves backwards.
    pub fn rolled(&self, now: DateTime<Utc>) -> Self {
        let elapsed = (now - self.daily_reset_anchor).num_seconds();
        if elapsed < DAY_SECS {
            return *self;
        }

        let periods = elapsed / DAY_SECS;
        Self {
            daily_usage_count: 0,
            daily_reset_anchor: self.daily_reset_anchor + Duration::seconds(periods * DAY_SECS),
            usage_count_total: self.usage_count_total,
        }
    }

    /// End of the current daily window
    pub fn window_reset_at(&self) -> DateTime<Utc> {
        self.daily_reset_anchor + Duration::seconds(DAY_SECS)
    }

    /// Counters after one allowed request
    pub fn consumed(&self) -> Self {
        Self {
            daily_usage_count: self.daily_usage_count + 1,
            daily_reset_anchor: self.daily_reset_anchor,
            usage_count_total: self.usage_count_total + 1,
        }
    }
}

/// API key entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Unique identifier for the key
    id: ApiKeyId,
    /// Account that owns this key
    owner_id: String,
    /// Service tier the key was issued under
    tier: Tier,
    /// Hashed secret; the plaintext secret is never stored
    secret_hash: String,
    /// Key prefix for identification (shown in listings)
    key_prefix: String,
    /// Endpoint permission rules
    permissions: PermissionSet,
    /// Quota limits
    limits: TierLimits,
    /// Usage counters
    counters: UsageCounters,
    /// Whether the key is active; revoked keys stay stored but always deny
    active: bool,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Expiration timestamp (None = never expires)
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Create a new active key with the tier's default limits
    pub fn new(
        id: ApiKeyId,
        owner_id: impl Into<String>,
        tier: Tier,
        secret_hash: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            owner_id: owner_id.into(),
            tier,
            secret_hash: secret_hash.into(),
            key_prefix: key_prefix.into(),
            permissions: PermissionSet::allow_all(),
            limits: tier.default_limits(),
            counters: UsageCounters::starting_at(now),
            active: true,
            created_at: now,
            expires_at: None,
        }
    }

    /// Set permission rules
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// Override the tier default limits
    pub fn with_limits(mut self, limits: TierLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set expiration
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn limits(&self) -> TierLimits {
        self.limits
    }

    pub fn counters(&self) -> UsageCounters {
        self.counters
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check whether the key has expired as of `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Check whether the key is usable as of `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired_at(now)
    }

    // Mutators

    /// Revoke the key; revoked keys always deny
    pub fn revoke(&mut self) {
        self.active = false;
    }

    /// Reactivate a revoked key
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Replace the permission rules
    pub fn set_permissions(&mut self, permissions: PermissionSet) {
        self.permissions = permissions;
    }

    /// Replace the quota limits
    pub fn set_limits(&mut self, limits: TierLimits) {
        self.limits = limits;
    }

    /// Replace the usage counters (store-internal use)
    pub fn set_counters(&mut self, counters: UsageCounters) {
        self.counters = counters;
    }

    /// Set or clear expiration
    pub fn set_expiration(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
    }
}
