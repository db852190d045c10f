//! Quota manager
//!
//! The sole authorization entry point. Every generation or lookup request
//! passes through [`QuotaManager::authorize`], which authenticates the
//! presented key, evaluates the daily (durable) and minute (in-memory)
//! windows, matches endpoint permissions and records usage for allowed
//! requests.
//!
//! A key is conceptually in one of three states: active, expired
//! (`expires_at` passed) or revoked (`active == false`); the latter two
//! always deny regardless of remaining quota.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::{HeaderMap, Method};
use tracing::{debug, warn};

use crate::domain::api_key::{
    ApiKey, AuthDecision, DenialReason, QuotaStore, RateWindow, UsageCounters,
};
use crate::domain::usage::{UsageLogRepository, UsageRecord};
use crate::domain::DomainError;

use super::generator::KeyGenerator;
use super::minute_window::MinuteWindow;
use super::request::resolve_presented_key;

/// Upper bound on lost-race retries of the daily counter swap.
const MAX_COMMIT_ATTEMPTS: u32 = 16;

/// Authorization gate over a [`QuotaStore`]
pub struct QuotaManager {
    store: Arc<dyn QuotaStore>,
    usage_log: Arc<dyn UsageLogRepository>,
    minute_window: MinuteWindow,
}

impl QuotaManager {
    pub fn new(store: Arc<dyn QuotaStore>, usage_log: Arc<dyn UsageLogRepository>) -> Self {
        Self {
            store,
            usage_log,
            minute_window: MinuteWindow::new(),
        }
    }

    /// Authorize a request presented with `presented_secret` against
    /// `path`/`method`.
    ///
    /// Denials are values, not errors; `Err` is reserved for store faults.
    pub fn authorize(
        &self,
        presented_secret: Option<&str>,
        path: &str,
        method: &Method,
    ) -> Result<AuthDecision, DomainError> {
        self.authorize_at(presented_secret, path, method, Utc::now())
    }

    /// Resolve the presented key from request parts, then authorize.
    ///
    /// Accepted key locations, in order: `Authorization: Bearer`, the
    /// `X-API-Key` header, the `api_key` query parameter.
    pub fn authorize_request(
        &self,
        headers: &HeaderMap,
        query: Option<&str>,
        path: &str,
        method: &Method,
    ) -> Result<AuthDecision, DomainError> {
        let presented = resolve_presented_key(headers, query);
        self.authorize(presented.as_deref(), path, method)
    }

    /// [`authorize`](Self::authorize) with an explicit clock, so window
    /// boundaries are deterministic under test.
    pub fn authorize_at(
        &self,
        presented_secret: Option<&str>,
        path: &str,
        method: &Method,
        now: DateTime<Utc>,
    ) -> Result<AuthDecision, DomainError> {
        let Some(secret) = presented_secret else {
            return Ok(AuthDecision::denied(DenialReason::MissingKey));
        };

        let hash = KeyGenerator::hash_secret(secret);
        let Some(mut key) = self.store.find_by_secret_hash(&hash)? else {
            debug!("authorization denied: unknown API key");
            return Ok(AuthDecision::denied(DenialReason::InvalidKey));
        };

        // The minute window is charged at most once per request, even when
        // the daily counter swap has to retry.
        let mut minute_count: Option<u32> = None;

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            if let Some(denied) = self.check_key_state(&key, now) {
                return Ok(denied);
            }

            let loaded = key.counters();
            let rolled = loaded.rolled(now);

            if let Some(cap) = key.limits().daily_cap() {
                if rolled.daily_usage_count >= cap {
                    debug!(key_id = %key.id(), "authorization denied: daily quota exhausted");
                    return Ok(AuthDecision::denied(DenialReason::RateLimited {
                        window: RateWindow::Day,
                        reset_at: rolled.window_reset_at(),
                    }));
                }
            }

            let count =
                *minute_count.get_or_insert_with(|| self.minute_window.hit(key.id(), now));
            if count > key.limits().per_minute {
                debug!(key_id = %key.id(), "authorization denied: minute quota exhausted");
                return Ok(AuthDecision::denied(DenialReason::RateLimited {
                    window: RateWindow::Minute,
                    reset_at: MinuteWindow::next_window_start(now),
                }));
            }

            if !key.permissions().allows(path) {
                debug!(key_id = %key.id(), path, "authorization denied: no matching permission");
                return Ok(AuthDecision::denied(DenialReason::PermissionDenied));
            }

            let next = rolled.consumed();
            if self
                .store
                .compare_and_swap_counters(key.id(), &loaded, &next)?
            {
                self.record_usage(&key, path, method, now);

                return Ok(AuthDecision::Allowed {
                    remaining_minute: key.limits().per_minute.saturating_sub(count),
                    remaining_day: remaining_day(&key, &next),
                });
            }

            // Lost the race; re-read and re-evaluate from the daily check.
            key = match self.store.get(key.id())? {
                Some(reloaded) => reloaded,
                None => return Ok(AuthDecision::denied(DenialReason::InvalidKey)),
            };
        }

        Err(DomainError::internal(format!(
            "daily counter swap for key '{}' kept losing races",
            key.id()
        )))
    }

    fn check_key_state(&self, key: &ApiKey, now: DateTime<Utc>) -> Option<AuthDecision> {
        if !key.is_active() {
            debug!(key_id = %key.id(), "authorization denied: key revoked");
            return Some(AuthDecision::denied(DenialReason::Revoked));
        }

        if key.is_expired_at(now) {
            debug!(key_id = %key.id(), "authorization denied: key expired");
            return Some(AuthDecision::denied(DenialReason::Expired));
        }

        None
    }

    fn record_usage(&self, key: &ApiKey, path: &str, method: &Method, now: DateTime<Utc>) {
        let record = UsageRecord::allowed(key.id().clone(), path, method.as_str(), now);

        if let Err(e) = self.usage_log.append(record) {
            warn!(key_id = %key.id(), "failed to append usage record: {e}");
        }
    }
}

fn remaining_day(key: &ApiKey, counters: &UsageCounters) -> Option<i64> {
    key.limits()
        .daily_cap()
        .map(|cap| (cap - counters.daily_usage_count).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::domain::api_key::{ApiKeyId, PermissionRule, PermissionSet, Tier, TierLimits};
    use crate::infrastructure::api_key::InMemoryQuotaStore;
    use crate::infrastructure::usage::InMemoryUsageLog;

    struct Fixture {
        manager: QuotaManager,
        store: Arc<InMemoryQuotaStore>,
        usage: Arc<InMemoryUsageLog>,
        secret: String,
        key_id: ApiKeyId,
    }

    fn fixture(build: impl FnOnce(ApiKey) -> ApiKey) -> Fixture {
        let store = Arc::new(InMemoryQuotaStore::new());
        let usage = Arc::new(InMemoryUsageLog::new());

        let generated = KeyGenerator::sandbox().from_material("fixture-secret-material");
        let key_id = ApiKeyId::new("test-key").unwrap();
        let key = ApiKey::new(
            key_id.clone(),
            "owner-1",
            Tier::Free,
            &generated.hash,
            &generated.display_prefix,
        );

        store.create(build(key)).unwrap();

        Fixture {
            manager: QuotaManager::new(store.clone(), usage.clone()),
            store,
            usage,
            secret: generated.secret,
            key_id,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 30).unwrap()
    }

    #[test]
    fn test_allowed_request() {
        let f = fixture(|k| k.with_limits(TierLimits::new(10, 50)));

        let decision = f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, noon())
            .unwrap();

        assert_eq!(
            decision,
            AuthDecision::Allowed {
                remaining_minute: 9,
                remaining_day: Some(49),
            }
        );
    }

    #[test]
    fn test_missing_key() {
        let f = fixture(|k| k);

        let decision = f
            .manager
            .authorize_at(None, "/generate", &Method::POST, noon())
            .unwrap();

        assert_eq!(decision, AuthDecision::denied(DenialReason::MissingKey));
    }

    #[test]
    fn test_unknown_key() {
        let f = fixture(|k| k);

        let decision = f
            .manager
            .authorize_at(Some("bsk_test_nope"), "/generate", &Method::POST, noon())
            .unwrap();

        assert_eq!(decision, AuthDecision::denied(DenialReason::InvalidKey));
    }

    #[test]
    fn test_revoked_key_always_denies() {
        let f = fixture(|mut k| {
            k.revoke();
            k
        });

        let decision = f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, noon())
            .unwrap();

        assert_eq!(decision, AuthDecision::denied(DenialReason::Revoked));
    }

    #[test]
    fn test_expired_key_denies_regardless_of_quota() {
        let f = fixture(|k| k.with_expiration(noon() - Duration::hours(1)));

        for _ in 0..3 {
            let decision = f
                .manager
                .authorize_at(Some(&f.secret), "/generate", &Method::POST, noon())
                .unwrap();
            assert_eq!(decision, AuthDecision::denied(DenialReason::Expired));
        }
    }

    #[test]
    fn test_daily_limit_boundary() {
        let f = fixture(|k| k.with_limits(TierLimits::new(1_000, 100)));
        let now = noon();

        for i in 0..100 {
            let decision = f
                .manager
                .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
                .unwrap();
            assert!(decision.is_allowed(), "call {i} should be allowed");
        }

        let denied = f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
            .unwrap();

        let anchor = f
            .store
            .get(&f.key_id)
            .unwrap()
            .unwrap()
            .counters()
            .daily_reset_anchor;

        assert_eq!(
            denied,
            AuthDecision::denied(DenialReason::RateLimited {
                window: RateWindow::Day,
                reset_at: anchor + Duration::hours(24),
            })
        );
    }

    #[test]
    fn test_daily_window_resets_after_24h() {
        let f = fixture(|k| k.with_limits(TierLimits::new(1_000, 5)));
        let day_one = noon();

        for _ in 0..5 {
            assert!(f
                .manager
                .authorize_at(Some(&f.secret), "/generate", &Method::POST, day_one)
                .unwrap()
                .is_allowed());
        }

        assert!(!f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, day_one)
            .unwrap()
            .is_allowed());

        // A day later the exhausted quota opens up again.
        let day_two = day_one + Duration::hours(25);
        let decision = f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, day_two)
            .unwrap();

        assert!(decision.is_allowed());

        let counters = f.store.get(&f.key_id).unwrap().unwrap().counters();
        assert_eq!(counters.daily_usage_count, 1);
        assert_eq!(counters.usage_count_total, 6);
    }

    #[test]
    fn test_minute_limit_boundary() {
        let f = fixture(|k| k.with_limits(TierLimits::new(10, TierLimits::UNLIMITED)));
        let now = noon();

        for i in 0..10 {
            let decision = f
                .manager
                .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
                .unwrap();
            assert!(decision.is_allowed(), "call {i} should be allowed");
        }

        let denied = f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
            .unwrap();

        assert_eq!(
            denied,
            AuthDecision::denied(DenialReason::RateLimited {
                window: RateWindow::Minute,
                reset_at: MinuteWindow::next_window_start(now),
            })
        );
    }

    #[test]
    fn test_unlimited_daily_reports_no_remaining() {
        let f = fixture(|k| k.with_limits(TierLimits::new(10, TierLimits::UNLIMITED)));

        let decision = f
            .manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, noon())
            .unwrap();

        assert_eq!(
            decision,
            AuthDecision::Allowed {
                remaining_minute: 9,
                remaining_day: None,
            }
        );
    }

    #[test]
    fn test_prefix_permission_scoping() {
        let f = fixture(|k| {
            k.with_permissions(PermissionSet::new([PermissionRule::prefix("/generate/")]))
        });

        let allowed = f
            .manager
            .authorize_at(Some(&f.secret), "/generate/y", &Method::POST, noon())
            .unwrap();
        assert!(allowed.is_allowed());

        let denied = f
            .manager
            .authorize_at(Some(&f.secret), "/lookup/x", &Method::GET, noon())
            .unwrap();
        assert_eq!(denied, AuthDecision::denied(DenialReason::PermissionDenied));
    }

    #[test]
    fn test_only_allowed_calls_are_recorded() {
        let f = fixture(|k| {
            k.with_limits(TierLimits::new(1_000, 2))
                .with_permissions(PermissionSet::new([PermissionRule::exact("/generate")]))
        });
        let now = noon();

        // One allowed, one permission denial, then quota denials.
        f.manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
            .unwrap();
        f.manager
            .authorize_at(Some(&f.secret), "/lookup", &Method::GET, now)
            .unwrap();
        f.manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
            .unwrap();
        f.manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
            .unwrap();

        assert_eq!(f.usage.count().unwrap(), 2);

        let counters = f.store.get(&f.key_id).unwrap().unwrap().counters();
        assert_eq!(counters.daily_usage_count, 2);
    }

    #[test]
    fn test_denials_do_not_touch_durable_counters() {
        let f = fixture(|k| {
            k.with_permissions(PermissionSet::new([PermissionRule::exact("/generate")]))
        });

        f.manager
            .authorize_at(Some(&f.secret), "/forbidden", &Method::GET, noon())
            .unwrap();

        let counters = f.store.get(&f.key_id).unwrap().unwrap().counters();
        assert_eq!(counters.daily_usage_count, 0);
        assert_eq!(counters.usage_count_total, 0);
    }

    #[test]
    fn test_usage_record_contents() {
        let f = fixture(|k| k);
        let now = noon();

        f.manager
            .authorize_at(Some(&f.secret), "/generate", &Method::POST, now)
            .unwrap();

        let records = f.usage.list_for_key(&f.key_id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "/generate");
        assert_eq!(records[0].method, "POST");
        assert_eq!(records[0].timestamp, now);
    }

    #[test]
    fn test_authorize_request_resolves_header_key() {
        let f = fixture(|k| k);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", f.secret.parse().unwrap());

        let decision = f
            .manager
            .authorize_request(&headers, None, "/generate", &Method::POST)
            .unwrap();
        assert!(decision.is_allowed());

        let missing = f
            .manager
            .authorize_request(&HeaderMap::new(), None, "/generate", &Method::POST)
            .unwrap();
        assert_eq!(missing, AuthDecision::denied(DenialReason::MissingKey));
    }

    #[test]
    fn test_concurrent_authorize_never_overshoots_daily_cap() {
        let f = fixture(|k| k.with_limits(TierLimits::new(100_000, 40)));
        let manager = Arc::new(f.manager);
        let now = noon();

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let secret = f.secret.clone();
                std::thread::spawn(move || {
                    let mut allowed = 0u32;
                    for _ in 0..20 {
                        let decision = manager
                            .authorize_at(Some(&secret), "/generate", &Method::POST, now)
                            .unwrap();
                        if decision.is_allowed() {
                            allowed += 1;
                        }
                    }
                    allowed
                })
            })
            .collect();

        let total: u32 = threads.into_iter().map(|t| t.join().unwrap()).sum();

        assert_eq!(total, 40);
        let counters = f.store.get(&f.key_id).unwrap().unwrap().counters();
        assert_eq!(counters.daily_usage_count, 40);
    }
}
