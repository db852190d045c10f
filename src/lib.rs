//! BINForge
//!
//! A quota-governed synthetic test card engine:
//! - BIN-aware, checksum-valid number synthesis with derived expiry,
//!   security code and optional AVS postal data
//! - tiered API key authorization with per-minute and per-day windows
//! - token-bucket throttling for metered upstream datasets
//!
//! Everything here is synchronous and bounded: authorization performs one
//! durable read-modify-write plus one in-memory counter update, synthesis
//! stops at a fixed attempt cap, and denials are immediate typed values.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::bin::BinRepository;
use infrastructure::api_key::{ApiKeyService, InMemoryQuotaStore, QuotaManager};
use infrastructure::bin::ThrottledBinRepository;
use infrastructure::generation::{CardGenerationService, NumberSynthesizer};
use infrastructure::rate_limit::TokenBucketRegistry;
use infrastructure::usage::InMemoryUsageLog;

/// Provider key for the upstream BIN metadata dataset.
pub const BIN_DATASET_PROVIDER: &str = "bin-dataset";

/// Fully wired engine
pub struct Engine {
    /// Key lifecycle administration
    pub api_keys: ApiKeyService,
    /// Authorization entry point
    pub quota: Arc<QuotaManager>,
    /// Quota-gated generation
    pub cards: CardGenerationService,
    /// Outbound-call buckets, one per provider
    pub buckets: Arc<TokenBucketRegistry>,
    /// Usage log backing the quota manager
    pub usage_log: Arc<InMemoryUsageLog>,
}

/// Wire the engine from configuration and a BIN metadata source.
///
/// When the configuration publishes a rate for [`BIN_DATASET_PROVIDER`],
/// lookups are routed through a token-bucket guard at that rate.
pub fn build_engine(config: &AppConfig, bins: Arc<dyn BinRepository>) -> Engine {
    let store = Arc::new(InMemoryQuotaStore::new());
    let usage_log = Arc::new(InMemoryUsageLog::new());
    let quota = Arc::new(QuotaManager::new(store.clone(), usage_log.clone()));

    let buckets = Arc::new(TokenBucketRegistry::new());
    for (provider, rate) in &config.providers {
        buckets.register(provider.clone(), *rate);
    }

    let bins: Arc<dyn BinRepository> = if config.providers.contains_key(BIN_DATASET_PROVIDER) {
        Arc::new(ThrottledBinRepository::new(
            bins,
            buckets.clone(),
            BIN_DATASET_PROVIDER,
        ))
    } else {
        bins
    };

    let synthesizer = NumberSynthesizer::new(
        config.generation.max_digit_repeat,
        config.generation.max_attempts,
    );

    let cards = CardGenerationService::new(quota.clone(), bins)
        .with_synthesizer(synthesizer)
        .with_max_cards_per_request(config.generation.max_cards_per_request);

    let api_keys = ApiKeyService::new(store).with_quota_defaults(config.quota.clone());

    Engine {
        api_keys,
        quota,
        cards,
        buckets,
        usage_log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    use domain::api_key::{ApiKeyId, PermissionSet, Tier};
    use domain::bin::BinRecord;
    use domain::card::luhn;
    use domain::usage::UsageLogRepository;
    use infrastructure::bin::InMemoryBinRepository;
    use infrastructure::generation::{GenerateRequest, GenerateResponse};

    fn engine() -> Engine {
        let bins = Arc::new(InMemoryBinRepository::with_records([BinRecord::new(
            "413567", "VISA",
        )]));
        build_engine(&AppConfig::default(), bins)
    }

    #[test]
    fn test_end_to_end_issue_authorize_generate() {
        let engine = engine();

        let issued = engine
            .api_keys
            .issue(
                ApiKeyId::new("e2e-key").unwrap(),
                "owner-1",
                Tier::Pro,
                PermissionSet::allow_all(),
            )
            .unwrap();

        let decision = engine
            .quota
            .authorize(Some(&issued.secret), "/lookup/413567", &Method::GET)
            .unwrap();
        assert!(decision.is_allowed());

        let response = engine
            .cards
            .generate(
                Some(&issued.secret),
                &GenerateRequest::new("413567").with_count(2),
            )
            .unwrap();

        match response {
            GenerateResponse::Generated { cards, .. } => {
                assert_eq!(cards.len(), 2);
                for card in cards {
                    assert!(luhn::is_valid_str(&card.number));
                }
            }
            GenerateResponse::Denied { reason } => panic!("unexpected denial: {reason:?}"),
        }

        // Authorize + generation each consumed one daily unit.
        assert_eq!(engine.usage_log.count().unwrap(), 2);
    }

    #[test]
    fn test_configured_provider_rate_throttles_lookups() {
        let mut config = AppConfig::default();
        config.providers.insert(BIN_DATASET_PROVIDER.to_string(), 1.0);

        let bins = Arc::new(InMemoryBinRepository::with_records([BinRecord::new(
            "413567", "VISA",
        )]));
        let engine = build_engine(&config, bins);

        let issued = engine
            .api_keys
            .issue(
                ApiKeyId::new("throttle-key").unwrap(),
                "owner-1",
                Tier::Enterprise,
                PermissionSet::allow_all(),
            )
            .unwrap();

        // The first generate spends the dataset permit; the second finds the
        // bucket empty and surfaces a provider error.
        let first = engine
            .cards
            .generate(Some(&issued.secret), &GenerateRequest::new("413567"));
        assert!(matches!(first, Ok(GenerateResponse::Generated { .. })));

        let second = engine
            .cards
            .generate(Some(&issued.secret), &GenerateRequest::new("413567"));
        assert!(second.is_err());
    }
}
