//! Card generation service
//!
//! The exposed generation operation: authorizes the presented key once per
//! logical request, then synthesizes up to `count` cards with derived
//! credentials and optional AVS postal data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::Method;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::api_key::{AuthDecision, DenialReason};
use crate::domain::bin::{is_reserved_sandbox_bin, BinRecord, BinRepository};
use crate::domain::card::{normalize_prefix, GeneratedCard, GenerationError};
use crate::domain::DomainError;
use crate::infrastructure::api_key::QuotaManager;

use super::avs;
use super::credentials::CredentialDeriver;
use super::synthesizer::NumberSynthesizer;

/// Endpoint path generation requests are authorized against.
pub const GENERATE_ENDPOINT: &str = "/generate";

/// Target length used when no BIN metadata is available.
const DEFAULT_TARGET_LENGTH: usize = 16;

/// A generation request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// BIN prefix to generate from
    pub prefix: String,
    /// Number of cards requested
    pub count: u32,
    /// Attach AVS postal data for this country
    pub avs_country: Option<String>,
}

impl GenerateRequest {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            count: 1,
            avs_country: None,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_avs_country(mut self, country: impl Into<String>) -> Self {
        self.avs_country = Some(country.into());
        self
    }
}

/// Failure of a generation request
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Outcome of a generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerateResponse {
    /// Cards were generated
    Generated {
        cards: Vec<GeneratedCard>,
        remaining_minute: u32,
        remaining_day: Option<i64>,
    },
    /// The quota layer rejected the request
    Denied { reason: DenialReason },
}

/// Quota-gated card generation
pub struct CardGenerationService {
    quota: Arc<QuotaManager>,
    bins: Arc<dyn BinRepository>,
    synthesizer: NumberSynthesizer,
    deriver: CredentialDeriver,
    max_cards_per_request: u32,
}

impl CardGenerationService {
    pub fn new(quota: Arc<QuotaManager>, bins: Arc<dyn BinRepository>) -> Self {
        Self {
            quota,
            bins,
            synthesizer: NumberSynthesizer::default(),
            deriver: CredentialDeriver::new(),
            max_cards_per_request: 10,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: NumberSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_max_cards_per_request(mut self, max: u32) -> Self {
        self.max_cards_per_request = max;
        self
    }

    /// Generate cards for a request presented with `presented_secret`.
    ///
    /// The quota layer is consulted exactly once per logical request,
    /// regardless of `count`.
    pub fn generate(
        &self,
        presented_secret: Option<&str>,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, GenerateError> {
        self.generate_with(presented_secret, request, Utc::now(), &mut rand::thread_rng())
    }

    /// [`generate`](Self::generate) with explicit clock and RNG.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        presented_secret: Option<&str>,
        request: &GenerateRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GenerateResponse, GenerateError> {
        // Malformed requests fail before any quota is charged.
        if request.count == 0 || request.count > self.max_cards_per_request {
            return Err(DomainError::validation(format!(
                "count must be between 1 and {}",
                self.max_cards_per_request
            ))
            .into());
        }

        let prefix = normalize_prefix(&request.prefix)?;

        if is_reserved_sandbox_bin(&prefix) {
            return Err(GenerationError::blocked_bin(&prefix[..6]).into());
        }

        if let Some(country) = request.avs_country.as_deref() {
            if !avs::supports_country(country) {
                return Err(GenerationError::unsupported_avs_country(country).into());
            }
        }

        let decision =
            self.quota
                .authorize_at(presented_secret, GENERATE_ENDPOINT, &Method::POST, now)?;

        let (remaining_minute, remaining_day) = match decision {
            AuthDecision::Allowed {
                remaining_minute,
                remaining_day,
            } => (remaining_minute, remaining_day),
            AuthDecision::Denied { reason } => {
                return Ok(GenerateResponse::Denied { reason });
            }
        };

        // Metadata only tunes length and expiry; generation proceeds with
        // defaults when the BIN is not in the dataset.
        let record = self.bins.lookup(&prefix)?;
        if record.is_none() {
            debug!(%prefix, "no BIN metadata; generating with defaults");
        }

        let prepaid = record.as_ref().is_some_and(BinRecord::is_prepaid);

        let mut cards = Vec::with_capacity(request.count as usize);
        for _ in 0..request.count {
            cards.push(self.generate_card(&prefix, record.as_ref(), prepaid, request, now, rng)?);
        }

        Ok(GenerateResponse::Generated {
            cards,
            remaining_minute,
            remaining_day,
        })
    }

    fn generate_card<R: Rng + ?Sized>(
        &self,
        prefix: &str,
        record: Option<&BinRecord>,
        prepaid: bool,
        request: &GenerateRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GeneratedCard, GenerateError> {
        let target_length = record
            .map(|r| r.pick_target_length(rng))
            .unwrap_or(DEFAULT_TARGET_LENGTH);

        let number = self.synthesizer.synthesize_with(prefix, target_length, rng)?;
        let expiry = self.deriver.expiry_with(prepaid, now, rng);
        let security_code = self.deriver.security_code(&number, expiry);

        let postal_code = request
            .avs_country
            .as_deref()
            .and_then(|country| avs::postal_code_for(country, rng))
            .map(str::to_string);

        Ok(GeneratedCard {
            number,
            security_code,
            expiry,
            postal_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::domain::api_key::{ApiKeyId, PermissionSet, QuotaStore, Tier, TierLimits};
    use crate::domain::card::luhn;
    use crate::infrastructure::api_key::{ApiKeyService, InMemoryQuotaStore, KeyGenerator};
    use crate::infrastructure::bin::InMemoryBinRepository;
    use crate::infrastructure::usage::InMemoryUsageLog;

    struct Fixture {
        service: CardGenerationService,
        store: Arc<InMemoryQuotaStore>,
        secret: String,
        key_id: ApiKeyId,
    }

    fn fixture() -> Fixture {
        fixture_with_limits(TierLimits::new(100, 1_000))
    }

    fn fixture_with_limits(limits: TierLimits) -> Fixture {
        let store = Arc::new(InMemoryQuotaStore::new());
        let usage = Arc::new(InMemoryUsageLog::new());
        let quota = Arc::new(QuotaManager::new(store.clone(), usage));

        let keys = ApiKeyService::new(store.clone()).with_generator(KeyGenerator::sandbox());
        let issued = keys
            .issue(
                ApiKeyId::new("gen-key").unwrap(),
                "owner-1",
                Tier::Pro,
                PermissionSet::allow_all(),
            )
            .unwrap();
        keys.update_limits(issued.api_key.id(), limits).unwrap();

        let bins = Arc::new(InMemoryBinRepository::with_records([
            BinRecord::new("413567", "VISA").with_country("US", "United States"),
            BinRecord::new("371442", "AMERICAN EXPRESS"),
            BinRecord::new("440393", "VISA").with_category("PREPAID"),
        ]));

        Fixture {
            service: CardGenerationService::new(quota, bins),
            store,
            secret: issued.secret,
            key_id: ApiKeyId::new("gen-key").unwrap(),
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 30).unwrap()
    }

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn generated(response: GenerateResponse) -> Vec<GeneratedCard> {
        match response {
            GenerateResponse::Generated { cards, .. } => cards,
            GenerateResponse::Denied { reason } => panic!("unexpected denial: {reason:?}"),
        }
    }

    #[test]
    fn test_generates_valid_cards() {
        let f = fixture();
        let request = GenerateRequest::new("413567").with_count(3);

        let cards = generated(
            f.service
                .generate_with(Some(&f.secret), &request, noon(), &mut rng(1))
                .unwrap(),
        );

        assert_eq!(cards.len(), 3);
        for card in &cards {
            assert_eq!(card.number.len(), 16);
            assert!(card.number.starts_with("413567"));
            assert!(luhn::is_valid_str(&card.number));
            assert_eq!(card.security_code.len(), 3);
            assert!(card.postal_code.is_none());
        }
    }

    #[test]
    fn test_amex_bin_gets_fifteen_digits_and_long_code() {
        let f = fixture();
        let request = GenerateRequest::new("371442");

        let cards = generated(
            f.service
                .generate_with(Some(&f.secret), &request, noon(), &mut rng(2))
                .unwrap(),
        );

        assert_eq!(cards[0].number.len(), 15);
        assert_eq!(cards[0].security_code.len(), 4);
    }

    #[test]
    fn test_prepaid_bin_gets_short_expiry() {
        let f = fixture();
        let request = GenerateRequest::new("440393");

        let cards = generated(
            f.service
                .generate_with(Some(&f.secret), &request, noon(), &mut rng(3))
                .unwrap(),
        );

        let expiry = cards[0].expiry;
        let months = (expiry.year - 2024) * 12 + expiry.month as i32 - 6;
        assert!((12..=24).contains(&months));
    }

    #[test]
    fn test_security_codes_are_rederivable() {
        let f = fixture();
        let request = GenerateRequest::new("413567");

        let cards = generated(
            f.service
                .generate_with(Some(&f.secret), &request, noon(), &mut rng(4))
                .unwrap(),
        );

        let deriver = CredentialDeriver::new();
        assert_eq!(
            cards[0].security_code,
            deriver.security_code(&cards[0].number, cards[0].expiry)
        );
    }

    #[test]
    fn test_avs_postal_code_attached() {
        let f = fixture();
        let request = GenerateRequest::new("413567").with_avs_country("US");

        let cards = generated(
            f.service
                .generate_with(Some(&f.secret), &request, noon(), &mut rng(5))
                .unwrap(),
        );

        let postal = cards[0].postal_code.as_deref().unwrap();
        assert!(["10001", "90210", "60601", "94102", "33101"].contains(&postal));
    }

    #[test]
    fn test_unsupported_avs_country_fails_before_quota() {
        let f = fixture();
        let request = GenerateRequest::new("413567").with_avs_country("JP");

        let result = f
            .service
            .generate_with(Some(&f.secret), &request, noon(), &mut rng(6));

        assert!(matches!(
            result,
            Err(GenerateError::Generation(
                GenerationError::UnsupportedAvsCountry { .. }
            ))
        ));

        let counters = f.store.get(&f.key_id).unwrap().unwrap().counters();
        assert_eq!(counters.daily_usage_count, 0);
    }

    #[test]
    fn test_blocked_bin_rejected() {
        let f = fixture();
        let request = GenerateRequest::new("411111");

        let result = f
            .service
            .generate_with(Some(&f.secret), &request, noon(), &mut rng(7));

        assert!(matches!(
            result,
            Err(GenerateError::Generation(GenerationError::BlockedBin { .. }))
        ));
    }

    #[test]
    fn test_count_bounds() {
        let f = fixture();

        let zero = GenerateRequest::new("413567").with_count(0);
        assert!(f
            .service
            .generate_with(Some(&f.secret), &zero, noon(), &mut rng(8))
            .is_err());

        let too_many = GenerateRequest::new("413567").with_count(11);
        assert!(f
            .service
            .generate_with(Some(&f.secret), &too_many, noon(), &mut rng(8))
            .is_err());
    }

    #[test]
    fn test_unknown_bin_defaults_to_sixteen_digits() {
        let f = fixture();
        let request = GenerateRequest::new("529962");

        let cards = generated(
            f.service
                .generate_with(Some(&f.secret), &request, noon(), &mut rng(9))
                .unwrap(),
        );

        assert_eq!(cards[0].number.len(), 16);
    }

    #[test]
    fn test_one_authorize_per_logical_request() {
        let f = fixture();
        let request = GenerateRequest::new("413567").with_count(5);

        f.service
            .generate_with(Some(&f.secret), &request, noon(), &mut rng(10))
            .unwrap();

        let counters = f.store.get(&f.key_id).unwrap().unwrap().counters();
        assert_eq!(counters.daily_usage_count, 1);
    }

    #[test]
    fn test_denial_is_surfaced_not_raised() {
        let f = fixture_with_limits(TierLimits::new(100, 0));
        let request = GenerateRequest::new("413567");

        let response = f
            .service
            .generate_with(Some(&f.secret), &request, noon(), &mut rng(11))
            .unwrap();

        match response {
            GenerateResponse::Denied {
                reason: DenialReason::RateLimited { .. },
            } => {}
            other => panic!("expected rate-limit denial, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_key_denied() {
        let f = fixture();
        let request = GenerateRequest::new("413567");

        let response = f
            .service
            .generate_with(None, &request, noon(), &mut rng(12))
            .unwrap();

        assert_eq!(
            response,
            GenerateResponse::Denied {
                reason: DenialReason::MissingKey
            }
        );
    }
}
