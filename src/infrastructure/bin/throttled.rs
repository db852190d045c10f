//! Rate-limited BIN repository decorator
//!
//! Wraps any [`BinRepository`] and spends a token-bucket permit before
//! delegating, so lookups against a metered upstream dataset stay inside its
//! published rate. A throttle denial surfaces immediately as a provider
//! error; the caller decides whether and when to come back.

use std::sync::Arc;

use tracing::debug;

use crate::domain::bin::{BinRecord, BinRepository};
use crate::domain::DomainError;
use crate::infrastructure::rate_limit::TokenBucketRegistry;

/// Token-bucket guarded [`BinRepository`]
pub struct ThrottledBinRepository {
    inner: Arc<dyn BinRepository>,
    buckets: Arc<TokenBucketRegistry>,
    provider_key: String,
}

impl ThrottledBinRepository {
    pub fn new(
        inner: Arc<dyn BinRepository>,
        buckets: Arc<TokenBucketRegistry>,
        provider_key: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            buckets,
            provider_key: provider_key.into(),
        }
    }
}

impl BinRepository for ThrottledBinRepository {
    fn lookup(&self, bin: &str) -> Result<Option<BinRecord>, DomainError> {
        if !self.buckets.allow(&self.provider_key) {
            debug!(provider = %self.provider_key, "BIN lookup throttled");
            return Err(DomainError::provider(
                &self.provider_key,
                "upstream rate limit reached",
            ));
        }

        self.inner.lookup(bin)
    }
}
