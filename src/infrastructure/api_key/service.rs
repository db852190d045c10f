//! API key lifecycle service
//!
//! Issues and administers keys. The plaintext secret is returned exactly
//! once, at issue time; only its hash is stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::QuotaConfig;
use crate::domain::api_key::{
    ApiKey, ApiKeyId, PermissionSet, QuotaStore, Tier, TierLimits,
};
use crate::domain::DomainError;

use super::generator::KeyGenerator;

/// Result of issuing a new API key
#[derive(Debug)]
pub struct IssuedKey {
    /// The stored key entity (holds only the hash)
    pub api_key: ApiKey,
    /// The full secret; not recoverable later
    pub secret: String,
}

/// Administrative operations over API keys
#[derive(Debug)]
pub struct ApiKeyService {
    store: Arc<dyn QuotaStore>,
    generator: KeyGenerator,
    quota_defaults: QuotaConfig,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self {
            store,
            generator: KeyGenerator::live(),
            quota_defaults: QuotaConfig::default(),
        }
    }

    /// Use a custom secret generator (e.g. the sandbox prefix)
    pub fn with_generator(mut self, generator: KeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Use configured per-tier limits instead of the built-in defaults
    pub fn with_quota_defaults(mut self, quota_defaults: QuotaConfig) -> Self {
        self.quota_defaults = quota_defaults;
        self
    }

    /// Issue a new key under `tier` with its default limits
    pub fn issue(
        &self,
        id: ApiKeyId,
        owner_id: impl Into<String>,
        tier: Tier,
        permissions: PermissionSet,
    ) -> Result<IssuedKey, DomainError> {
        let owner_id = owner_id.into();
        info!(key_id = %id, owner = %owner_id, %tier, "Issuing API key");

        let generated = self.generator.generate();
        let api_key = ApiKey::new(
            id,
            owner_id,
            tier,
            &generated.hash,
            &generated.display_prefix,
        )
        .with_permissions(permissions)
        .with_limits(self.quota_defaults.limits_for(tier));

        let created = self.store.create(api_key)?;

        Ok(IssuedKey {
            api_key: created,
            secret: generated.secret,
        })
    }

    /// Get a key by ID
    pub fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.store.get(id)
    }

    /// List keys, optionally for one owner
    pub fn list(&self, owner_id: Option<&str>) -> Result<Vec<ApiKey>, DomainError> {
        self.store.list(owner_id)
    }

    /// Revoke a key; it stays stored and always denies
    pub fn revoke(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Revoking API key");

        let mut key = self.require(id)?;
        key.revoke();
        self.store.update(&key)
    }

    /// Reactivate a revoked key
    pub fn reactivate(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Reactivating API key");

        let mut key = self.require(id)?;
        key.activate();
        self.store.update(&key)
    }

    /// Delete a key outright
    pub fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        info!(key_id = %id, "Deleting API key");
        self.store.delete(id)
    }

    /// Replace a key's permission rules
    pub fn update_permissions(
        &self,
        id: &ApiKeyId,
        permissions: PermissionSet,
    ) -> Result<ApiKey, DomainError> {
        let mut key = self.require(id)?;
        key.set_permissions(permissions);
        self.store.update(&key)
    }

    /// Replace a key's quota limits
    pub fn update_limits(&self, id: &ApiKeyId, limits: TierLimits) -> Result<ApiKey, DomainError> {
        let mut key = self.require(id)?;
        key.set_limits(limits);
        self.store.update(&key)
    }

    /// Set or clear a key's expiration
    pub fn update_expiration(
        &self,
        id: &ApiKeyId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey, DomainError> {
        let mut key = self.require(id)?;
        key.set_expiration(expires_at);
        self.store.update(&key)
    }

    fn require(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        self.store
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("API key '{id}' not found")))
    }
}
