use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::api_key::{Tier, TierLimits};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub quota: QuotaConfig,
    pub generation: GenerationConfig,
    /// Published upstream rates, tokens per second per provider key
    pub providers: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Per-tier quota defaults
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    pub free: TierLimits,
    pub pro: TierLimits,
    pub enterprise: TierLimits,
}

impl QuotaConfig {
    /// Limits for a tier
    pub fn limits_for(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Pro => self.pro,
            Tier::Enterprise => self.enterprise,
        }
    }
}

/// Number synthesis settings
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Occurrence cap for a single digit value in the randomized body
    pub max_digit_repeat: u8,
    /// Attempts at a pattern-clean body before accepting one anyway
    pub max_attempts: u32,
    /// Cards allowed in one generation request
    pub max_cards_per_request: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free: Tier::Free.default_limits(),
            pro: Tier::Pro.default_limits(),
            enterprise: Tier::Enterprise.default_limits(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_digit_repeat: 2,
            max_attempts: 100,
            max_cards_per_request: 10,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("BINFORGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
