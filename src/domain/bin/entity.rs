//! BIN metadata entity
//!
//! A `BinRecord` is read-only collaborator data: the engine only consults it
//! to pick the target number length and the security-code family.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Well-known sandbox BINs that must never be used as generation prefixes.
static RESERVED_SANDBOX_BINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "411111", "555555", "378282", "378734", "371449", "601111", "630495", "630490", "360000",
        "305693", "385200", "601100", "353011", "356600",
    ])
});

/// Check whether a prefix starts with a reserved sandbox BIN.
pub fn is_reserved_sandbox_bin(prefix: &str) -> bool {
    let bin = &prefix[..6.min(prefix.len())];
    RESERVED_SANDBOX_BINS.contains(bin)
}

/// Issuer metadata attached to a six-digit BIN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRecord {
    /// Six-digit BIN
    pub bin: String,
    /// Card brand (e.g. "VISA", "AMERICAN EXPRESS")
    pub brand: String,
    /// Issuing bank name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Card category (e.g. "CREDIT", "DEBIT", "PREPAID")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Country display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
}

impl BinRecord {
    pub fn new(bin: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            brand: brand.into(),
            issuer: None,
            category: None,
            country_code: None,
            country_name: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_country(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self.country_name = Some(name.into());
        self
    }

    /// Whether the record describes a prepaid card
    pub fn is_prepaid(&self) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.to_ascii_uppercase().contains("PREPAID"))
    }

    /// Pick the target number length for this brand.
    ///
    /// Amex numbers are 15 digits; Diners and Discover issue more than one
    /// length, so those draw from the brand's published set.
    pub fn pick_target_length<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let brand = self.brand.to_ascii_uppercase();

        if brand.contains("AMERICAN EXPRESS") || brand.contains("AMEX") {
            15
        } else if brand.contains("DINERS") {
            [14, 16].choose(rng).copied().unwrap_or(16)
        } else if brand.contains("DISCOVER") {
            [16, 19].choose(rng).copied().unwrap_or(16)
        } else {
            16
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_reserved_sandbox_bins() {
        assert!(is_reserved_sandbox_bin("411111"));
        assert!(is_reserved_sandbox_bin("41111100"));
        assert!(!is_reserved_sandbox_bin("413567"));
    }

    #[test]
    fn test_prepaid_detection() {
        let record = BinRecord::new("413567", "VISA").with_category("PREPAID");
        assert!(record.is_prepaid());

        let record = BinRecord::new("413567", "VISA").with_category("credit");
        assert!(!record.is_prepaid());

        let record = BinRecord::new("413567", "VISA");
        assert!(!record.is_prepaid());
    }

    #[test]
    fn test_amex_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let record = BinRecord::new("371449", "AMERICAN EXPRESS");
        assert_eq!(record.pick_target_length(&mut rng), 15);
    }

    #[test]
    fn test_default_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let record = BinRecord::new("413567", "VISA");
        assert_eq!(record.pick_target_length(&mut rng), 16);
    }

    #[test]
    fn test_diners_lengths_stay_in_published_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let record = BinRecord::new("360001", "DINERS CLUB");

        for _ in 0..50 {
            let len = record.pick_target_length(&mut rng);
            assert!(len == 14 || len == 16);
        }
    }

    #[test]
    fn test_discover_lengths_stay_in_published_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let record = BinRecord::new("601101", "DISCOVER");

        for _ in 0..50 {
            let len = record.pick_target_length(&mut rng);
            assert!(len == 16 || len == 19);
        }
    }
}
