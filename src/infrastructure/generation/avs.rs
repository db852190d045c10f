//! AVS postal data
//!
//! A static per-country pool of metropolitan postal codes attached to
//! generated cards when address-verification data is requested.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;

static POSTAL_CODES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        // NYC, LA, Chicago, SF, Miami
        ("US", &["10001", "90210", "60601", "94102", "33101"] as &[_]),
        // Rome, Milan, Naples, Bologna, Florence
        ("IT", &["00100", "20100", "80100", "40100", "50100"] as &[_]),
        // London, Manchester, Birmingham, Liverpool, Cardiff
        ("GB", &["SW1A 1AA", "M1 1AA", "B1 1AA", "L1 1AA", "CF1 1AA"] as &[_]),
        // Toronto, Vancouver, Calgary, Montreal, Ottawa
        ("CA", &["M5H 2N2", "V6B 1A1", "T2P 1J9", "H2Y 1A6", "K1A 0A6"] as &[_]),
        // Sydney, Melbourne, Brisbane, Adelaide, Perth
        ("AU", &["2000", "3000", "4000", "5000", "6000"] as &[_]),
        // Berlin, Hamburg, Munich, Cologne, Dresden
        ("DE", &["10115", "20095", "80331", "50667", "01067"] as &[_]),
        // Paris, Lyon, Marseille, Toulouse, Lille
        ("FR", &["75001", "69001", "13001", "31000", "59000"] as &[_]),
    ])
});

/// Whether AVS postal data exists for a country code.
pub fn supports_country(country: &str) -> bool {
    POSTAL_CODES.contains_key(country.to_ascii_uppercase().as_str())
}

/// Pick a postal code for `country`, `None` when unsupported.
pub fn postal_code_for<R: Rng + ?Sized>(country: &str, rng: &mut R) -> Option<&'static str> {
    POSTAL_CODES
        .get(country.to_ascii_uppercase().as_str())
        .and_then(|codes| codes.choose(rng))
        .copied()
}
