//! Derived card credentials
//!
//! Expiry dates follow the card category; security codes are derived
//! deterministically from the number and expiry, so a fixture card always
//! carries the same code.

use chrono::{DateTime, Datelike, Months, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::domain::card::Expiry;

/// Derives expiry dates and security codes for generated numbers
#[derive(Debug, Clone, Default)]
pub struct CredentialDeriver;

impl CredentialDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Pick an expiry for a card: 12-24 months out for prepaid cards,
    /// 36-60 months otherwise.
    pub fn expiry(&self, prepaid: bool) -> Expiry {
        self.expiry_with(prepaid, Utc::now(), &mut rand::thread_rng())
    }

    /// [`expiry`](Self::expiry) with explicit clock and RNG.
    pub fn expiry_with<R: Rng + ?Sized>(
        &self,
        prepaid: bool,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Expiry {
        let months = if prepaid {
            rng.gen_range(12..=24)
        } else {
            rng.gen_range(36..=60)
        };

        let date = now.checked_add_months(Months::new(months)).unwrap_or(now);

        Expiry {
            month: date.month(),
            year: date.year(),
        }
    }

    /// Derive the security code for `(number, expiry)`.
    ///
    /// The code is the leading digit characters of sha256 over the number
    /// concatenated with the rendered expiry; when a digest runs short of
    /// digits it is re-hashed, so the derivation stays deterministic.
    /// Numbers in the Amex range (34/37) get 4 digits, everything else 3.
    pub fn security_code(&self, number: &str, expiry: Expiry) -> String {
        let length = if number.starts_with("34") || number.starts_with("37") {
            4
        } else {
            3
        };

        let mut material = format!("{number}{expiry}");
        let mut code = String::with_capacity(length);

        while code.len() < length {
            let digest = hex::encode(Sha256::digest(material.as_bytes()));
            code.extend(
                digest
                    .chars()
                    .filter(char::is_ascii_digit)
                    .take(length - code.len()),
            );
            material = digest;
        }

        code
    }
}
