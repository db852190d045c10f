//! Generated card entity and related value types

use serde::{Deserialize, Serialize};

/// Card expiry as a month/year pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expiry {
    /// Month, 1-12
    pub month: u32,
    /// Four-digit year
    pub year: i32,
}

impl Expiry {
    /// Create a new expiry after validating the month
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { month, year })
        } else {
            None
        }
    }
}

impl std::fmt::Display for Expiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// A fully assembled synthetic test card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard {
    /// Full card number including the Luhn check digit
    pub number: String,
    /// Derived 3- or 4-digit security code
    pub security_code: String,
    /// Derived expiry
    pub expiry: Expiry,
    /// AVS postal code, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl GeneratedCard {
    /// The issuing BIN (leading six digits) of the number
    pub fn bin(&self) -> &str {
        let end = 6.min(self.number.len());
        &self.number[..end]
    }

    /// Render the number in display groups.
    ///
    /// 15-digit numbers use the 4-6-5 grouping, everything else groups of 4.
    pub fn formatted_number(&self) -> String {
        let n = &self.number;

        if n.len() == 15 {
            format!("{} {} {}", &n[..4], &n[4..10], &n[10..])
        } else {
            n.as_bytes()
                .chunks(4)
                .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}
