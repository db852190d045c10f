//! Checksum-valid number synthesis
//!
//! Builds candidate numbers from a BIN prefix: the body digits are drawn
//! from a fixed weighting (0-5 twice as likely as 6-9) with a per-digit
//! occurrence cap, shuffled, and re-drawn while the body contains a
//! forbidden run. The Luhn check digit is appended last.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::error;

use crate::domain::card::{luhn, normalize_prefix, GenerationError};

/// Shortest supported full number length.
const MIN_TARGET_LENGTH: usize = 12;

/// Longest supported full number length.
const MAX_TARGET_LENGTH: usize = 19;

/// Synthesizer for checksum-valid card numbers
#[derive(Debug, Clone)]
pub struct NumberSynthesizer {
    /// Occurrence cap for any single digit value in the body
    max_digit_repeat: u8,
    /// Attempts at a body free of forbidden runs before accepting one anyway
    max_attempts: u32,
}

impl Default for NumberSynthesizer {
    fn default() -> Self {
        Self {
            max_digit_repeat: 2,
            max_attempts: 100,
        }
    }
}

impl NumberSynthesizer {
    pub fn new(max_digit_repeat: u8, max_attempts: u32) -> Self {
        Self {
            max_digit_repeat,
            max_attempts,
        }
    }

    /// Synthesize a number of exactly `target_length` digits starting with
    /// `prefix`.
    pub fn synthesize(&self, prefix: &str, target_length: usize) -> Result<String, GenerationError> {
        self.synthesize_with(prefix, target_length, &mut rand::thread_rng())
    }

    /// [`synthesize`](Self::synthesize) with a caller-supplied RNG, so test
    /// fixtures can be reproduced from a seed.
    pub fn synthesize_with<R: Rng + ?Sized>(
        &self,
        prefix: &str,
        target_length: usize,
        rng: &mut R,
    ) -> Result<String, GenerationError> {
        let prefix = normalize_prefix(prefix)?;

        if !(MIN_TARGET_LENGTH..=MAX_TARGET_LENGTH).contains(&target_length) {
            return Err(GenerationError::unsupported_length(prefix, target_length));
        }

        // One position is reserved for the check digit.
        let body_len = match target_length.checked_sub(prefix.len() + 1) {
            Some(len) => len,
            None => return Err(GenerationError::unsupported_length(prefix, target_length)),
        };

        let mut body = self.draw_body(body_len, rng);
        for _ in 0..self.max_attempts {
            if !has_forbidden_run(&body) {
                break;
            }
            body = self.draw_body(body_len, rng);
        }
        // After max_attempts the last candidate is accepted as-is; the run
        // constraints are best-effort, not a guarantee.

        let mut partial: Vec<u8> = prefix
            .bytes()
            .map(|b| b - b'0')
            .collect();
        partial.extend_from_slice(&body);

        let check = match luhn::check_digit(&partial) {
            Some(digit) => digit,
            None => {
                // Unreachable under correct mod-10 arithmetic.
                error!(prefix = %prefix, "no Luhn check digit found for candidate");
                return Err(GenerationError::ChecksumSearchExhausted);
            }
        };
        partial.push(check);

        Ok(partial.iter().map(|d| char::from(b'0' + d)).collect())
    }

    /// Draw and shuffle one candidate body.
    fn draw_body<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> Vec<u8> {
        let cap = self.max_digit_repeat;
        let mut counts = [0u8; 10];
        let mut body = Vec::with_capacity(len);

        for _ in 0..len {
            let mut digit = weighted_digit(rng);

            if counts[digit as usize] >= cap {
                let alternatives: Vec<u8> =
                    (0..10u8).filter(|&d| counts[d as usize] < cap).collect();
                digit = match weighted_pick(&alternatives, rng) {
                    Some(d) => d,
                    // Every value is at its cap; fall back to uniform.
                    None => rng.gen_range(0..10),
                };
            }

            counts[digit as usize] += 1;
            body.push(digit);
        }

        body.shuffle(rng);
        body
    }
}

/// Draw a digit with 0-5 weighted twice as likely as 6-9.
fn weighted_digit<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    // 16 slots: two per low digit, one per high digit.
    let slot = rng.gen_range(0..16u8);
    if slot < 12 { slot / 2 } else { slot - 6 }
}

/// Weighted draw restricted to `candidates`; `None` when empty.
fn weighted_pick<R: Rng + ?Sized>(candidates: &[u8], rng: &mut R) -> Option<u8> {
    let weight = |d: u8| if d < 6 { 2u32 } else { 1 };
    let total: u32 = candidates.iter().map(|&d| weight(d)).sum();

    if total == 0 {
        return None;
    }

    let mut roll = rng.gen_range(0..total);
    for &d in candidates {
        let w = weight(d);
        if roll < w {
            return Some(d);
        }
        roll -= w;
    }

    None
}

/// Three identical digits in a row, or three strictly ascending or
/// descending consecutive digits.
fn has_forbidden_run(body: &[u8]) -> bool {
    body.windows(3).any(|w| {
        let (a, b, c) = (i16::from(w[0]), i16::from(w[1]), i16::from(w[2]));
        (a == b && b == c) || (b == a + 1 && c == b + 1) || (b == a - 1 && c == b - 1)
    })
}
