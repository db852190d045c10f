//! BIN prefix validation

use super::GenerationError;

/// Longest accepted BIN prefix.
pub const MAX_PREFIX_LEN: usize = 8;

/// Shortest prefix used for number synthesis; shorter input is right-padded.
pub const MIN_PREFIX_LEN: usize = 6;

/// Validate a BIN prefix and normalize it to at least six digits.
///
/// Accepts 1-8 digits; anything shorter than six is right-padded with zeros,
/// mirroring how partial prefixes are treated upstream.
pub fn normalize_prefix(prefix: &str) -> Result<String, GenerationError> {
    let trimmed = prefix.trim();

    if trimmed.is_empty() {
        return Err(GenerationError::invalid_prefix("prefix is empty"));
    }

    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(GenerationError::invalid_prefix(format!(
            "prefix '{trimmed}' contains non-digit characters"
        )));
    }

    if trimmed.len() > MAX_PREFIX_LEN {
        return Err(GenerationError::invalid_prefix(format!(
            "prefix '{trimmed}' exceeds {MAX_PREFIX_LEN} digits"
        )));
    }

    let mut normalized = trimmed.to_string();
    while normalized.len() < MIN_PREFIX_LEN {
        normalized.push('0');
    }

    Ok(normalized)
}
