//! API key identifier validation

use thiserror::Error;

const MAX_KEY_ID_LEN: usize = 50;

/// Errors raised while validating an API key identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyIdError {
    #[error("key ID cannot be empty")]
    Empty,

    #[error("key ID exceeds {MAX_KEY_ID_LEN} characters")]
    TooLong,

    #[error("key ID must start and end with a letter or digit")]
    InvalidEdge,

    #[error("key ID contains invalid character '{0}'; only letters, digits and single hyphens are allowed")]
    InvalidCharacter(char),
}

/// Validate a key identifier: 1-50 chars, alphanumeric with single interior
/// hyphens.
pub fn validate_key_id(id: &str) -> Result<(), KeyIdError> {
    if id.is_empty() {
        return Err(KeyIdError::Empty);
    }

    if id.len() > MAX_KEY_ID_LEN {
        return Err(KeyIdError::TooLong);
    }

    if let Some(bad) = id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(KeyIdError::InvalidCharacter(bad));
    }

    let bytes = id.as_bytes();
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return Err(KeyIdError::InvalidEdge);
    }

    if bytes.windows(2).any(|w| w == b"--") {
        return Err(KeyIdError::InvalidCharacter('-'));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(validate_key_id("my-api-key").is_ok());
        assert!(validate_key_id("key123").is_ok());
        assert!(validate_key_id("a").is_ok());
        assert!(validate_key_id("UPPER-lower-123").is_ok());
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(validate_key_id(""), Err(KeyIdError::Empty));
    }

    #[test]
    fn test_too_long_id() {
        assert_eq!(validate_key_id(&"a".repeat(51)), Err(KeyIdError::TooLong));
        assert!(validate_key_id(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_edge_hyphens_rejected() {
        assert_eq!(validate_key_id("-key"), Err(KeyIdError::InvalidEdge));
        assert_eq!(validate_key_id("key-"), Err(KeyIdError::InvalidEdge));
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(
            validate_key_id("my_key"),
            Err(KeyIdError::InvalidCharacter('_'))
        );
        assert_eq!(
            validate_key_id("my key"),
            Err(KeyIdError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn test_consecutive_hyphens_rejected() {
        assert_eq!(
            validate_key_id("my--key"),
            Err(KeyIdError::InvalidCharacter('-'))
        );
    }
}
