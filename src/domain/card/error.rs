use thiserror::Error;

/// Errors raised while synthesizing a card number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Invalid BIN prefix: {message}")]
    InvalidPrefix { message: String },

    #[error("Target length {length} cannot hold prefix '{prefix}' plus a check digit")]
    UnsupportedLength { prefix: String, length: usize },

    #[error("BIN {bin} is a reserved sandbox BIN and cannot be used for generation")]
    BlockedBin { bin: String },

    #[error("AVS postal data is not available for country '{country}'")]
    UnsupportedAvsCountry { country: String },

    #[error("No check digit satisfies the Luhn test for the candidate number")]
    ChecksumSearchExhausted,
}

impl GenerationError {
    pub fn invalid_prefix(message: impl Into<String>) -> Self {
        Self::InvalidPrefix {
            message: message.into(),
        }
    }

    pub fn unsupported_length(prefix: impl Into<String>, length: usize) -> Self {
        Self::UnsupportedLength {
            prefix: prefix.into(),
            length,
        }
    }

    pub fn blocked_bin(bin: impl Into<String>) -> Self {
        Self::BlockedBin { bin: bin.into() }
    }

    pub fn unsupported_avs_country(country: impl Into<String>) -> Self {
        Self::UnsupportedAvsCountry {
            country: country.into(),
        }
    }
}
