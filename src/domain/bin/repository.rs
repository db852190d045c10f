//! BIN metadata lookup trait

use super::entity::BinRecord;
use crate::domain::DomainError;

/// Lookup interface over the external BIN metadata dataset.
///
/// Only the leading six digits of a prefix participate in the lookup; longer
/// prefixes are truncated by implementations.
#[cfg_attr(test, mockall::automock)]
pub trait BinRepository: Send + Sync {
    /// Look up issuer metadata for a BIN, `None` when unknown
    fn lookup(&self, bin: &str) -> Result<Option<BinRecord>, DomainError>;
}
