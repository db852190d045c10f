//! BIN metadata domain types

mod entity;
mod repository;

pub use entity::{is_reserved_sandbox_bin, BinRecord};
pub use repository::BinRepository;

#[cfg(test)]
pub use repository::MockBinRepository;
