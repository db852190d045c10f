//! Infrastructure layer: concrete implementations behind the domain traits

pub mod api_key;
pub mod bin;
pub mod generation;
pub mod logging;
pub mod rate_limit;
pub mod usage;
