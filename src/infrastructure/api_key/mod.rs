//! API key infrastructure: secret generation, quota store, authorization

mod generator;
mod minute_window;
mod quota;
mod repository;
mod request;
mod service;

pub use generator::{GeneratedSecret, KeyGenerator};
pub use minute_window::MinuteWindow;
pub use quota::QuotaManager;
pub use repository::InMemoryQuotaStore;
pub use request::resolve_presented_key;
pub use service::{ApiKeyService, IssuedKey};
