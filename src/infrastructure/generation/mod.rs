//! Card generation implementations

pub mod avs;
mod credentials;
mod service;
mod synthesizer;

pub use credentials::CredentialDeriver;
pub use service::{
    CardGenerationService, GenerateError, GenerateRequest, GenerateResponse, GENERATE_ENDPOINT,
};
pub use synthesizer::NumberSynthesizer;
