//! Text generation providers.
//!
//! The pipeline talks to a [`TextProvider`]; production uses Gemini, tests use
//! the scripted mock.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP status the generation API uses when the model is overloaded.
pub const OVERLOADED_STATUS: u16 = 503;

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Generation API returned status {status}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    /// A 2xx response without `candidates[0].content.parts[0].text`.
    #[error("Generation API response carried no text")]
    InvalidEnvelope { body: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Overload responses and transport failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => *status == OVERLOADED_STATUS,
            ProviderError::Network(_) => true,
            ProviderError::InvalidEnvelope { .. } | ProviderError::NotConfigured(_) => false,
        }
    }

    /// Upstream HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw upstream body, when one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            ProviderError::Status { body, .. } | ProviderError::InvalidEnvelope { body } => {
                Some(body)
            }
            _ => None,
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationParams {
    /// Conservative sampling for verbatim scripture selection.
    pub const PASSAGE: Self = Self {
        temperature: 0.7,
        top_p: 0.8,
    };

    /// Looser sampling for reflective prose.
    pub const DEVOTIONAL: Self = Self {
        temperature: 0.9,
        top_p: 0.9,
    };
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate text for `prompt`. Returns the first candidate's text.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ProviderError>;
}
