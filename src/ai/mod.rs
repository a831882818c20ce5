//! Generative-AI provider integration
//!
//! Exposes the completion capability the gateway dispatches to, the
//! provider-level error classification, and the Gemini REST implementation.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiCompletionProvider;
pub use mock::MockCompletionProvider;

use crate::assembler::PromptPayload;
use crate::models::Credential;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("quota exhausted (status {status}): {message}")]
    QuotaExhausted { status: u16, message: String },

    #[error("provider returned status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("provider returned an empty reply")]
    EmptyReply,
}

impl ProviderError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, ProviderError::QuotaExhausted { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue one completion call for `model` using `credential`.
    ///
    /// Implementations must honour `timeout` and return a non-empty reply or a
    /// classified [`ProviderError`].
    async fn complete(
        &self,
        model: &str,
        credential: &Credential,
        payload: &PromptPayload,
        timeout: Duration,
    ) -> std::result::Result<String, ProviderError>;
}
