//! Error handling and custom error types
//!
//! Provides unified error handling across the gateway using thiserror.
//! Provider-level failures live in [`crate::ai::ProviderError`] and extraction
//! failures in [`crate::ingest::ExtractionError`]; only the former can surface
//! here, wrapped with the gateway's attempt bookkeeping.

use crate::ai::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No providers configured")]
    NoProvidersConfigured,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider call to {model} failed after {attempts} attempt(s): {source}")]
    ProviderFatal {
        model: String,
        attempts: usize,
        #[source]
        source: ProviderError,
    },

    #[error("All providers exhausted after {attempts} attempt(s); last error: {last_error}")]
    AllProvidersExhausted {
        attempts: usize,
        last_error: ProviderError,
    },
}

impl Error {
    /// Whether the failure should be shown to the user as a conversational
    /// apology rather than a hard error page.
    pub fn is_soft(&self) -> bool {
        match self {
            Error::AllProvidersExhausted { last_error, .. } => last_error.is_quota_exhausted(),
            Error::ProviderFatal { source, .. } => matches!(source, ProviderError::EmptyReply),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
