//! Shared error type for providers and provider lookup.

use crate::http::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Unsupported site: '{host}'. No provider handles this URL.")]
    Unsupported { host: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Could not parse page: {message}")]
    Parse { message: String },
}
