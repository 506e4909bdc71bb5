//! Shared error type for the fetch layer.

use crate::http::transport::HttpResponse;
use thiserror::Error;

/// Errors from a single logical request (including its redirect hops).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid {name} header value: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error while fetching {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// Redirect budget exhausted. Carries the last redirect response received.
    #[error("Too many redirects: {url}")]
    TooManyRedirects {
        url: String,
        response: Box<HttpResponse>,
    },
}
