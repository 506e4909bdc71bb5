//! HTTP fetch layer and session bootstrap.

mod client;
mod error;
mod session;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{FetchRequest, Fetcher, FetcherBuilder, DEFAULT_MAX_REDIRECTS};
pub use error::FetchError;
pub use session::{Cookie, Session, SessionRequirements, DEFAULT_USER_AGENT};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
