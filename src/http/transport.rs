//! One physical HTTP exchange. Redirects are never followed here; see [`Fetcher`](super::Fetcher).

use crate::http::error::FetchError;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Method, StatusCode};
use std::time::Duration;

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Fully specified request handed to a [Transport].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Form body (POST). Reused unchanged across redirect hops.
    pub form: Option<Vec<(String, String)>>,
}

/// Response with the body already read into memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Redirect status with a usable `Location` header.
    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status.as_u16()) && self.location().is_some()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends exactly one request. Implementations must not follow redirects.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Blocking reqwest transport with automatic redirects disabled.
#[derive(Debug)]
pub struct ReqwestTransport {
    inner: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { inner })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        let response = builder.send().map_err(|e| FetchError::Network {
            url: request.url.clone(),
            source: e,
        })?;
        let url = response.url().to_string();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| FetchError::BodyRead {
                url: url.clone(),
                source: e,
            })?
            .to_vec();
        Ok(HttpResponse {
            url,
            status,
            headers,
            body,
        })
    }
}
