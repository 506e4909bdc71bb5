//! Blocking fetch layer: default headers, session cookies and a bounded manual redirect loop.

use crate::http::error::FetchError;
use crate::http::session::{Cookie, Session, DEFAULT_USER_AGENT};
use crate::http::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, COOKIE, REFERER, USER_AGENT};
use reqwest::{Method, Url};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Redirect hops followed before a request fails with [FetchError::TooManyRedirects].
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;
const WEBP_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// One logical request. Headers set here override the fetcher defaults.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    cookies: Option<Vec<Cookie>>,
    form: Option<Vec<(String, String)>>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn post(url: impl Into<String>, form: &[(&str, &str)]) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.form = Some(
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        request
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            cookies: None,
            form: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send exactly these cookies instead of the session jar.
    pub fn cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Performs logical requests over a [Transport], following redirects manually.
///
/// Holds no cookie state of its own: every call reads the [Session] it is given.
pub struct Fetcher {
    transport: Box<dyn Transport>,
    user_agent: String,
    max_redirects: u32,
    allow_webp: bool,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("user_agent", &self.user_agent)
            .field("max_redirects", &self.max_redirects)
            .field("allow_webp", &self.allow_webp)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// User-Agent used when the session carries no provider override.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Send `request`, following up to `max_redirects` redirects.
    ///
    /// Every hop reuses the same method, headers and body; only the URL changes. A redirect
    /// received with no budget left returns [FetchError::TooManyRedirects] without sending
    /// anything further. HTTP error statuses are returned as ordinary responses.
    pub fn fetch(&self, session: &Session, request: FetchRequest) -> Result<HttpResponse, FetchError> {
        let mut remaining = self.max_redirects;
        let mut url = request.url.clone();
        loop {
            let physical = HttpRequest {
                method: request.method.clone(),
                url: url.clone(),
                headers: self.headers_for(session, &request, &url)?,
                form: request.form.clone(),
            };
            let response = self.transport.send(&physical)?;
            if !response.is_redirect() {
                return Ok(response);
            }
            if remaining == 0 {
                return Err(FetchError::TooManyRedirects {
                    url,
                    response: Box::new(response),
                });
            }
            remaining -= 1;
            let next = next_location(&url, response.location().unwrap_or_default())?;
            debug!(from = %url, to = %next, remaining, "following redirect");
            url = next;
        }
    }

    /// GET `url` and return the body as text, whatever the status.
    pub fn get_text(&self, session: &Session, url: &str) -> Result<String, FetchError> {
        Ok(self.fetch(session, FetchRequest::get(url))?.text())
    }

    /// POST a form to `url` and return the body as text.
    pub fn post_text(
        &self,
        session: &Session,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        Ok(self.fetch(session, FetchRequest::post(url, form))?.text())
    }

    fn headers_for(
        &self,
        session: &Session,
        request: &FetchRequest,
        url: &str,
    ) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", session.user_agent())?);
        headers.insert(REFERER, header_value("Referer", session.referrer())?);
        if self.allow_webp {
            headers.insert(ACCEPT, HeaderValue::from_static(WEBP_ACCEPT));
        }
        let cookie = match &request.cookies {
            Some(cookies) if cookies.is_empty() => None,
            Some(cookies) => Some(header_value(
                "Cookie",
                &cookies
                    .iter()
                    .map(|c| format!("{}={}", c.name, c.value))
                    .collect::<Vec<_>>()
                    .join("; "),
            )?),
            None => session.cookie_header(url),
        };
        if let Some(value) = cookie {
            headers.insert(COOKIE, value);
        }
        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
        name,
        reason: e.to_string(),
    })
}

/// Resolve a `Location` header against the URL that produced it.
fn next_location(current: &str, location: &str) -> Result<String, FetchError> {
    let base = Url::parse(current).map_err(|e| FetchError::InvalidUrl {
        input: current.to_string(),
        reason: e.to_string(),
    })?;
    base.join(location)
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            input: location.to_string(),
            reason: e.to_string(),
        })
}

/// Builder for [Fetcher] with optional User-Agent, timeout, redirect budget and WebP opt-in.
#[derive(Debug)]
pub struct FetcherBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    max_redirects: u32,
    allow_webp: bool,
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            allow_webp: false,
        }
    }
}

impl FetcherBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the redirect budget. Default 10.
    pub fn max_redirects(mut self, n: u32) -> Self {
        self.max_redirects = n;
        self
    }

    /// Advertise WebP support in the Accept header.
    pub fn allow_webp(mut self, allow: bool) -> Self {
        self.allow_webp = allow;
        self
    }

    /// Build over the blocking reqwest transport.
    pub fn build(self) -> Result<Fetcher, reqwest::Error> {
        let transport = ReqwestTransport::new(Duration::from_secs(self.timeout_secs))?;
        Ok(self.build_with_transport(Box::new(transport)))
    }

    /// Build over an arbitrary transport.
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> Fetcher {
        Fetcher {
            transport,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            max_redirects: self.max_redirects,
            allow_webp: self.allow_webp,
        }
    }
}
