//! Session bootstrap: referrer, User-Agent override and baseline cookies, negotiated once per run.

use crate::http::client::{FetchRequest, Fetcher};
use crate::http::error::FetchError;
use crate::model::resolve_image_url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, SET_COOKIE};
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

/// Browser-like User-Agent used unless configured or overridden by a provider.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.101 Safari/537.36";

/// A cookie a caller declares up front: provider requirements or per-request overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Domain without leading dot. Empty means host-only for the referrer.
    pub domain: String,
    pub path: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// `Set-Cookie` form of this cookie, as the jar ingests it.
    fn to_set_cookie(&self) -> String {
        let mut line = format!("{}={}; Path={}", self.name, self.value, self.path);
        if !self.domain.is_empty() {
            line.push_str("; Domain=");
            line.push_str(&self.domain);
        }
        line
    }
}

/// Extra session state a provider declares. User-Agent override and cookies are separate fields.
#[derive(Debug, Clone, Default)]
pub struct SessionRequirements {
    pub user_agent: Option<String>,
    pub cookies: Vec<Cookie>,
}

/// Negotiated client identity for one run. Read-only once bootstrapped.
///
/// Cookies live in a reqwest [Jar], which applies expiry, `Secure` and domain rules.
/// Responses never write to it after bootstrap.
#[derive(Debug, Clone)]
pub struct Session {
    referrer: String,
    origin: Url,
    user_agent: String,
    jar: Arc<Jar>,
}

impl Session {
    /// Session with the referrer derived from `source_url` and an empty cookie jar.
    pub fn new(source_url: &str, user_agent: impl Into<String>) -> Result<Self, FetchError> {
        let origin = origin_of(source_url)?;
        Ok(Self {
            referrer: origin.origin().ascii_serialization(),
            origin,
            user_agent: user_agent.into(),
            jar: Arc::new(Jar::default()),
        })
    }

    /// HEAD the source origin for baseline cookies, then apply provider requirements.
    ///
    /// Network failure here is fatal for the run.
    pub fn bootstrap(
        fetcher: &Fetcher,
        source_url: &str,
        requirements: &SessionRequirements,
    ) -> Result<Self, FetchError> {
        let user_agent = requirements
            .user_agent
            .clone()
            .unwrap_or_else(|| fetcher.user_agent().to_string());
        let session = Session::new(source_url, user_agent)?;
        let response = fetcher.fetch(&session, FetchRequest::head(session.referrer.clone()))?;
        let responder = Url::parse(&response.url).unwrap_or_else(|_| session.origin.clone());
        session
            .jar
            .set_cookies(&mut response.headers.get_all(SET_COOKIE).iter(), &responder);
        for cookie in &requirements.cookies {
            session.add_cookie(cookie);
        }
        debug!(referrer = %session.referrer, "session ready");
        Ok(session)
    }

    pub fn with_cookie(self, cookie: Cookie) -> Self {
        self.add_cookie(&cookie);
        self
    }

    fn add_cookie(&self, cookie: &Cookie) {
        let url = if cookie.domain.is_empty() {
            Some(self.origin.clone())
        } else {
            Url::parse(&format!("{}://{}/", self.origin.scheme(), cookie.domain)).ok()
        };
        match url {
            Some(url) => self.jar.add_cookie_str(&cookie.to_set_cookie(), &url),
            None => debug!(name = %cookie.name, domain = %cookie.domain, "cookie domain rejected"),
        }
    }

    /// Scheme and host of the source URL, e.g. `http://site.com`.
    pub fn referrer(&self) -> &str {
        &self.referrer
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `Cookie` header value for the jar entries matching `url`, or None.
    pub fn cookie_header(&self, url: &str) -> Option<HeaderValue> {
        let parsed = Url::parse(url).ok()?;
        self.jar.cookies(&parsed)
    }

    /// Resolve an image or page reference against the referrer.
    pub fn resolve(&self, reference: &str) -> String {
        resolve_image_url(reference, &self.referrer)
    }
}

fn origin_of(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        input: url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl {
            input: url.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    let mut origin = parsed;
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Ok(origin)
}
