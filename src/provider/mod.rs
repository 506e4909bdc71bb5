//! Site providers: the capability the downloader consumes, a URL-matching registry, and adapters.

mod error;

pub mod hocvientruyentranh;
pub mod mangapanda;

pub use error::ProviderError;

use crate::http::{FetchError, Fetcher, Session, SessionRequirements};
use crate::model::Volume;
use scraper::{Html, Selector};

/// Fetch primitives handed to providers. Relative URLs are resolved against the session referrer.
#[derive(Clone, Copy)]
pub struct SiteClient<'a> {
    fetcher: &'a Fetcher,
    session: &'a Session,
}

impl<'a> SiteClient<'a> {
    pub fn new(fetcher: &'a Fetcher, session: &'a Session) -> Self {
        Self { fetcher, session }
    }

    pub fn get(&self, url: &str) -> Result<String, FetchError> {
        self.fetcher.get_text(self.session, &self.session.resolve(url))
    }

    pub fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<String, FetchError> {
        self.fetcher
            .post_text(self.session, &self.session.resolve(url), form)
    }

    /// Absolute form of a possibly relative URL.
    pub fn resolve(&self, url: &str) -> String {
        self.session.resolve(url)
    }
}

/// Trait implemented by site adapters.
///
/// The downloader never inspects markup; everything site-specific goes through these calls.
/// List orders are site-native (usually newest first).
pub trait Provider {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether this provider handles `url`. Must be pure.
    fn matches(&self, url: &str) -> bool;

    /// Extra User-Agent/cookies the site needs before any content fetch.
    fn session_requirements(&self) -> SessionRequirements {
        SessionRequirements::default()
    }

    /// Manga name derived from the URL or the site. May be empty.
    fn manga_name(&self, url: &str, client: &SiteClient<'_>) -> Result<String, ProviderError>;

    /// Main page content that volume and image listing work from.
    fn main_content(&self, url: &str, client: &SiteClient<'_>) -> Result<String, ProviderError>;

    fn volumes(
        &self,
        content: &str,
        url: &str,
        client: &SiteClient<'_>,
    ) -> Result<Vec<Volume>, ProviderError>;

    /// Archive name for `volume`. `index` is its 1-based position in the ordered list before
    /// skipping, so `--skip-volumes` never renames later archives. Empty is fatal.
    fn archive_name(&self, volume: &Volume, index: usize) -> String;

    fn images(
        &self,
        content: &str,
        volume: &Volume,
        client: &SiteClient<'_>,
    ) -> Result<Vec<String>, ProviderError>;

    /// Site hands out whole-volume zips instead of image URLs.
    fn download_zip_only(&self) -> bool {
        false
    }

    /// Zip URLs for `volume`, or for the whole title from `content` when `volume` is None.
    fn prepackaged_zips(
        &self,
        _content: &str,
        _volume: Option<&Volume>,
        _client: &SiteClient<'_>,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Registered providers, scanned in order.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry with every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(mangapanda::MangaPanda));
        registry.register(Box::new(hocvientruyentranh::HocVienTruyenTranh));
        registry
    }

    pub fn register(&mut self, provider: Box<dyn Provider>) {
        self.providers.push(provider);
    }

    /// First provider whose matcher accepts `url`.
    pub fn find(&self, url: &str) -> Option<&dyn Provider> {
        self.providers
            .iter()
            .find(|p| p.matches(url))
            .map(|p| p.as_ref())
    }

    /// Like [find](Self::find) but with an error naming the host.
    pub fn resolve(&self, url: &str) -> Result<&dyn Provider, ProviderError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| ProviderError::InvalidUrl {
            input: url.to_string(),
            reason: e.to_string(),
        })?;
        self.find(url).ok_or_else(|| ProviderError::Unsupported {
            host: parsed.host_str().unwrap_or_default().to_string(),
        })
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ProviderError> {
    Selector::parse(sel).map_err(|e| ProviderError::Parse {
        message: format!("invalid selector {:?}: {}", sel, e),
    })
}

/// Trimmed attribute values of every element matching `sel`, skipping missing or empty ones.
pub(crate) fn select_attrs(html: &str, sel: &str, attr: &str) -> Result<Vec<String>, ProviderError> {
    let selector = parse_selector(sel)?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&selector)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim_matches(|c: char| c == ' ' || c == '\r' || c == '\n').to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_builtin_sites() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(
            registry.find("http://www.mangapanda.com/hunter-x-hunter").map(|p| p.name()),
            Some("mangapanda")
        );
        assert_eq!(
            registry
                .find("https://hocvientruyentranh.com/manga/123/some-title")
                .map(|p| p.name()),
            Some("hocvientruyentranh")
        );
        assert!(registry.find("https://example.com/manga/1").is_none());
    }

    #[test]
    fn resolve_reports_unsupported_host() {
        let registry = ProviderRegistry::with_defaults();
        match registry.resolve("https://example.com/foo") {
            Err(ProviderError::Unsupported { host }) => assert_eq!(host, "example.com"),
            other => panic!("expected Unsupported, got {:?}", other.map(|p| p.name())),
        }
        assert!(matches!(
            registry.resolve("not-a-url"),
            Err(ProviderError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn empty_registry_matches_nothing() {
        assert!(ProviderRegistry::new().find("http://www.mangapanda.com/x").is_none());
    }

    #[test]
    fn select_attrs_trims_and_skips_empty() -> Result<(), ProviderError> {
        let html = r#"<div><img class="p" src=" a.jpg
"><img class="p" src=""><img class="p"><img class="q" src="b.jpg"></div>"#;
        assert_eq!(select_attrs(html, "img.p", "src")?, vec!["a.jpg"]);
        Ok(())
    }
}
