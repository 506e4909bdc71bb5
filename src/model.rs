//! Data model shared by providers, the downloader and the archive writer.

use crate::provider::Provider;

/// Provenance recorded in every archive manifest.
pub const DOWNLOADER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// What the user asked to download: one URL, an optional display name, and the provider handling it.
pub struct ContentSource<'a> {
    url: String,
    name: String,
    provider: &'a dyn Provider,
}

impl<'a> ContentSource<'a> {
    pub fn new(url: impl Into<String>, name: impl Into<String>, provider: &'a dyn Provider) -> Self {
        Self {
            url: url.into(),
            name: name.into().trim().to_string(),
            provider,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Display name; empty until set by the user or resolved from the provider.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> &'a dyn Provider {
        self.provider
    }

    /// Back-fill the name. Only applies while the name is still empty.
    pub fn fill_name(&mut self, name: &str) {
        if self.name.is_empty() {
            self.name = name.trim().to_string();
        }
    }
}

impl std::fmt::Debug for ContentSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSource")
            .field("url", &self.url)
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Opaque per-provider handle for one downloadable unit (usually a chapter URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub handle: String,
}

impl Volume {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }
}

/// Plain-text `info.txt` entry written into each archive.
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    pub source_url: String,
    pub downloader: String,
}

impl ArchiveManifest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            downloader: DOWNLOADER.to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!("Site: {}\nDownloader: {}", self.source_url, self.downloader)
    }
}

/// Resolve an image reference against the session referrer (scheme and host, no trailing slash).
///
/// `//host/path` gets an `http:` prefix, `/path` is joined to the referrer, anything with a
/// scheme is kept, and any other relative reference is appended to the referrer.
pub fn resolve_image_url(reference: &str, referrer: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("//") {
        return format!("http:{}", reference);
    }
    match reference.find("://") {
        Some(i) if i > 0 => reference.to_string(),
        _ if reference.starts_with('/') => format!("{}{}", referrer, reference),
        _ => format!("{}/{}", referrer.trim_end_matches('/'), reference),
    }
}

/// Stored file name for the image at 1-based `position`: `NNN_<basename>`, or `NNN.png`
/// when the basename is empty, shorter than 4 characters, or has no extension.
pub fn image_file_name(position: usize, url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or_default();
    let name = without_query.rsplit('/').next().unwrap_or_default();
    let has_extension = matches!(name.find('.'), Some(i) if i > 0);
    if name.chars().count() < 4 || !has_extension {
        format!("{:03}.png", position)
    } else {
        format!("{:03}_{}", position, name)
    }
}

/// Archive name with any query suffix removed.
pub fn archive_stem(name: &str) -> &str {
    match name.find('?') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// Destination stem for a prepackaged zip URL: basename up to `.zip`.
pub fn zip_archive_stem(url: &str) -> String {
    let base = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let base = match base.find(".zip") {
        Some(i) if i > 0 => &base[..i],
        _ => base,
    };
    archive_stem(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_protocol_and_origin_relative_urls() {
        let referrer = "http://site.com";
        assert_eq!(resolve_image_url("//cdn/a.jpg", referrer), "http://cdn/a.jpg");
        assert_eq!(resolve_image_url("/b.jpg", referrer), "http://site.com/b.jpg");
        assert_eq!(resolve_image_url("http://cdn2/c.jpg", referrer), "http://cdn2/c.jpg");
        assert_eq!(
            resolve_image_url("https://cdn3/d.png?x=1", referrer),
            "https://cdn3/d.png?x=1"
        );
    }

    #[test]
    fn resolves_bare_relative_urls_onto_referrer() {
        assert_eq!(
            resolve_image_url("img/e.jpg", "http://site.com"),
            "http://site.com/img/e.jpg"
        );
        assert_eq!(
            resolve_image_url("  /f.jpg\r\n", "https://site.com"),
            "https://site.com/f.jpg"
        );
    }

    #[test]
    fn image_name_keeps_basename_and_pads_position() {
        assert_eq!(image_file_name(1, "http://cdn/img/page.jpg"), "001_page.jpg");
        assert_eq!(image_file_name(12, "http://cdn/a/b/cover.png?token=abc"), "012_cover.png");
        assert_eq!(image_file_name(123, "http://cdn/x/long_name.webp"), "123_long_name.webp");
        assert_eq!(image_file_name(1234, "http://cdn/page.jpg"), "1234_page.jpg");
    }

    #[test]
    fn image_name_falls_back_to_png() {
        assert_eq!(image_file_name(1, "http://cdn/img/"), "001.png");
        assert_eq!(image_file_name(2, "http://cdn/a.j"), "002.png");
        assert_eq!(image_file_name(3, "http://cdn/img/noextension"), "003.png");
        assert_eq!(image_file_name(4, "http://cdn/img/.hidden"), "004.png");
        assert_eq!(image_file_name(5, "http://cdn/img/?id=5.jpg"), "005.png");
    }

    #[test]
    fn archive_stem_strips_query() {
        assert_eq!(archive_stem("vol_001?page=2"), "vol_001");
        assert_eq!(archive_stem("vol_001"), "vol_001");
        assert_eq!(archive_stem("?odd"), "?odd");
    }

    #[test]
    fn zip_stem_from_url() {
        assert_eq!(zip_archive_stem("http://site.com/dl/vol_01.zip"), "vol_01");
        assert_eq!(zip_archive_stem("http://site.com/dl/vol_02.zip?sig=1"), "vol_02");
        assert_eq!(zip_archive_stem("http://site.com/dl/vol_03"), "vol_03");
    }

    #[test]
    fn manifest_renders_two_lines() {
        let m = ArchiveManifest::new("http://site.com/manga/one");
        let text = m.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Site: http://site.com/manga/one");
        assert!(lines[1].starts_with("Downloader: manga-dl/"));
    }
}
