//! hocvientruyentranh.com adapter. Accepts a title URL or any chapter URL of the title.

use crate::model::Volume;
use crate::provider::{select_attrs, Provider, ProviderError, SiteClient};
use reqwest::Url;

pub struct HocVienTruyenTranh;

fn parse_site_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let on_site = host == "hocvientruyentranh.com"
        || host.ends_with(".hocvientruyentranh.com")
        || host == "hocvientruyentranh.net"
        || host.ends_with(".hocvientruyentranh.net");
    on_site.then_some(parsed)
}

fn is_chapter_url(url: &str) -> bool {
    url.contains("/chapter/")
}

/// Title slug from `/manga/<id>/<slug>`.
fn title_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    segments.find(|s| *s == "manga")?;
    segments.next()?;
    segments.next().filter(|s| !s.is_empty()).map(String::from)
}

/// Numeric chapter id from `/chapter/<id>/...`.
fn chapter_id(url: &str) -> Option<&str> {
    let rest = &url[url.find("/chapter/")? + "/chapter/".len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

impl HocVienTruyenTranh {
    /// Title page URL. Chapter URLs are mapped through the page's breadcrumb link.
    fn title_url(&self, url: &str, client: &SiteClient<'_>) -> Result<String, ProviderError> {
        if !is_chapter_url(url) {
            return Ok(url.to_string());
        }
        let html = client.get(url)?;
        select_attrs(&html, "#subNavi a", "href")?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse {
                message: format!("no title link in #subNavi at {}", url),
            })
    }
}

impl Provider for HocVienTruyenTranh {
    fn name(&self) -> &'static str {
        "hocvientruyentranh"
    }

    fn matches(&self, url: &str) -> bool {
        parse_site_url(url)
            .map(|u| u.path().starts_with("/manga/") || is_chapter_url(u.path()))
            .unwrap_or(false)
    }

    fn manga_name(&self, url: &str, client: &SiteClient<'_>) -> Result<String, ProviderError> {
        let title_url = client.resolve(&self.title_url(url, client)?);
        Ok(title_slug(&title_url).unwrap_or_default())
    }

    fn main_content(&self, url: &str, client: &SiteClient<'_>) -> Result<String, ProviderError> {
        let title_url = self.title_url(url, client)?;
        Ok(client.get(&title_url)?)
    }

    fn volumes(
        &self,
        content: &str,
        _url: &str,
        _client: &SiteClient<'_>,
    ) -> Result<Vec<Volume>, ProviderError> {
        Ok(
            select_attrs(content, ".table-scroll table.table td > a", "href")?
                .into_iter()
                .map(Volume::new)
                .collect(),
        )
    }

    fn archive_name(&self, volume: &Volume, index: usize) -> String {
        match chapter_id(&volume.handle) {
            Some(id) => format!("vol_{:03}-{}", index, id),
            None => format!("vol_{:03}", index),
        }
    }

    fn images(
        &self,
        _content: &str,
        volume: &Volume,
        client: &SiteClient<'_>,
    ) -> Result<Vec<String>, ProviderError> {
        let html = client.get(&volume.handle)?;
        select_attrs(&html, ".manga-container img.page", "src")
    }
}
