//! mangapanda.com adapter. One image per page; page count comes from the page selector.

use crate::model::Volume;
use crate::provider::{select_attrs, Provider, ProviderError, SiteClient};
use reqwest::Url;

const MANGAPANDA_BASE: &str = "http://www.mangapanda.com";

pub struct MangaPanda;

/// First path segment of a mangapanda title URL, e.g. `hunter-x-hunter`.
fn title_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host != "mangapanda.com" && host != "www.mangapanda.com" {
        return None;
    }
    parsed
        .path_segments()?
        .next()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn chapter_url(handle: &str) -> String {
    if handle.starts_with(MANGAPANDA_BASE) {
        handle.to_string()
    } else {
        format!("{}/{}", MANGAPANDA_BASE, handle.trim_start_matches('/'))
    }
}

fn page_image(html: &str, url: &str) -> Result<String, ProviderError> {
    select_attrs(html, "#imgholder img", "src")?
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse {
            message: format!("no image in #imgholder at {}", url),
        })
}

fn page_count(html: &str) -> Result<usize, ProviderError> {
    let selector = crate::provider::parse_selector("#selectpage option")?;
    Ok(scraper::Html::parse_document(html).select(&selector).count())
}

impl Provider for MangaPanda {
    fn name(&self) -> &'static str {
        "mangapanda"
    }

    fn matches(&self, url: &str) -> bool {
        title_slug(url).is_some()
    }

    fn manga_name(&self, url: &str, _client: &SiteClient<'_>) -> Result<String, ProviderError> {
        Ok(title_slug(url).unwrap_or_default())
    }

    fn main_content(&self, url: &str, client: &SiteClient<'_>) -> Result<String, ProviderError> {
        let slug = title_slug(url).ok_or_else(|| ProviderError::InvalidUrl {
            input: url.to_string(),
            reason: "expected a mangapanda title URL".to_string(),
        })?;
        Ok(client.get(&format!("{}/{}", MANGAPANDA_BASE, slug))?)
    }

    fn volumes(
        &self,
        content: &str,
        _url: &str,
        _client: &SiteClient<'_>,
    ) -> Result<Vec<Volume>, ProviderError> {
        Ok(select_attrs(content, "#listing tr > td > a", "href")?
            .into_iter()
            .map(Volume::new)
            .collect())
    }

    fn archive_name(&self, volume: &Volume, _index: usize) -> String {
        volume
            .handle
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn images(
        &self,
        _content: &str,
        volume: &Volume,
        client: &SiteClient<'_>,
    ) -> Result<Vec<String>, ProviderError> {
        let url = chapter_url(&volume.handle);
        let first = client.get(&url)?;
        let pages = page_count(&first)?;
        if pages == 0 {
            return Ok(Vec::new());
        }
        let mut images = vec![page_image(&first, &url)?];
        for n in 2..=pages {
            let page_url = format!("{}/{}", url, n);
            let html = client.get(&page_url)?;
            images.push(page_image(&html, &page_url)?);
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{ok_response, ScriptedTransport};
    use crate::http::{Fetcher, Session};

    const TITLE_PAGE: &str = r#"<html><body><table id="listing">
        <tr><th>Chapter</th></tr>
        <tr><td><a href="/hunter-x-hunter/1">Hunter X Hunter 1</a></td><td>07/12/2009</td></tr>
        <tr><td><a href="/hunter-x-hunter/2">Hunter X Hunter 2</a></td><td>07/12/2009</td></tr>
        </table></body></html>"#;

    fn chapter_page(n: usize) -> String {
        format!(
            r#"<html><body><select id="selectpage"><option>1</option><option>2</option><option>3</option></select>
            <div id="imgholder"><a href="/next"><img id="img" src="http://i1.mangapanda.com/hxh/1/p{}.jpg"></a></div></body></html>"#,
            n
        )
    }

    #[test]
    fn matches_title_urls_only() {
        let p = MangaPanda;
        assert!(p.matches("http://www.mangapanda.com/hunter-x-hunter"));
        assert!(p.matches("https://mangapanda.com/hunter-x-hunter/1"));
        assert!(!p.matches("http://www.mangapanda.com/"));
        assert!(!p.matches("http://www.mangareader.net/hunter-x-hunter"));
    }

    #[test]
    fn parses_volumes_and_archive_names() -> Result<(), ProviderError> {
        let fetcher = Fetcher::builder()
            .build_with_transport(Box::new(ScriptedTransport::new(|r| Ok(ok_response(&r.url, b"")))));
        let session = Session::new("http://www.mangapanda.com/hunter-x-hunter", "UA")?;
        let client = SiteClient::new(&fetcher, &session);
        let p = MangaPanda;
        let volumes = p.volumes(TITLE_PAGE, "", &client)?;
        assert_eq!(
            volumes,
            vec![Volume::new("/hunter-x-hunter/1"), Volume::new("/hunter-x-hunter/2")]
        );
        assert_eq!(p.archive_name(&volumes[1], 1), "2");
        assert_eq!(p.manga_name("http://www.mangapanda.com/hunter-x-hunter", &client)?, "hunter-x-hunter");
        Ok(())
    }

    #[test]
    fn images_walk_every_page() -> Result<(), ProviderError> {
        let transport = ScriptedTransport::new(|r| {
            let n = match r.url.rsplit('/').next() {
                Some("2") => 2,
                Some("3") => 3,
                _ => 1,
            };
            Ok(ok_response(&r.url, chapter_page(n).as_bytes()))
        });
        let log = transport.log();
        let fetcher = Fetcher::builder().build_with_transport(Box::new(transport));
        let session = Session::new("http://www.mangapanda.com/hunter-x-hunter", "UA")?;
        let client = SiteClient::new(&fetcher, &session);
        let images = MangaPanda.images("", &Volume::new("/hunter-x-hunter/1"), &client)?;
        assert_eq!(
            images,
            vec![
                "http://i1.mangapanda.com/hxh/1/p1.jpg",
                "http://i1.mangapanda.com/hxh/1/p2.jpg",
                "http://i1.mangapanda.com/hxh/1/p3.jpg",
            ]
        );
        assert_eq!(
            log.urls(),
            vec![
                "http://www.mangapanda.com/hunter-x-hunter/1",
                "http://www.mangapanda.com/hunter-x-hunter/1/2",
                "http://www.mangapanda.com/hunter-x-hunter/1/3",
            ]
        );
        Ok(())
    }

    #[test]
    fn chapter_without_page_selector_has_no_images() -> Result<(), ProviderError> {
        let fetcher = Fetcher::builder().build_with_transport(Box::new(ScriptedTransport::new(
            |r| Ok(ok_response(&r.url, b"<html><body>gone</body></html>")),
        )));
        let session = Session::new("http://www.mangapanda.com/x", "UA")?;
        let client = SiteClient::new(&fetcher, &session);
        assert!(MangaPanda.images("", &Volume::new("/x/9"), &client)?.is_empty());
        Ok(())
    }
}
