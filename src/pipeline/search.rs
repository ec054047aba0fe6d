//! Image search: find illustrative image URLs for a page's search query.
//!
//! The production backend scrapes the Google Images results page. It is
//! best-effort by nature (markup changes, rate limits), so callers treat any
//! error as "no images" rather than a page failure.

use crate::config::MAX_IMAGE_URLS;
use crate::error::ServiceError;
use futures::future::BoxFuture;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

const GOOGLE_IMAGES_URL: &str = "https://www.google.com/search";
const USER_AGENT: &str = "Mozilla/5.0";

/// Finds image URLs for a text query.
pub trait ImageSearch: Send + Sync {
    /// Return at most `limit` URLs.
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, ServiceError>>;
}

/// [`ImageSearch`] backed by the Google Images HTML results page.
#[derive(Debug, Clone)]
pub struct GoogleImageSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleImageSearch {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        Self::with_endpoint(GOOGLE_IMAGES_URL, timeout)
    }

    /// Point the scraper at a different results endpoint.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::new(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl ImageSearch for GoogleImageSearch {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, ServiceError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(&self.endpoint)
                .query(&[("hl", "en"), ("tbm", "isch"), ("q", query)])
                .send()
                .await
                .map_err(|e| ServiceError::new(format!("image search request failed: {e}")))?;

            if !resp.status().is_success() {
                return Err(ServiceError::new(format!(
                    "image search returned HTTP {}",
                    resp.status()
                )));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| ServiceError::new(format!("image search body: {e}")))?;

            let urls = parse_image_urls(&body, limit.min(MAX_IMAGE_URLS));
            debug!("Image search '{}' → {} URLs", query, urls.len());
            Ok(urls)
        })
    }
}

/// Pull image URLs out of a results page.
///
/// Every `<img>` whose `src` is an absolute http(s) URL contributes one entry:
/// its `data-src` (the larger rendition) when present, otherwise the `src`.
pub fn parse_image_urls(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").unwrap();
    let mut urls = Vec::new();

    for img in document.select(&selector) {
        if urls.len() >= limit {
            break;
        }
        let el = img.value();
        let Some(src) = el.attr("src") else {
            continue;
        };
        if !src.starts_with("http") {
            continue;
        }
        let url = el.attr("data-src").filter(|s| !s.is_empty()).unwrap_or(src);
        urls.push(url.to_string());
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_data_src_and_skips_inline_images() {
        let html = r#"
            <html><body>
              <img src="/logo.png">
              <img src="data:image/gif;base64,R0lGOD">
              <img src="http://thumb/1.jpg" data-src="http://full/1.jpg">
              <img src="https://thumb/2.jpg">
              <img alt="no src">
            </body></html>"#;
        assert_eq!(
            parse_image_urls(html, 8),
            vec!["http://full/1.jpg", "https://thumb/2.jpg"]
        );
    }

    #[test]
    fn stops_at_limit() {
        let html: String = (0..20)
            .map(|i| format!("<img src=\"http://img/{i}.png\">"))
            .collect();
        let urls = parse_image_urls(&html, MAX_IMAGE_URLS);
        assert_eq!(urls.len(), 8);
        assert_eq!(urls[7], "http://img/7.png");
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_image_urls("<html></html>", 8).is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_service_error() {
        let search =
            GoogleImageSearch::with_endpoint("http://127.0.0.1:9/search", Duration::from_secs(2))
                .unwrap();
        assert!(search.search("cells", 8).await.is_err());
    }
}
