//! In-memory scripted fetcher for offline runs and tests.
//!
//! Each URL maps to a sequence of HTML states. `activate` and
//! `scroll_to_bottom` advance the current URL to its next state, which models
//! click-to-load and infinite scroll without a browser.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::fetcher::{FetchError, PageFetcher};
use crate::models::RawPage;

#[derive(Debug, Default, Clone)]
pub struct FixtureFetcher {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    current: Option<(String, usize)>,
    fetch_log: Vec<String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a static page.
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), vec![html.into()]);
        self
    }

    /// Register a page whose DOM grows through the given states.
    pub fn with_states<I, S>(mut self, url: impl Into<String>, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages
            .insert(url.into(), states.into_iter().map(Into::into).collect());
        self
    }

    /// Make every fetch of `url` fail with a navigation error.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// URLs passed to `fetch`, in call order.
    pub fn fetch_log(&self) -> &[String] {
        &self.fetch_log
    }

    fn current_html(&self) -> Result<(&str, &str), FetchError> {
        let (url, idx) = self.current.as_ref().ok_or(FetchError::NoPage)?;
        let states = self.pages.get(url).ok_or(FetchError::NoPage)?;
        let html = states.get(*idx).ok_or(FetchError::NoPage)?;
        Ok((url.as_str(), html.as_str()))
    }

    /// Move to the next state. Returns false when already at the last one.
    fn advance(&mut self) -> Result<bool, FetchError> {
        let (url, idx) = self.current.as_mut().ok_or(FetchError::NoPage)?;
        let len = self.pages.get(url.as_str()).map_or(0, Vec::len);
        if *idx + 1 < len {
            *idx += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&mut self, url: &str) -> Result<RawPage, FetchError> {
        self.fetch_log.push(url.to_string());
        if self.failing.contains(url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        let states = self.pages.get(url).ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        let html = states.first().cloned().unwrap_or_default();
        self.current = Some((url.to_string(), 0));
        Ok(RawPage::new(url, html))
    }

    async fn snapshot(&mut self) -> Result<RawPage, FetchError> {
        let (url, html) = self.current_html()?;
        Ok(RawPage::new(url, html))
    }

    async fn activate(&mut self, selector: &str) -> Result<(), FetchError> {
        let (_, html) = self.current_html()?;
        let parsed = scraper::Html::parse_document(html);
        let present = scraper::Selector::parse(selector)
            .map(|sel| parsed.select(&sel).next().is_some())
            .unwrap_or(false);
        if !present {
            return Err(FetchError::ElementNotFound(selector.to_string()));
        }
        self.advance()?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64, FetchError> {
        self.advance()?;
        self.scroll_height().await
    }

    async fn scroll_height(&mut self) -> Result<u64, FetchError> {
        let (_, html) = self.current_html()?;
        Ok(html.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_states_advance_on_activate() {
        let mut fetcher = FixtureFetcher::new().with_states(
            "https://x.test/news",
            ["<button class=more>1</button>", "<p>2</p>"],
        );
        let page = fetcher.fetch("https://x.test/news").await.unwrap();
        assert!(page.html.contains('1'));

        fetcher.activate(".more").await.unwrap();
        let page = fetcher.snapshot().await.unwrap();
        assert!(page.html.contains("<p>2</p>"));

        // control is gone on the final state
        assert!(matches!(
            fetcher.activate(".more").await,
            Err(FetchError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_scroll_fingerprint_stabilizes() {
        let mut fetcher =
            FixtureFetcher::new().with_states("https://x.test/feed", ["a", "ab", "abc"]);
        fetcher.fetch("https://x.test/feed").await.unwrap();
        assert_eq!(fetcher.scroll_to_bottom().await.unwrap(), 2);
        assert_eq!(fetcher.scroll_to_bottom().await.unwrap(), 3);
        assert_eq!(fetcher.scroll_to_bottom().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_urls() {
        let mut fetcher = FixtureFetcher::new().with_failure("https://x.test/down");
        assert!(matches!(
            fetcher.fetch("https://x.test/missing").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://x.test/down").await,
            Err(FetchError::Navigation { .. })
        ));
        assert_eq!(fetcher.fetch_log().len(), 2);
    }
}
