//! The page fetcher capability consumed by the frontier and the pipeline.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RawPage;

/// Errors from rendering or downloading a page.
///
/// These are never retried internally; a failure aborts only the page or
/// candidate that triggered it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("Timed out after {secs}s waiting for {url}")]
    Timeout { url: String, secs: u64 },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Render error: {0}")]
    Render(String),
    #[error("No page has been loaded yet")]
    NoPage,
    #[error("{0} is not supported by this fetcher")]
    Unsupported(&'static str),
}

/// A stateful rendering session.
///
/// Implementations hold at most one loaded page; `activate`, `scroll_to_bottom`
/// and `snapshot` operate on whatever `fetch` loaded last. Sessions are not
/// shareable, hence `&mut self` everywhere.
#[async_trait]
pub trait PageFetcher: Send {
    /// Navigate to `url` and return the rendered HTML.
    async fn fetch(&mut self, url: &str) -> Result<RawPage, FetchError>;

    /// Re-read the current page without navigating (after a click or scroll).
    async fn snapshot(&mut self) -> Result<RawPage, FetchError>;

    /// Click the first element matching `selector` on the current page.
    async fn activate(&mut self, selector: &str) -> Result<(), FetchError>;

    /// Scroll to the bottom of the current document and return a height fingerprint.
    async fn scroll_to_bottom(&mut self) -> Result<u64, FetchError>;

    /// Height fingerprint of the current document without scrolling.
    async fn scroll_height(&mut self) -> Result<u64, FetchError>;

    /// Release session resources.
    async fn close(&mut self) {}
}
