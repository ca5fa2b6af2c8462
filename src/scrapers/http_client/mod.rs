//! reqwest-backed client and a non-rendering page fetcher built on it.

mod user_agent;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::fetcher::{FetchError, PageFetcher};
use crate::models::RawPage;

pub use user_agent::{resolve_user_agent, USER_AGENT};

/// Shared HTTP client for listing pages, articles, and attachments.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .build()?;
        Ok(Self { client, timeout })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                }
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// GET a URL and return the final URL after redirects plus the body text.
    pub async fn get_text(&self, url: &str) -> Result<(String, String), FetchError> {
        let response = self.send(url).await?;
        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok((final_url, body))
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.send(url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Fetcher for server-rendered sites. It cannot click, and scrolling never
/// changes the fingerprint, so load-more and scroll pagination stop after the
/// first page.
pub struct HttpFetcher {
    client: HttpClient,
    current: Option<RawPage>,
}

impl HttpFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            current: None,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str) -> Result<RawPage, FetchError> {
        let (final_url, html) = self.client.get_text(url).await?;
        let page = RawPage::new(final_url, html);
        self.current = Some(page.clone());
        Ok(page)
    }

    async fn snapshot(&mut self) -> Result<RawPage, FetchError> {
        self.current.clone().ok_or(FetchError::NoPage)
    }

    async fn activate(&mut self, _selector: &str) -> Result<(), FetchError> {
        Err(FetchError::Unsupported("activate"))
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64, FetchError> {
        self.scroll_height().await
    }

    async fn scroll_height(&mut self) -> Result<u64, FetchError> {
        self.current
            .as_ref()
            .map(|p| p.html.len() as u64)
            .ok_or(FetchError::NoPage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_fetcher_without_page() {
        let client = HttpClient::new(Duration::from_secs(5), None).unwrap();
        let mut fetcher = HttpFetcher::new(client);
        assert!(matches!(fetcher.snapshot().await, Err(FetchError::NoPage)));
        assert!(matches!(
            fetcher.activate(".more").await,
            Err(FetchError::Unsupported("activate"))
        ));
        assert!(matches!(
            fetcher.scroll_to_bottom().await,
            Err(FetchError::NoPage)
        ));
    }
}
