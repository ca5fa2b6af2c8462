//! PageFetcher operations on the session tab.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use tracing::{debug, warn};

use super::BrowserFetcher;
use crate::models::RawPage;
use crate::scrapers::fetcher::{FetchError, PageFetcher};

const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

const SCROLL_SCRIPT: &str =
    "window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight";

const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

async fn wait_for_ready(page: &Page, timeout: Duration) {
    match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await {
        Ok(Ok(result)) => {
            let state: String = result.into_value().unwrap_or_else(|_| "unknown".into());
            debug!("Page ready state: {}", state);
        }
        Ok(Err(e)) => debug!("Could not read ready state: {}", e),
        Err(_) => warn!("Timeout waiting for page ready state"),
    }
}

async fn read_page(page: &Page, fallback_url: &str) -> Result<RawPage, FetchError> {
    let url = page
        .url()
        .await
        .map_err(BrowserFetcher::render_err)?
        .unwrap_or_else(|| fallback_url.to_string());
    let html = page.content().await.map_err(BrowserFetcher::render_err)?;
    Ok(RawPage::new(url, html))
}

impl BrowserFetcher {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout)
    }

    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(self.settings.settle_ms)).await;
    }

    fn current_page(&self) -> Result<&Page, FetchError> {
        self.page.as_ref().ok_or(FetchError::NoPage)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, url: &str) -> Result<RawPage, FetchError> {
        let timeout = self.timeout();
        let wait_for = self.settings.wait_for_selector.clone();
        let page = self.ensure_page().await?;

        debug!("Navigating to {}", url);
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                message: e,
            })?;
        tokio::time::timeout(timeout, page.execute(params))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                secs: timeout.as_secs(),
            })?
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        wait_for_ready(page, timeout).await;
        if let Some(selector) = wait_for {
            match tokio::time::timeout(timeout, page.find_element(selector.as_str())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Selector {} not found on {}: {}", selector, url, e),
                Err(_) => warn!("Timeout waiting for {} on {}", selector, url),
            }
        }

        read_page(page, url).await
    }

    async fn snapshot(&mut self) -> Result<RawPage, FetchError> {
        let page = self.current_page()?;
        read_page(page, "about:blank").await
    }

    async fn activate(&mut self, selector: &str) -> Result<(), FetchError> {
        let page = self.current_page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|_| FetchError::ElementNotFound(selector.to_string()))?;
        let _ = element.scroll_into_view().await;
        element.click().await.map_err(Self::render_err)?;
        self.settle().await;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64, FetchError> {
        let page = self.current_page()?;
        page.evaluate(SCROLL_SCRIPT.to_string())
            .await
            .map_err(Self::render_err)?;
        self.settle().await;
        let page = self.current_page()?;
        let height: u64 = page
            .evaluate(HEIGHT_SCRIPT.to_string())
            .await
            .map_err(Self::render_err)?
            .into_value()
            .map_err(Self::render_err)?;
        Ok(height)
    }

    async fn scroll_height(&mut self) -> Result<u64, FetchError> {
        let page = self.current_page()?;
        page.evaluate(HEIGHT_SCRIPT.to_string())
            .await
            .map_err(Self::render_err)?
            .into_value()
            .map_err(Self::render_err)
    }

    async fn close(&mut self) {
        self.shutdown().await;
    }
}
