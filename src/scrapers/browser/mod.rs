//! Chrome-backed page fetcher.
//!
//! Keeps one tab open for the whole session so that clicks and scrolls act on
//! the page the frontier is paginating.

mod config;
#[cfg(feature = "browser")]
mod page;

pub use config::BrowserSettings;

#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use std::time::Duration;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info};

use super::fetcher::FetchError;

#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    settings: BrowserSettings,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: None,
            page: None,
            handler: None,
        }
    }

    fn render_err(e: impl std::fmt::Display) -> FetchError {
        FetchError::Render(e.to_string())
    }

    /// Launch or connect to Chrome and open the session tab.
    async fn ensure_page(&mut self) -> Result<&Page, FetchError> {
        if self.page.is_none() {
            if self.browser.is_none() {
                match self.settings.remote_url.clone() {
                    Some(url) => self.connect_remote(&url).await?,
                    None => self.launch().await?,
                }
            }
            let browser = self.browser.as_ref().ok_or(FetchError::NoPage)?;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(Self::render_err)?;
            self.page = Some(page);
        }
        self.page.as_ref().ok_or(FetchError::NoPage)
    }

    async fn launch(&mut self) -> Result<(), FetchError> {
        info!("Launching browser (headless={})", self.settings.headless);

        let mut builder = BrowserConfig::builder();
        if let Some(path) = Self::CHROME_PATHS
            .iter()
            .map(std::path::Path::new)
            .find(|p| p.exists())
        {
            debug!("Using Chrome at {}", path.display());
            builder = builder.chrome_executable(path);
        }
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(ref proxy) = self.settings.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        for arg in &self.settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(FetchError::Render)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(Self::render_err)?;

        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);
        Ok(())
    }

    async fn connect_remote(&mut self, url: &str) -> Result<(), FetchError> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));
        let info: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await?
            .json()
            .await?;
        let ws_url = info
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Render("no webSocketDebuggerUrl in /json/version".into()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.settings.timeout),
            ..Default::default()
        };
        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(Self::render_err)?;

        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Some(mut browser) = self.browser.take() {
            if self.settings.remote_url.is_none() {
                let _ = browser.close().await;
            }
        }
        if let Some(handle) = self.handler.take() {
            handle.abort();
        }
    }
}

/// Placeholder used when the crate is built without the `browser` feature.
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    _settings: BrowserSettings,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            _settings: settings,
        }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait::async_trait]
impl super::fetcher::PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, _url: &str) -> Result<crate::models::RawPage, FetchError> {
        Err(FetchError::Unsupported("browser rendering (rebuild with --features browser)"))
    }

    async fn snapshot(&mut self) -> Result<crate::models::RawPage, FetchError> {
        Err(FetchError::NoPage)
    }

    async fn activate(&mut self, _selector: &str) -> Result<(), FetchError> {
        Err(FetchError::Unsupported("activate"))
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64, FetchError> {
        Err(FetchError::Unsupported("scroll_to_bottom"))
    }

    async fn scroll_height(&mut self) -> Result<u64, FetchError> {
        Err(FetchError::Unsupported("scroll_height"))
    }
}
