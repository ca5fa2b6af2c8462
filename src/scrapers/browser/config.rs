//! Headless browser settings.

use serde::{Deserialize, Serialize};

/// Settings for the Chrome DevTools session used to render listing and article pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window.
    pub headless: bool,
    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Navigation timeout in seconds.
    pub timeout: u64,
    /// Pause after clicks and scrolls so client-side content can load.
    pub settle_ms: u64,
    /// Wait for this selector after every navigation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
    /// DevTools endpoint of an already running Chrome (e.g., "ws://localhost:9222").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            timeout: 30,
            settle_ms: 1500,
            wait_for_selector: None,
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

impl BrowserSettings {
    /// Apply `BROWSER_URL` and `BROWSER_HEADLESS` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("BROWSER_URL") {
            if !url.trim().is_empty() {
                self.remote_url = Some(url);
            }
        }
        if let Ok(val) = std::env::var("BROWSER_HEADLESS") {
            self.headless = !(val.eq_ignore_ascii_case("false") || val == "0");
        }
        self
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: BrowserSettings = toml::from_str("settle_ms = 3000").unwrap();
        assert_eq!(settings.settle_ms, 3000);
        assert!(settings.headless);
        assert_eq!(settings.timeout, 30);
        assert!(!settings.is_default());
        assert!(BrowserSettings::default().is_default());
    }
}
