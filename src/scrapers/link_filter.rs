//! Keyword relevance test for listing links.

use serde::{Deserialize, Serialize};

/// Relevance configuration for a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Keywords matched case-insensitively; any match is enough.
    /// An empty list accepts every link.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Also accept links whose URL contains a keyword.
    #[serde(default)]
    pub match_url: bool,
}

/// Decides whether a candidate link is in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkFilter {
    keywords: Vec<String>,
    match_url: bool,
}

impl LinkFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            match_url: false,
        }
    }

    /// Filter that accepts everything.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RelevanceConfig) -> Self {
        Self {
            match_url: config.match_url,
            ..Self::new(&config.keywords)
        }
    }

    pub fn with_url_matching(mut self, match_url: bool) -> Self {
        self.match_url = match_url;
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_relevant(&self, anchor_text: &str, url: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = anchor_text.to_lowercase();
        if self.keywords.iter().any(|k| text.contains(k.as_str())) {
            return true;
        }
        if self.match_url {
            let url = url.to_lowercase();
            return self.keywords.iter().any(|k| url.contains(k.as_str()));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let filter = LinkFilter::new(["Alzheimer"]);
        assert!(filter.is_relevant("New ALZHEIMER'S data", "https://x.test/a"));
        assert!(filter.is_relevant("alzheimer disease", "https://x.test/a"));
        assert!(!filter.is_relevant("Quarterly results", "https://x.test/a"));
    }

    #[test]
    fn test_url_matching_is_opt_in() {
        let filter = LinkFilter::new(["alzheimer"]);
        assert!(!filter.is_relevant("Read more", "https://x.test/alzheimers-news"));

        let filter = filter.with_url_matching(true);
        assert!(filter.is_relevant("Read more", "https://x.test/alzheimers-news"));
    }

    #[test]
    fn test_empty_keywords_accept_all() {
        assert!(LinkFilter::accept_all().is_relevant("anything", "https://x.test"));
        assert!(LinkFilter::new(["  "]).is_relevant("anything", "https://x.test"));
    }

    #[test]
    fn test_from_config() {
        let config: RelevanceConfig =
            toml::from_str("keywords = [\"alzheimer\", \"dementia\"]\nmatch_url = true").unwrap();
        let filter = LinkFilter::from_config(&config);
        assert_eq!(filter.keywords(), ["alzheimer", "dementia"]);
        assert!(filter.is_relevant("x", "https://x.test/dementia/1"));
    }
}
