//! Crawl targets and pagination strategies.

use serde::{Deserialize, Serialize};

use crate::scrapers::LinkFilter;

/// Default hard cap on pagination steps for a single source.
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// How a listing page exposes more article links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// One listing page, no pagination.
    #[default]
    Single,
    /// Numbered pages reached through a "next" link or a URL template.
    Numbered {
        /// Selectors for the next-page link, tried in order.
        /// `{next}` is replaced with the number of the page being looked for.
        #[serde(default)]
        next_selectors: Vec<String>,
        /// URL template with a `{page}` placeholder, used when no next link is found.
        #[serde(default)]
        url_template: Option<String>,
    },
    /// A "load more" control that appends items to the current page.
    LoadMore { control_selector: String },
    /// Infinite scroll: new items appear as the document bottom is reached.
    Scroll,
}

impl PaginationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaginationStrategy::Single => "single",
            PaginationStrategy::Numbered { .. } => "numbered",
            PaginationStrategy::LoadMore { .. } => "load_more",
            PaginationStrategy::Scroll => "scroll",
        }
    }
}

/// Everything the frontier needs to enumerate one source.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub source_id: String,
    pub start_url: String,
    pub pagination: PaginationStrategy,
    pub relevance: LinkFilter,
    /// Selectors for listing elements that carry article links.
    pub link_selectors: Vec<String>,
    pub max_iterations: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_deserialization() {
        let numbered: PaginationStrategy = serde_json::from_str(
            r#"{"type": "numbered", "next_selectors": ["a.next.page-numbers"]}"#,
        )
        .unwrap();
        assert_eq!(
            numbered,
            PaginationStrategy::Numbered {
                next_selectors: vec!["a.next.page-numbers".to_string()],
                url_template: None,
            }
        );

        let load_more: PaginationStrategy =
            toml::from_str("type = \"load_more\"\ncontrol_selector = \".load-more\"").unwrap();
        assert_eq!(load_more.as_str(), "load_more");

        let scroll: PaginationStrategy = serde_json::from_str(r#"{"type": "scroll"}"#).unwrap();
        assert_eq!(scroll, PaginationStrategy::Scroll);
    }

    #[test]
    fn test_pagination_default_is_single() {
        assert_eq!(PaginationStrategy::default(), PaginationStrategy::Single);
    }
}
