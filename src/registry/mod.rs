//! Source registry: per-site adapters keyed by source id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigError;
use crate::extract::{parse_selector, AttachmentRule, ExtractionError, FieldChains, Strategy};
use crate::models::{CrawlTarget, PaginationStrategy};
use crate::scrapers::{LinkFilter, RelevanceConfig};
use crate::services::{ContentCleaner, COMMON_BOILERPLATE};

const BUILTIN_SOURCES: &str = include_str!("builtin.toml");

fn default_boilerplate() -> Vec<String> {
    COMMON_BOILERPLATE.iter().map(|s| s.to_string()).collect()
}

/// Declarative description of one news source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAdapter {
    /// Filled from the registry key.
    #[serde(skip)]
    pub source_id: String,
    /// Organization name, used for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start_url: String,
    #[serde(default)]
    pub pagination: PaginationStrategy,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    /// Listing elements that carry article links.
    #[serde(default)]
    pub link_selectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub fields: FieldChains,
    /// Body lines matching any of these (case-insensitive regex) are dropped.
    #[serde(default = "default_boilerplate")]
    pub boilerplate: Vec<String>,
    /// The body is cut at the first line matching any of these.
    #[serde(default)]
    pub truncate_after: Vec<String>,
    /// Download linked attachments when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<AttachmentRule>,
}

impl SiteAdapter {
    pub fn new(source_id: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            name: None,
            start_url: start_url.into(),
            pagination: PaginationStrategy::default(),
            relevance: RelevanceConfig::default(),
            link_selectors: Vec::new(),
            max_iterations: None,
            fields: FieldChains::default(),
            boilerplate: default_boilerplate(),
            truncate_after: Vec::new(),
            attachments: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source_id)
    }

    /// Frontier target for this source. `default_max` applies when the source
    /// sets no iteration cap of its own.
    pub fn target(&self, default_max: u32) -> CrawlTarget {
        CrawlTarget {
            source_id: self.source_id.clone(),
            start_url: self.start_url.clone(),
            pagination: self.pagination.clone(),
            relevance: LinkFilter::from_config(&self.relevance),
            link_selectors: self.link_selectors.clone(),
            max_iterations: self.max_iterations.unwrap_or(default_max).max(1),
        }
    }

    pub fn cleaner(&self) -> Result<ContentCleaner, ExtractionError> {
        ContentCleaner::new(&self.boilerplate, &self.truncate_after)
    }

    /// Check URLs, selectors, and patterns up front so a bad entry fails at
    /// load time instead of silently yielding nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSource {
            source_id: self.source_id.clone(),
            reason,
        };

        let url = Url::parse(&self.start_url)
            .map_err(|e| invalid(format!("start_url '{}': {}", self.start_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("start_url '{}' is not http(s)", self.start_url)));
        }

        let mut selectors: Vec<String> = self.link_selectors.clone();
        match &self.pagination {
            PaginationStrategy::Numbered {
                next_selectors,
                url_template,
            } => {
                selectors.extend(next_selectors.iter().map(|s| s.replace("{next}", "2")));
                if let Some(template) = url_template {
                    if !template.contains("{page}") {
                        return Err(invalid(format!(
                            "url_template '{}' has no {{page}} placeholder",
                            template
                        )));
                    }
                }
            }
            PaginationStrategy::LoadMore { control_selector } => {
                selectors.push(control_selector.clone())
            }
            PaginationStrategy::Single | PaginationStrategy::Scroll => {}
        }
        for strategy in self.fields.all() {
            match strategy {
                Strategy::Markup {
                    selectors: s,
                    blocks,
                    within,
                    ..
                } => {
                    selectors.extend(s.iter().cloned());
                    selectors.extend(blocks.iter().cloned());
                    selectors.extend(within.iter().cloned());
                }
                Strategy::TextScan { pattern } => {
                    regex::Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
                }
                _ => {}
            }
        }
        for css in &selectors {
            parse_selector(css).map_err(|e| invalid(e.to_string()))?;
        }

        self.cleaner().map_err(|e| invalid(e.to_string()))?;
        if let Some(rule) = &self.attachments {
            rule.validate().map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}

/// All known sources, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    adapters: BTreeMap<String, SiteAdapter>,
}

impl SiteRegistry {
    /// The sources shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_SOURCES)
    }

    /// Parse a table of `[source_id]` sections.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let adapters: BTreeMap<String, SiteAdapter> = toml::from_str(raw)?;
        Ok(Self::default().with_overrides(adapters))
    }

    /// Add or replace adapters by id.
    pub fn with_overrides(mut self, sources: BTreeMap<String, SiteAdapter>) -> Self {
        for (id, mut adapter) in sources {
            adapter.source_id = id.clone();
            self.adapters.insert(id, adapter);
        }
        self
    }

    pub fn get(&self, source_id: &str) -> Option<&SiteAdapter> {
        self.adapters.get(source_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteAdapter> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapters for `ids`, or every adapter when `ids` is empty.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&SiteAdapter>, ConfigError> {
        if ids.is_empty() {
            return Ok(self.iter().collect());
        }
        ids.iter()
            .map(|id| {
                self.get(id)
                    .ok_or_else(|| ConfigError::UnknownSource(id.clone()))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.iter().try_for_each(SiteAdapter::validate)
    }
}
