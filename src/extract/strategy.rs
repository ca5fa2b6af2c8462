//! Field strategies and per-field fallback chains.

use serde::{Deserialize, Serialize};

use crate::models::{ContentSource, Field};

/// One way of producing a field value. Chains of these are tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Schema.org JSON-LD blocks.
    JsonLd,
    /// `<meta name|property=… content=…>`, first name that is present wins.
    Meta { names: Vec<String> },
    /// CSS selectors, in priority order.
    Markup {
        selectors: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blocks: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        within: Option<String>,
    },
    /// Regex over the visible page text; capture group 1 when present.
    TextScan { pattern: String },
    /// The listing anchor text the article was discovered under.
    AnchorText,
    /// Last URL path segment with dashes and underscores as spaces.
    UrlSlug,
    /// A constant, e.g. the organization name as default author.
    Fixed { value: String },
}

impl Strategy {
    pub fn markup(selectors: &[&str]) -> Self {
        Strategy::Markup {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            attribute: None,
            blocks: None,
            within: None,
        }
    }

    pub fn meta(names: &[&str]) -> Self {
        Strategy::Meta {
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::JsonLd => "json_ld",
            Strategy::Meta { .. } => "meta",
            Strategy::Markup { .. } => "markup",
            Strategy::TextScan { .. } => "text_scan",
            Strategy::AnchorText => "anchor_text",
            Strategy::UrlSlug => "url_slug",
            Strategy::Fixed { .. } => "fixed",
        }
    }

    /// Embedded machine-readable metadata rather than visible markup.
    pub fn is_structured(&self) -> bool {
        matches!(self, Strategy::JsonLd | Strategy::Meta { .. })
    }

    pub fn content_source(&self) -> ContentSource {
        match self {
            Strategy::JsonLd | Strategy::Meta { .. } => ContentSource::Structured,
            Strategy::Markup { .. } | Strategy::AnchorText => ContentSource::Markup,
            Strategy::TextScan { .. } | Strategy::UrlSlug | Strategy::Fixed { .. } => {
                ContentSource::FallbackText
            }
        }
    }
}

fn default_title_chain() -> Vec<Strategy> {
    vec![
        Strategy::JsonLd,
        Strategy::meta(&["og:title", "twitter:title"]),
        Strategy::markup(&["h1"]),
        Strategy::markup(&["title"]),
        Strategy::AnchorText,
        Strategy::UrlSlug,
    ]
}

fn default_date_chain() -> Vec<Strategy> {
    vec![
        Strategy::JsonLd,
        Strategy::meta(&["article:published_time", "date", "publish-date", "pubdate"]),
        Strategy::Markup {
            selectors: vec!["time[datetime]".to_string()],
            attribute: Some("datetime".to_string()),
            blocks: None,
            within: None,
        },
        Strategy::markup(&["time", ".date", ".post-date", ".entry-date"]),
    ]
}

fn default_author_chain() -> Vec<Strategy> {
    vec![
        Strategy::JsonLd,
        Strategy::meta(&["author", "article:author"]),
        Strategy::markup(&[".author", ".byline", ".post-author", ".entry-author"]),
    ]
}

fn default_body_chain() -> Vec<Strategy> {
    vec![
        Strategy::Markup {
            selectors: vec![
                "article".to_string(),
                ".entry-content".to_string(),
                "main".to_string(),
            ],
            attribute: None,
            blocks: Some("p".to_string()),
            within: None,
        },
        Strategy::JsonLd,
    ]
}

/// Ordered strategies for every record field. Fields left out of a
/// configuration get the generic chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChains {
    #[serde(default = "default_title_chain")]
    pub title: Vec<Strategy>,
    #[serde(default = "default_date_chain")]
    pub date: Vec<Strategy>,
    #[serde(default = "default_author_chain")]
    pub author: Vec<Strategy>,
    #[serde(default = "default_body_chain")]
    pub body: Vec<Strategy>,
}

impl Default for FieldChains {
    fn default() -> Self {
        Self {
            title: default_title_chain(),
            date: default_date_chain(),
            author: default_author_chain(),
            body: default_body_chain(),
        }
    }
}

impl FieldChains {
    pub fn chain(&self, field: Field) -> &[Strategy] {
        match field {
            Field::Title => &self.title,
            Field::Date => &self.date,
            Field::Author => &self.author,
            Field::Body => &self.body,
        }
    }

    /// Every strategy across all fields.
    pub fn all(&self) -> impl Iterator<Item = &Strategy> + '_ {
        Field::ALL.into_iter().flat_map(move |f| self.chain(f).iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_deserialization_from_toml() {
        let chains: FieldChains = toml::from_str(
            r#"
            title = [
                { type = "markup", selectors = ["h1.entry-title"] },
                { type = "anchor_text" },
            ]
            author = [{ type = "fixed", value = "IGC Pharma" }]
            "#,
        )
        .unwrap();
        assert_eq!(chains.title.len(), 2);
        assert_eq!(chains.title[1], Strategy::AnchorText);
        assert_eq!(
            chains.author,
            vec![Strategy::Fixed {
                value: "IGC Pharma".to_string()
            }]
        );
        // omitted fields fall back to the generic chains
        assert_eq!(chains.date, default_date_chain());
        assert_eq!(chains.body, default_body_chain());
    }

    #[test]
    fn test_content_source_mapping() {
        assert_eq!(Strategy::JsonLd.content_source(), ContentSource::Structured);
        assert_eq!(Strategy::AnchorText.content_source(), ContentSource::Markup);
        assert_eq!(Strategy::UrlSlug.content_source(), ContentSource::FallbackText);
        assert!(Strategy::meta(&["author"]).is_structured());
        assert!(!Strategy::markup(&["h1"]).is_structured());
    }

    #[test]
    fn test_all_covers_every_field() {
        let chains = FieldChains::default();
        let total = chains.title.len() + chains.date.len() + chains.author.len() + chains.body.len();
        assert_eq!(chains.all().count(), total);
    }
}
