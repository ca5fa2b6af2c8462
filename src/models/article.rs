//! Article models: candidates from the frontier, fetched pages, and extracted records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A candidate article link discovered on a listing page.
///
/// `canonical_url` is the uniqueness key within a frontier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCandidate {
    pub source_id: String,
    pub canonical_url: String,
    /// Visible text of the listing element the link was found under.
    pub anchor_text: String,
}

/// A fully rendered page as returned by a fetcher.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

impl RawPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Record fields resolved by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Date,
    Author,
    Body,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Date, Field::Author, Field::Body];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::Author => "author",
            Field::Body => "body",
        }
    }
}

/// Provenance of a record's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Embedded machine-readable metadata (JSON-LD, meta tags).
    Structured,
    /// CSS selector lookup against the page markup.
    Markup,
    /// Full-text scanning or synthesized values.
    FallbackText,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Structured => "structured",
            ContentSource::Markup => "markup",
            ContentSource::FallbackText => "fallback_text",
        }
    }
}

/// A news or press-release record, immutable once handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub source_id: String,
    pub url: String,
    pub title: String,
    /// Publication date, serialized as `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    pub author: Option<String>,
    pub body: Option<String>,
    /// Truncated presentation view of `body`; only set when a summary length is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub content_source: ContentSource,
    /// Paths of downloaded attachments (PDFs), relative to the attachment root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}
