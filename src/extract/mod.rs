//! Field extraction: ordered fallback strategies per record field.

mod attachments;
mod document;
mod json_ld;
mod strategy;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use attachments::AttachmentRule;
pub use strategy::{FieldChains, Strategy};

use crate::models::{ArticleCandidate, ContentSource, Field, RawPage};
use crate::registry::SiteAdapter;
use crate::services::DateNormalizer;
use document::Document;

/// Recoverable extraction problems. A strategy that fails this way yields no
/// value and the chain moves on.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Malformed JSON-LD: {0}")]
    MalformedJsonLd(#[from] serde_json::Error),
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::InvalidSelector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Element text with text nodes joined by spaces and whitespace collapsed.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

static SLUG_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(html?|php|aspx?)$").unwrap());

/// Readable text from the last path segment: `phase-2_results.html` -> `phase 2 results`.
fn slug_text(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let segment = SLUG_EXTENSION.replace(segment, "");
    let text = collapse_whitespace(&segment.replace(['-', '_', '+'], " "));
    (!text.is_empty()).then_some(text)
}

/// Fields resolved for one article page, before cleaning and dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub content_source: ContentSource,
    /// Name of the strategy that produced each resolved field.
    pub winners: Vec<(Field, &'static str)>,
    pub attachment_urls: Vec<String>,
}

impl PartialRecord {
    pub fn winner(&self, field: Field) -> Option<&'static str> {
        self.winners
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, name)| *name)
    }
}

struct Context<'a> {
    doc: &'a Document,
    candidate: &'a ArticleCandidate,
}

#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    dates: DateNormalizer,
}

impl FieldExtractor {
    pub fn new(dates: DateNormalizer) -> Self {
        Self { dates }
    }

    pub fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    /// Resolve every field of `page` through the adapter's chains.
    pub fn extract(
        &self,
        page: &RawPage,
        candidate: &ArticleCandidate,
        adapter: &SiteAdapter,
    ) -> PartialRecord {
        let doc = Document::parse(&page.html);
        let ctx = Context {
            doc: &doc,
            candidate,
        };

        let mut winners: Vec<(Field, &Strategy)> = Vec::new();
        let mut resolve = |field: Field| -> Option<String> {
            let (value, strategy) = self.run_chain(&ctx, field, adapter.fields.chain(field))?;
            winners.push((field, strategy));
            Some(value)
        };

        let title = resolve(Field::Title).map(|t| collapse_whitespace(&t));
        let date_text = resolve(Field::Date);
        let author = resolve(Field::Author).map(|a| collapse_whitespace(&a));
        let body = resolve(Field::Body);

        let date = date_text
            .as_deref()
            .and_then(|raw| self.dates.normalize(raw))
            .or_else(|| {
                debug!(url = %candidate.canonical_url, "No parseable date field, scanning page text");
                self.dates.find_in_text(doc.visible_text())
            });

        let content_source = if winners.iter().any(|(_, s)| s.is_structured()) {
            ContentSource::Structured
        } else {
            winners
                .iter()
                .find(|(f, _)| *f == Field::Title)
                .map(|(_, s)| s.content_source())
                .unwrap_or(ContentSource::FallbackText)
        };

        let attachment_urls = match &adapter.attachments {
            Some(rule) => rule.find(&doc, &page.url).unwrap_or_else(|e| {
                debug!("Attachment lookup failed: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        PartialRecord {
            title,
            date,
            author,
            body,
            content_source,
            winners: winners.iter().map(|(f, s)| (*f, s.as_str())).collect(),
            attachment_urls,
        }
    }

    /// First strategy producing a non-blank value wins.
    fn run_chain<'s>(
        &self,
        ctx: &Context<'_>,
        field: Field,
        chain: &'s [Strategy],
    ) -> Option<(String, &'s Strategy)> {
        chain.iter().find_map(|strategy| {
            match self.apply(ctx, field, strategy) {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    Some((value.trim().to_string(), strategy))
                }
                Ok(_) => None,
                Err(e) => {
                    debug!(field = field.as_str(), strategy = strategy.as_str(), "{}", e);
                    None
                }
            }
        })
    }

    fn apply(
        &self,
        ctx: &Context<'_>,
        field: Field,
        strategy: &Strategy,
    ) -> Result<Option<String>, ExtractionError> {
        let value = match strategy {
            Strategy::JsonLd => {
                let ld = ctx.doc.json_ld();
                match field {
                    Field::Title => ld.headline.clone(),
                    Field::Date => ld.date_published.clone(),
                    Field::Author => ld.author.clone(),
                    Field::Body => ld.body.clone(),
                }
            }
            Strategy::Meta { names } => ctx.doc.meta(names),
            Strategy::Markup {
                selectors,
                attribute,
                blocks,
                within,
            } => ctx.doc.markup(
                selectors,
                attribute.as_deref(),
                blocks.as_deref(),
                within.as_deref(),
            )?,
            Strategy::TextScan { pattern } => {
                let re = Regex::new(pattern).map_err(|source| ExtractionError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                re.captures(ctx.doc.visible_text()).and_then(|caps| {
                    caps.get(1)
                        .or_else(|| caps.get(0))
                        .map(|m| m.as_str().to_string())
                })
            }
            Strategy::AnchorText => Some(ctx.candidate.anchor_text.clone()),
            Strategy::UrlSlug => slug_text(&ctx.candidate.canonical_url),
            Strategy::Fixed { value } => Some(value.clone()),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SiteAdapter;

    fn candidate(url: &str, anchor: &str) -> ArticleCandidate {
        ArticleCandidate {
            source_id: "acme".to_string(),
            canonical_url: url.to_string(),
            anchor_text: anchor.to_string(),
        }
    }

    fn adapter(fields: FieldChains) -> SiteAdapter {
        SiteAdapter {
            fields,
            ..SiteAdapter::new("acme", "https://acme.test/news")
        }
    }

    const STRUCTURED_PAGE: &str = r#"<html><head>
        <script type="application/ld+json">{"@type": "NewsArticle",
            "headline": "Structured headline", "datePublished": "2021-03-03T10:00:00Z"}</script>
        </head><body><h1>Markup headline</h1><article><p>Body text.</p></article></body></html>"#;

    #[test]
    fn test_structured_title_wins_over_markup() {
        let fields = FieldChains {
            title: vec![Strategy::JsonLd, Strategy::markup(&["h1"])],
            ..FieldChains::default()
        };
        let page = RawPage::new("https://acme.test/a", STRUCTURED_PAGE);
        let record = FieldExtractor::default().extract(
            &page,
            &candidate("https://acme.test/a", "anchor"),
            &adapter(fields),
        );
        assert_eq!(record.title.as_deref(), Some("Structured headline"));
        assert_eq!(record.content_source, ContentSource::Structured);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2021, 3, 3));
        assert_eq!(record.winner(Field::Title), Some("json_ld"));
    }

    #[test]
    fn test_markup_used_without_structured_data() {
        let fields = FieldChains {
            title: vec![Strategy::JsonLd, Strategy::markup(&["h1"])],
            date: vec![Strategy::JsonLd],
            author: vec![Strategy::JsonLd],
            body: vec![Strategy::JsonLd],
        };
        let html = "<html><body><h1> Markup   headline </h1><p>Posted March 9, 2020</p></body></html>";
        let page = RawPage::new("https://acme.test/b", html);
        let record = FieldExtractor::default().extract(
            &page,
            &candidate("https://acme.test/b", "anchor"),
            &adapter(fields),
        );
        assert_eq!(record.title.as_deref(), Some("Markup headline"));
        assert_eq!(record.content_source, ContentSource::Markup);
        assert_eq!(record.author, None);
        assert_eq!(record.body, None);
        // date chain came up empty, so the page text was scanned
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2020, 3, 9));
    }

    #[test]
    fn test_fallback_chain_order_and_sources() {
        let fields = FieldChains {
            title: vec![Strategy::markup(&["h1"]), Strategy::UrlSlug],
            date: vec![],
            author: vec![
                Strategy::markup(&[".byline"]),
                Strategy::Fixed {
                    value: "Acme Therapeutics".to_string(),
                },
            ],
            body: vec![Strategy::TextScan {
                pattern: r"Summary: (.+)".to_string(),
            }],
        };
        let html = "<html><body><h1>   </h1><p>Summary: a short one</p></body></html>";
        let page = RawPage::new("https://acme.test/news/new-trial_results.html", html);
        let record = FieldExtractor::default().extract(
            &page,
            &candidate("https://acme.test/news/new-trial_results.html", ""),
            &adapter(fields),
        );
        assert_eq!(record.title.as_deref(), Some("new trial results"));
        assert_eq!(record.author.as_deref(), Some("Acme Therapeutics"));
        assert_eq!(record.body.as_deref(), Some("a short one"));
        assert_eq!(record.content_source, ContentSource::FallbackText);
        assert_eq!(record.date, None);
    }

    #[test]
    fn test_anchor_text_title_counts_as_markup() {
        let fields = FieldChains {
            title: vec![Strategy::markup(&["h1"]), Strategy::AnchorText],
            ..FieldChains::default()
        };
        let page = RawPage::new("https://acme.test/c", "<html><body><p>x</p></body></html>");
        let record = FieldExtractor::default().extract(
            &page,
            &candidate("https://acme.test/c", "From the listing"),
            &adapter(fields),
        );
        assert_eq!(record.title.as_deref(), Some("From the listing"));
        assert_eq!(record.content_source, ContentSource::Markup);
    }

    #[test]
    fn test_invalid_strategy_is_skipped() {
        let fields = FieldChains {
            title: vec![
                Strategy::markup(&["h1["]),
                Strategy::TextScan {
                    pattern: "(".to_string(),
                },
                Strategy::markup(&["h2"]),
            ],
            ..FieldChains::default()
        };
        let page = RawPage::new("https://acme.test/d", "<h2>Second level</h2>");
        let record = FieldExtractor::default().extract(
            &page,
            &candidate("https://acme.test/d", ""),
            &adapter(fields),
        );
        assert_eq!(record.title.as_deref(), Some("Second level"));
    }

    #[test]
    fn test_slug_text() {
        assert_eq!(
            slug_text("https://x.test/press/phase-2_results.html").as_deref(),
            Some("phase 2 results")
        );
        assert_eq!(slug_text("https://x.test/"), None);
    }
}
