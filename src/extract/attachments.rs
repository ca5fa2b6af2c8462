//! Downloadable attachments (press-release PDFs) linked from an article.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::document::Document;
use super::ExtractionError;
use crate::scrapers::frontier::canonicalize;

fn default_link_text() -> Option<String> {
    Some(r"^\s*download".to_string())
}

fn default_href_pattern() -> Option<String> {
    Some(r"\.pdf($|[?#])".to_string())
}

/// Which links on an article page are attachments. A link qualifies when its
/// text matches `link_text` or its href matches `href_pattern`
/// (both case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRule {
    #[serde(default = "default_link_text")]
    pub link_text: Option<String>,
    #[serde(default = "default_href_pattern")]
    pub href_pattern: Option<String>,
}

impl Default for AttachmentRule {
    fn default() -> Self {
        Self {
            link_text: default_link_text(),
            href_pattern: default_href_pattern(),
        }
    }
}

fn compile(pattern: &Option<String>) -> Result<Option<Regex>, ExtractionError> {
    pattern
        .as_deref()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|source| ExtractionError::InvalidPattern {
                    pattern: p.to_string(),
                    source,
                })
        })
        .transpose()
}

impl AttachmentRule {
    pub fn validate(&self) -> Result<(), ExtractionError> {
        compile(&self.link_text)?;
        compile(&self.href_pattern)?;
        Ok(())
    }

    /// Canonical attachment URLs in document order, each once.
    pub(crate) fn find(&self, doc: &Document, page_url: &str) -> Result<Vec<String>, ExtractionError> {
        let text_re = compile(&self.link_text)?;
        let href_re = compile(&self.href_pattern)?;
        let Ok(base) = Url::parse(page_url) else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for (href, text) in doc.anchors() {
            let by_text = text_re.as_ref().is_some_and(|re| re.is_match(&text));
            let by_href = href_re.as_ref().is_some_and(|re| re.is_match(href));
            if !(by_text || by_href) {
                continue;
            }
            if let Some(url) = canonicalize(&base, href) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_matches_text_or_pdf_href() {
        let doc = Document::parse(
            r#"<a href="/files/pr-2021.PDF">Press release</a>
               <a href="/dl?id=7">Download</a>
               <a href="/files/pr-2021.PDF#page=2">same file</a>
               <a href="/about">About</a>
               <a href="mailto:ir@example.com">download the deck</a>"#,
        );
        let urls = AttachmentRule::default()
            .find(&doc, "https://ir.example.com/news/item")
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://ir.example.com/files/pr-2021.PDF".to_string(),
                "https://ir.example.com/dl?id=7".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let rule = AttachmentRule {
            link_text: Some("(".to_string()),
            href_pattern: None,
        };
        assert!(matches!(
            rule.validate(),
            Err(ExtractionError::InvalidPattern { .. })
        ));
    }
}
