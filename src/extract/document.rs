//! Parsed article document with the lookups the strategies need.

use std::cell::OnceCell;
use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::json_ld::{self, JsonLdArticle};
use super::{element_text, parse_selector, ExtractionError};

/// Elements whose text never counts as visible page text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

pub(crate) struct Document {
    html: Html,
    json_ld: OnceCell<JsonLdArticle>,
    visible_text: OnceCell<String>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            json_ld: OnceCell::new(),
            visible_text: OnceCell::new(),
        }
    }

    pub fn json_ld(&self) -> &JsonLdArticle {
        self.json_ld.get_or_init(|| json_ld::read(&self.html))
    }

    /// Text of all rendered text nodes, one per line.
    pub fn visible_text(&self) -> &str {
        self.visible_text.get_or_init(|| {
            let mut lines = Vec::new();
            for node in self.html.root_element().descendants() {
                let Node::Text(text) = node.value() else {
                    continue;
                };
                let hidden = node
                    .ancestors()
                    .filter_map(|a| a.value().as_element())
                    .any(|e| HIDDEN_ELEMENTS.contains(&e.name()));
                if hidden {
                    continue;
                }
                let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            lines.join("\n")
        })
    }

    /// `content` of the first `<meta name|property=…>` among `names`, in order.
    pub fn meta(&self, names: &[String]) -> Option<String> {
        static META: std::sync::LazyLock<Selector> =
            std::sync::LazyLock::new(|| Selector::parse("meta[content]").unwrap());

        names.iter().find_map(|name| {
            self.html
                .select(&META)
                .filter(|m| {
                    let attrs = m.value();
                    attrs
                        .attr("name")
                        .or_else(|| attrs.attr("property"))
                        .or_else(|| attrs.attr("itemprop"))
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .filter_map(|m| m.value().attr("content"))
                .map(str::trim)
                .find(|c| !c.is_empty())
                .map(str::to_string)
        })
    }

    fn matches<'a>(&'a self, scope: Option<ElementRef<'a>>, selector: &'a Selector) -> Vec<ElementRef<'a>> {
        match scope {
            Some(el) => el.select(selector).collect(),
            None => self.html.select(selector).collect(),
        }
    }

    /// First non-empty selector match, in selector order.
    ///
    /// With `attribute`, the attribute value is read instead of the text. With
    /// `blocks`, the texts of matching descendants of every matched container
    /// are joined line by line, skipping exact duplicates.
    pub fn markup(
        &self,
        selectors: &[String],
        attribute: Option<&str>,
        blocks: Option<&str>,
        within: Option<&str>,
    ) -> Result<Option<String>, ExtractionError> {
        let scope = match within {
            Some(css) => {
                let container = parse_selector(css)?;
                match self.html.select(&container).next() {
                    Some(el) => Some(el),
                    None => {
                        debug!("Container {} not present", css);
                        return Ok(None);
                    }
                }
            }
            None => None,
        };
        let block_selector = blocks.map(parse_selector).transpose()?;

        for css in selectors {
            let selector = parse_selector(css)?;
            let matched = self.matches(scope, &selector);

            let value = match (&block_selector, attribute) {
                (Some(block), _) => collect_blocks(&matched, block),
                (None, Some(attr)) => matched
                    .iter()
                    .filter_map(|el| el.value().attr(attr))
                    .map(str::trim)
                    .find(|v| !v.is_empty())
                    .map(str::to_string),
                (None, None) => matched
                    .iter()
                    .map(|el| element_text(*el))
                    .find(|t| !t.is_empty()),
            };
            if value.is_some() {
                return Ok(value);
            }
        }
        Ok(None)
    }

    /// Every `<a href>` with its trimmed text.
    pub fn anchors(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        static ANCHOR: std::sync::LazyLock<Selector> =
            std::sync::LazyLock::new(|| Selector::parse("a[href]").unwrap());
        self.html.select(&ANCHOR).filter_map(|a| {
            a.value()
                .attr("href")
                .map(|href| (href, element_text(a)))
        })
    }
}

fn collect_blocks(containers: &[ElementRef<'_>], block: &Selector) -> Option<String> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for container in containers {
        for el in container.select(block) {
            let text = element_text(el);
            if !text.is_empty() && seen.insert(text.clone()) {
                lines.push(text);
            }
        }
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html><head>
        <title>Ignored | Site</title>
        <meta property="og:title" content="  OG headline ">
        <meta name="author" content="">
        <meta name="Author" content="Jane Roe">
        <script>var x = "not visible";</script>
        </head><body>
        <article>
          <h1 class="entry-title">Trial results</h1>
          <time datetime="2023-05-02">May 2</time>
          <div class="entry-content"><p>First paragraph.</p><p>Second   paragraph.</p></div>
          <div class="entry-content"><p>First paragraph.</p><p>Third.</p></div>
        </article>
        <aside><h1>Sidebar</h1></aside>
        </body></html>"#;

    #[test]
    fn test_meta_lookup_by_name_or_property() {
        let doc = Document::parse(ARTICLE);
        assert_eq!(doc.meta(&["og:title".into()]).as_deref(), Some("OG headline"));
        assert_eq!(doc.meta(&["author".into()]).as_deref(), Some("Jane Roe"));
        assert_eq!(doc.meta(&["description".into()]), None);
    }

    #[test]
    fn test_markup_text_attribute_and_blocks() {
        let doc = Document::parse(ARTICLE);
        assert_eq!(
            doc.markup(&["h2".into(), "h1.entry-title".into()], None, None, None)
                .unwrap()
                .as_deref(),
            Some("Trial results")
        );
        assert_eq!(
            doc.markup(&["time".into()], Some("datetime"), None, None)
                .unwrap()
                .as_deref(),
            Some("2023-05-02")
        );
        assert_eq!(
            doc.markup(&[".entry-content".into()], None, Some("p"), None)
                .unwrap()
                .as_deref(),
            Some("First paragraph.\nSecond paragraph.\nThird.")
        );
    }

    #[test]
    fn test_markup_within_scope() {
        let doc = Document::parse(ARTICLE);
        assert_eq!(
            doc.markup(&["h1".into()], None, None, Some("aside"))
                .unwrap()
                .as_deref(),
            Some("Sidebar")
        );
        assert_eq!(doc.markup(&["h1".into()], None, None, Some("nav")).unwrap(), None);
    }

    #[test]
    fn test_markup_invalid_selector() {
        let doc = Document::parse(ARTICLE);
        assert!(matches!(
            doc.markup(&["h1[".into()], None, None, None),
            Err(ExtractionError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let doc = Document::parse(ARTICLE);
        let text = doc.visible_text();
        assert!(text.contains("Trial results"));
        assert!(text.contains("Second paragraph."));
        assert!(!text.contains("not visible"));
        assert!(!text.contains("Ignored | Site"));
    }
}
