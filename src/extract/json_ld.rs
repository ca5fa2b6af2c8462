//! Schema.org JSON-LD metadata.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::ExtractionError;

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// `@type` values that describe the page's main content.
const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "Report",
    "ScholarlyArticle",
    "PressRelease",
];

/// Article fields found in a page's JSON-LD blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct JsonLdArticle {
    pub headline: Option<String>,
    pub date_published: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
}

/// Read every JSON-LD block. Malformed blocks are skipped.
pub(crate) fn read(html: &Html) -> JsonLdArticle {
    let mut items = Vec::new();
    for script in html.select(&LD_JSON) {
        let raw: String = script.text().collect();
        match parse_block(&raw) {
            Ok(value) => flatten(value, &mut items),
            Err(e) => debug!("{}", e),
        }
    }

    let articles: Vec<&Value> = items.iter().filter(|item| is_article(item)).collect();
    let pool: Vec<&Value> = if articles.is_empty() {
        items.iter().collect()
    } else {
        articles
    };

    JsonLdArticle {
        headline: first_string(&pool, &["headline", "name"]),
        date_published: first_string(&pool, &["datePublished", "dateCreated"]),
        author: pool.iter().find_map(|item| author_name(item.get("author")?)),
        body: first_string(&pool, &["articleBody", "description"]),
    }
}

fn parse_block(raw: &str) -> Result<Value, ExtractionError> {
    let trimmed = raw.trim().trim_end_matches(';');
    Ok(serde_json::from_str(trimmed)?)
}

/// Collect objects from a top-level object, an array, or an `@graph`.
fn flatten(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn is_article(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_string(pool: &[&Value], keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| pool.iter().find_map(|item| item.get(*key).and_then(non_empty)))
}

/// `author` may be a string, an object with `name`, or a list of either.
fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(_) => non_empty(author),
        Value::Object(map) => map.get("name").and_then(non_empty),
        Value::Array(list) => list.iter().find_map(author_name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(html: &str) -> JsonLdArticle {
        read(&Html::parse_document(html))
    }

    #[test]
    fn test_graph_prefers_article_node() {
        let article = read_str(
            r#"<script type="application/ld+json">{
                "@context": "https://schema.org",
                "@graph": [
                    {"@type": "Organization", "name": "Acme Bio"},
                    {"@type": "NewsArticle", "headline": "Phase 2 data",
                     "datePublished": "2022-11-30T08:00:00+00:00",
                     "author": [{"@type": "Person", "name": "Pat Lee"}],
                     "description": "Summary text"}
                ]
            }</script>"#,
        );
        assert_eq!(article.headline.as_deref(), Some("Phase 2 data"));
        assert_eq!(
            article.date_published.as_deref(),
            Some("2022-11-30T08:00:00+00:00")
        );
        assert_eq!(article.author.as_deref(), Some("Pat Lee"));
        assert_eq!(article.body.as_deref(), Some("Summary text"));
    }

    #[test]
    fn test_plain_object_and_string_author() {
        let article = read_str(
            r#"<script type="application/ld+json">{"@type": "WebPage", "name": "About us", "author": "Newsroom"}</script>"#,
        );
        assert_eq!(article.headline.as_deref(), Some("About us"));
        assert_eq!(article.author.as_deref(), Some("Newsroom"));
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let article = read_str(
            r#"<script type="application/ld+json">{ not json</script>
               <script type="application/ld+json">[{"@type": "Article", "headline": "Kept"}]</script>"#,
        );
        assert_eq!(article.headline.as_deref(), Some("Kept"));
        assert_eq!(article.date_published, None);
    }
}
