//! Link harvesting from listing pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::extract::{element_text, parse_selector};

static ANCHOR_WITH_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// An article link found on a listing page, before relevance filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListingLink {
    pub url: String,
    pub anchor_text: String,
}

/// Resolve `href` against `base`, keep only http(s), and drop the fragment.
pub(crate) fn canonicalize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// The href carried by a matched listing element: the element itself when it
/// is an anchor, else its first descendant anchor, else its nearest anchor ancestor.
fn link_href<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    if el.value().name() == "a" {
        return el.value().attr("href");
    }
    if let Some(anchor) = el.select(&ANCHOR_WITH_HREF).next() {
        return anchor.value().attr("href");
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "a" && a.value().attr("href").is_some())
        .and_then(|a| a.value().attr("href"))
}

fn page_base(page_url: &str) -> Option<Url> {
    match Url::parse(page_url) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Cannot resolve links against {}: {}", page_url, e);
            None
        }
    }
}

/// Collect canonical article links matched by `selectors`, in selector order
/// then document order, each URL once.
pub(crate) fn extract_links(html: &str, page_url: &str, selectors: &[String]) -> Vec<ListingLink> {
    let Some(base) = page_base(page_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let default_selectors = ["a[href]".to_string()];
    let selectors = if selectors.is_empty() {
        &default_selectors[..]
    } else {
        selectors
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for css in selectors {
        let selector = match parse_selector(css) {
            Ok(s) => s,
            Err(e) => {
                warn!("Skipping link selector: {}", e);
                continue;
            }
        };
        for el in document.select(&selector) {
            let Some(url) = link_href(el).and_then(|href| canonicalize(&base, href)) else {
                continue;
            };
            if seen.insert(url.clone()) {
                links.push(ListingLink {
                    url,
                    anchor_text: element_text(el),
                });
            }
        }
    }
    debug!("{} links on {}", links.len(), page_url);
    links
}

/// Locate the next listing page through `selectors` (`{next}` replaced by
/// `next_page`), falling back to `url_template` (`{page}` replaced).
pub(crate) fn find_next_url(
    html: &str,
    page_url: &str,
    selectors: &[String],
    url_template: Option<&str>,
    next_page: u32,
) -> Option<String> {
    let base = page_base(page_url)?;
    let next = next_page.to_string();

    if !selectors.is_empty() {
        let document = Html::parse_document(html);
        for css in selectors {
            let css = css.replace("{next}", &next);
            let Ok(selector) = parse_selector(&css) else {
                continue;
            };
            if let Some(url) = document
                .select(&selector)
                .filter_map(link_href)
                .find_map(|href| canonicalize(&base, href))
            {
                return Some(url);
            }
        }
    }

    url_template.and_then(|template| canonicalize(&base, &template.replace("{page}", &next)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://news.example.org/press/";

    #[test]
    fn test_canonicalize() {
        let base = Url::parse(PAGE).unwrap();
        assert_eq!(
            canonicalize(&base, "../a-story#top").as_deref(),
            Some("https://news.example.org/a-story")
        );
        assert_eq!(canonicalize(&base, "mailto:pr@example.org"), None);
        assert_eq!(canonicalize(&base, "javascript:void(0)"), None);
        assert_eq!(canonicalize(&base, "#"), None);
        assert_eq!(canonicalize(&base, "  "), None);
    }

    #[test]
    fn test_extract_links_resolution_rules() {
        let html = r#"
            <div class="item"><h3><a href="/one">First story</a></h3></div>
            <a href="/two"><h5 class="title">Second story</h5></a>
            <div class="item"><h3>No link here</h3></div>
            <a class="item">missing href</a>
        "#;
        let links = extract_links(
            html,
            PAGE,
            &["div.item".to_string(), "h5.title".to_string(), "a.item".to_string()],
        );
        assert_eq!(
            links,
            vec![
                ListingLink {
                    url: "https://news.example.org/one".into(),
                    anchor_text: "First story".into(),
                },
                ListingLink {
                    url: "https://news.example.org/two".into(),
                    anchor_text: "Second story".into(),
                },
            ]
        );
    }

    #[test]
    fn test_extract_links_dedups_within_page() {
        let html = r#"<a href="/x">A</a><a href="/x#more">A again</a><a href="/y">B</a>"#;
        let links = extract_links(html, PAGE, &[]);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].anchor_text, "A");
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let html = r#"<a href="/x">A</a>"#;
        let links = extract_links(html, PAGE, &["a[".to_string(), "a".to_string()]);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_find_next_url_with_placeholder() {
        let html = r#"<a class="page larger" title="Page 3" href="/press/page/3/">3</a>"#;
        let next = find_next_url(
            html,
            PAGE,
            &["a.page.larger[title='Page {next}']".to_string()],
            None,
            3,
        );
        assert_eq!(next.as_deref(), Some("https://news.example.org/press/page/3/"));

        assert_eq!(
            find_next_url(html, PAGE, &["a.next".to_string()], None, 2),
            None
        );
    }

    #[test]
    fn test_find_next_url_template_fallback() {
        let next = find_next_url("<p></p>", PAGE, &[], Some("/press/page/{page}/"), 4);
        assert_eq!(next.as_deref(), Some("https://news.example.org/press/page/4/"));
    }
}
