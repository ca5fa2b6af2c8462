//! Crawl frontier: walks a source's listing pages and yields unique, relevant
//! article candidates.
//!
//! The frontier is a small state machine. Each call to [`Frontier::next_page`]
//! loads one more listing state (a new numbered page, the DOM after a
//! "load more" click, or the DOM after a scroll) and returns the candidates it
//! contributed. Termination is recorded as a [`Termination`] value rather than
//! an error.

mod links;

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

pub(crate) use links::canonicalize;
use links::{extract_links, find_next_url};

use super::fetcher::PageFetcher;
use crate::models::{ArticleCandidate, CrawlTarget, PaginationStrategy, RawPage};

/// Why a frontier stopped producing pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The listing has no further pages (single page, or no next link).
    Exhausted,
    /// A page or load step added no links that had not been seen.
    NoNewLinks,
    /// The next link points at a page that was already visited.
    AlreadyVisited,
    /// The load-more control could not be activated.
    ControlMissing,
    /// Scrolling no longer changes the document height.
    HeightUnchanged,
    /// `max_iterations` listing states were loaded.
    IterationCap,
    /// A listing fetch failed; candidates found before it are kept.
    FetchFailed(String),
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::FetchFailed(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => write!(f, "exhausted"),
            Termination::NoNewLinks => write!(f, "no new links"),
            Termination::AlreadyVisited => write!(f, "next page already visited"),
            Termination::ControlMissing => write!(f, "load-more control gone"),
            Termination::HeightUnchanged => write!(f, "scroll height unchanged"),
            Termination::IterationCap => write!(f, "iteration cap reached"),
            Termination::FetchFailed(reason) => write!(f, "fetch failed: {}", reason),
        }
    }
}

/// Everything a drained frontier produced.
#[derive(Debug, Clone)]
pub struct FrontierOutcome {
    pub candidates: Vec<ArticleCandidate>,
    /// Listing states examined.
    pub pages: u32,
    pub termination: Termination,
}

pub struct Frontier<'t> {
    target: &'t CrawlTarget,
    seen: HashSet<String>,
    visited_pages: HashSet<String>,
    pages: u32,
    page_number: u32,
    next_url: Option<String>,
    last_fingerprint: Option<u64>,
    termination: Option<Termination>,
}

impl<'t> Frontier<'t> {
    pub fn new(target: &'t CrawlTarget) -> Self {
        Self {
            target,
            seen: HashSet::new(),
            visited_pages: HashSet::new(),
            pages: 0,
            page_number: 1,
            next_url: None,
            last_fingerprint: None,
            termination: None,
        }
    }

    /// Drain the frontier for `target`.
    pub async fn enumerate<F>(target: &'t CrawlTarget, fetcher: &mut F) -> FrontierOutcome
    where
        F: PageFetcher + ?Sized,
    {
        let mut frontier = Frontier::new(target);
        let mut candidates = Vec::new();
        while let Some(batch) = frontier.next_page(fetcher).await {
            candidates.extend(batch);
        }
        let termination = frontier
            .termination
            .clone()
            .unwrap_or(Termination::Exhausted);
        info!(
            source = %target.source_id,
            candidates = candidates.len(),
            pages = frontier.pages,
            "Frontier finished: {}",
            termination
        );
        FrontierOutcome {
            candidates,
            pages: frontier.pages,
            termination,
        }
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Load the next listing state and return its new relevant candidates.
    /// Returns `None` once the frontier has terminated.
    pub async fn next_page<F>(&mut self, fetcher: &mut F) -> Option<Vec<ArticleCandidate>>
    where
        F: PageFetcher + ?Sized,
    {
        if self.termination.is_some() {
            return None;
        }

        let (page, stalled) = match self.load(fetcher).await {
            Ok(loaded) => loaded,
            Err(termination) => {
                self.finish(termination);
                return None;
            }
        };
        self.pages += 1;
        self.visited_pages.insert(page.url.clone());

        let (fresh, candidates) = self.harvest(&page);
        debug!(
            source = %self.target.source_id,
            page = self.pages,
            fresh,
            relevant = candidates.len(),
            "Harvested listing state"
        );

        if let Some(termination) = self.after_harvest(&page, fresh, stalled) {
            self.finish(termination);
        }
        Some(candidates)
    }

    fn finish(&mut self, termination: Termination) {
        if termination.is_failure() {
            warn!(source = %self.target.source_id, "Frontier stopped early: {}", termination);
        }
        self.termination = Some(termination);
    }

    /// Produce the next listing state. The flag is true when a scroll step
    /// left the document height unchanged.
    async fn load<F>(&mut self, fetcher: &mut F) -> Result<(RawPage, bool), Termination>
    where
        F: PageFetcher + ?Sized,
    {
        let failed = |e: super::FetchError| Termination::FetchFailed(e.to_string());

        if self.pages == 0 {
            let page = fetcher.fetch(&self.target.start_url).await.map_err(failed)?;
            if self.target.pagination == PaginationStrategy::Scroll {
                match fetcher.scroll_height().await {
                    Ok(height) => self.last_fingerprint = Some(height),
                    Err(e) => debug!("No scroll baseline for {}: {}", page.url, e),
                }
            }
            return Ok((page, false));
        }

        match &self.target.pagination {
            PaginationStrategy::Single => Err(Termination::Exhausted),
            PaginationStrategy::Numbered { .. } => {
                let url = self.next_url.take().ok_or(Termination::Exhausted)?;
                self.page_number += 1;
                let page = fetcher.fetch(&url).await.map_err(failed)?;
                Ok((page, false))
            }
            PaginationStrategy::LoadMore { control_selector } => {
                if let Err(e) = fetcher.activate(control_selector).await {
                    debug!("Load-more activation ended pagination: {}", e);
                    return Err(Termination::ControlMissing);
                }
                let page = fetcher.snapshot().await.map_err(failed)?;
                Ok((page, false))
            }
            PaginationStrategy::Scroll => {
                let fingerprint = fetcher.scroll_to_bottom().await.map_err(failed)?;
                let stalled = self.last_fingerprint == Some(fingerprint);
                self.last_fingerprint = Some(fingerprint);
                let page = fetcher.snapshot().await.map_err(failed)?;
                Ok((page, stalled))
            }
        }
    }

    /// Record every link on the page as seen and return the number that were
    /// new, plus the new ones that pass the relevance filter.
    fn harvest(&mut self, page: &RawPage) -> (usize, Vec<ArticleCandidate>) {
        let links = extract_links(&page.html, &page.url, &self.target.link_selectors);
        let mut fresh = 0;
        let mut candidates = Vec::new();
        for link in links {
            if !self.seen.insert(link.url.clone()) {
                continue;
            }
            fresh += 1;
            if self.target.relevance.is_relevant(&link.anchor_text, &link.url) {
                candidates.push(ArticleCandidate {
                    source_id: self.target.source_id.clone(),
                    canonical_url: link.url,
                    anchor_text: link.anchor_text,
                });
            }
        }
        (fresh, candidates)
    }

    fn after_harvest(&mut self, page: &RawPage, fresh: usize, stalled: bool) -> Option<Termination> {
        match &self.target.pagination {
            PaginationStrategy::Single => return Some(Termination::Exhausted),
            PaginationStrategy::Numbered {
                next_selectors,
                url_template,
            } => {
                if fresh == 0 {
                    return Some(Termination::NoNewLinks);
                }
                let next = find_next_url(
                    &page.html,
                    &page.url,
                    next_selectors,
                    url_template.as_deref(),
                    self.page_number + 1,
                );
                match next {
                    None => return Some(Termination::Exhausted),
                    Some(url) if self.visited_pages.contains(&url) => {
                        return Some(Termination::AlreadyVisited)
                    }
                    Some(url) => self.next_url = Some(url),
                }
            }
            PaginationStrategy::LoadMore { .. } => {
                if fresh == 0 {
                    return Some(Termination::NoNewLinks);
                }
            }
            PaginationStrategy::Scroll => {
                if stalled {
                    return Some(Termination::HeightUnchanged);
                }
            }
        }

        if self.pages >= self.target.max_iterations {
            return Some(Termination::IterationCap);
        }
        None
    }
}
