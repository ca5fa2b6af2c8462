//! Page acquisition: fetchers, link relevance, and the pagination frontier.

pub mod browser;
pub mod fetcher;
pub mod fixture;
pub mod frontier;
mod http_client;
pub mod link_filter;

pub use browser::{BrowserFetcher, BrowserSettings};
pub use fetcher::{FetchError, PageFetcher};
pub use fixture::FixtureFetcher;
pub use frontier::{Frontier, FrontierOutcome, Termination};
pub use http_client::{resolve_user_agent, HttpClient, HttpFetcher, USER_AGENT};
pub use link_filter::{LinkFilter, RelevanceConfig};
