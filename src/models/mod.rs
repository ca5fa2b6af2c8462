//! Data models for newsacquire.

mod article;
mod target;

pub use article::{ArticleCandidate, ContentSource, ExtractedRecord, Field, RawPage};
pub use target::{CrawlTarget, PaginationStrategy, DEFAULT_MAX_ITERATIONS};
