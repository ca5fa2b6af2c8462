//! newsacquire - press-release and news record acquisition.
//!
//! Crawls heterogeneous organization news listings, extracts normalized
//! records (title, date, author, body) through per-site fallback chains, and
//! exports deduplicated results as JSON or CSV.

pub mod cli;
pub mod config;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod scrapers;
pub mod services;
pub mod sinks;
pub mod storage;

pub use config::{Config, ConfigError, PipelineSettings};
pub use models::{ArticleCandidate, ContentSource, ExtractedRecord, RawPage};
pub use pipeline::{Orchestrator, SourceSummary};
pub use registry::{SiteAdapter, SiteRegistry};
