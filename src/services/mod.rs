//! Shared record services: date normalization, body cleaning, deduplication.

pub mod cleaner;
pub mod date_normalize;
pub mod dedup;

pub use cleaner::{ContentCleaner, COMMON_BOILERPLATE};
pub use date_normalize::DateNormalizer;
pub use dedup::{normalize_title, Deduplicator, SeenIndex};
