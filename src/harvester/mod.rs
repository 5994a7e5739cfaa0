//! Harvester module: the fetch-dedup-persist pipeline
//!
//! This module contains the core harvesting logic, including:
//! - Document retrieval with transient/permanent failure classification
//! - Listing extraction with a bounded readiness wait
//! - Store-backed deduplication of listed entries
//! - Detail fetching with bounded retry, and detail parsing
//! - Overall run coordination

mod coordinator;
mod dedup;
mod detail;
mod listing;
mod source;

pub use coordinator::{run_once, Coordinator};
pub use dedup::{DedupOutcome, Deduplicator};
pub use detail::{DetailError, DetailFetcher, DetailParser, ParseError, RetryPolicy};
pub use listing::ListingFetcher;
pub use source::{build_http_client, DocumentSource, FetchError, HttpSource};

use crate::ConfigError;
use scraper::Selector;

/// Compiles a configured CSS selector
///
/// Selectors are validated with the configuration, so a failure here is a
/// configuration error and aborts the run before any fetch.
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
