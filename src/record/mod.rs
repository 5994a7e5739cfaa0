//! Harvested record types
//!
//! A run moves every listed entry through three shapes:
//!
//! - `CandidateReference`: what the listing page says about an entry
//! - `ParsedDetail`: what the entry's detail page says about itself
//! - `DetailRecord`: the two merged, ready to be persisted
//!
//! The canonical detail URL is the natural key throughout.

mod canonical;

pub use canonical::canonicalize_url;

use chrono::{DateTime, Utc};

/// A listed entry prior to detail enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReference {
    /// Normalized listing title
    pub title: String,
    /// Canonical detail URL
    pub url: String,
    /// Date shown next to the entry on the listing page
    pub listed_date: String,
}

/// Fields extracted from one detail page
///
/// Carries its own `title`, which `merge_records` discards in favor of the
/// listing title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDetail {
    pub title: String,
    pub author: String,
    pub view_count: u64,
    pub created_at: String,
    pub description: String,
    pub tags: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Fully assembled record, keyed by `url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub title: String,
    pub url: String,
    pub listed_date: String,
    pub author: String,
    pub view_count: u64,
    pub created_at: String,
    pub description: String,
    pub tags: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Combines listing metadata with detail metadata
///
/// # Field Precedence
///
/// | Field | Source |
/// |-------|--------|
/// | `title`, `url`, `listed_date` | candidate |
/// | everything else | detail |
///
/// The detail page's own title is dropped.
pub fn merge_records(candidate: &CandidateReference, detail: ParsedDetail) -> DetailRecord {
    let ParsedDetail {
        title: _,
        author,
        view_count,
        created_at,
        description,
        tags,
        scraped_at,
    } = detail;

    DetailRecord {
        title: candidate.title.clone(),
        url: candidate.url.clone(),
        listed_date: candidate.listed_date.clone(),
        author,
        view_count,
        created_at,
        description,
        tags,
        scraped_at,
    }
}

/// Normalizes a listed title
///
/// Removes every occurrence of the boilerplate `marker` token, then collapses
/// all runs of whitespace (including newlines) into single spaces.
///
/// ```
/// use kin_harvest::record::clean_title;
///
/// assert_eq!(clean_title("  질문 핀다 대출\n 후기  ", "질문"), "핀다 대출 후기");
/// ```
pub fn clean_title(raw: &str, marker: &str) -> String {
    let stripped = if marker.is_empty() {
        raw.to_string()
    } else {
        raw.replace(marker, "")
    };
    collapse_whitespace(&stripped)
}

/// Joins whitespace-separated words with single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
