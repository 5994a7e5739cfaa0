//! Detail page fetching and parsing
//!
//! A detail fetch is attempted up to `max_attempts` times, strictly one after
//! another, pausing between attempts that failed transiently. Parse failures
//! are never retried. Either way the caller gets an error instead of a
//! partially filled record.

use crate::config::{DetailConfig, FetchConfig};
use crate::harvester::compile_selector;
use crate::harvester::source::{DocumentSource, FetchError};
use crate::record::{collapse_whitespace, ParsedDetail};
use crate::ConfigError;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, Span};

/// First run of ASCII digits, allowing thousands separators ("1,234")
const VIEW_COUNT_PATTERN: &str = r"[0-9][0-9,]*";

/// Expected structure missing or malformed in a fetched document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing {element} element in {url}")]
    MissingElement { url: String, element: &'static str },

    #[error("No view count in '{text}' for {url}")]
    InvalidViewCount { url: String, text: String },
}

/// Why a detail fetch produced no record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetailError {
    #[error("Failed after {attempts} attempt(s): {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: FetchError,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Attempt budget for one detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Pause after a transient failure before the next attempt
    pub delay: Duration,
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: config.retry_delay(),
            attempt_timeout: config.request_timeout(),
        }
    }

    /// Worst-case time one item can spend in `fetch_with_retry`
    pub fn worst_case(&self) -> Duration {
        (self.attempt_timeout + self.delay) * self.max_attempts
    }
}

/// Compiled detail page selectors
pub struct DetailParser {
    title: Selector,
    author: Selector,
    views: Selector,
    created_at: Selector,
    created_at_label: String,
    description: Selector,
    tags: Selector,
    view_count: Regex,
}

impl DetailParser {
    pub fn new(config: &DetailConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: compile_selector(&config.title_selector)?,
            author: compile_selector(&config.author_selector)?,
            views: compile_selector(&config.views_selector)?,
            created_at: compile_selector(&config.created_at_selector)?,
            created_at_label: config.created_at_label.clone(),
            description: compile_selector(&config.description_selector)?,
            tags: compile_selector(&config.tags_selector)?,
            view_count: Regex::new(VIEW_COUNT_PATTERN)
                .map_err(|e| ConfigError::Validation(e.to_string()))?,
        })
    }

    /// Parses one detail document
    ///
    /// # Field Rules
    ///
    /// | Field | Missing element |
    /// |-------|-----------------|
    /// | title | error |
    /// | author (info block) | error |
    /// | view count | 0 |
    /// | created at | empty |
    /// | description | error |
    /// | tags | empty list |
    ///
    /// A view count element without any digits is an error.
    pub fn parse(
        &self,
        url: &str,
        html: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<ParsedDetail, ParseError> {
        let document = Html::parse_document(html);
        let missing = |element: &'static str| ParseError::MissingElement {
            url: url.to_string(),
            element,
        };

        let title = first_text(&document, &self.title).ok_or_else(|| missing("title"))?;
        let author = first_text(&document, &self.author).ok_or_else(|| missing("author"))?;

        let view_count = match first_text(&document, &self.views) {
            Some(text) => parse_view_count(&self.view_count, &text).ok_or_else(|| {
                ParseError::InvalidViewCount {
                    url: url.to_string(),
                    text,
                }
            })?,
            None => 0,
        };

        let created_at = first_text(&document, &self.created_at)
            .map(|text| strip_label(&text, &self.created_at_label))
            .unwrap_or_default();

        let description = document
            .select(&self.description)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .ok_or_else(|| missing("description"))?;

        let tags = document
            .select(&self.tags)
            .map(element_text)
            .filter(|tag| !tag.is_empty())
            .collect();

        Ok(ParsedDetail {
            title,
            author,
            view_count,
            created_at,
            description,
            tags,
            scraped_at,
        })
    }
}

/// Fetches and parses detail pages
pub struct DetailFetcher {
    source: Arc<dyn DocumentSource>,
    parser: DetailParser,
    policy: RetryPolicy,
    span: Span,
}

impl DetailFetcher {
    /// Creates a detail fetcher that logs inside `span`
    pub fn new(
        source: Arc<dyn DocumentSource>,
        parser: DetailParser,
        policy: RetryPolicy,
        span: Span,
    ) -> Self {
        Self {
            source,
            parser,
            policy,
            span,
        }
    }

    /// Fetches `url` and parses it into a `ParsedDetail`
    ///
    /// `scraped_at` is the moment the document finished downloading.
    pub async fn fetch_detail(&self, url: &str) -> Result<ParsedDetail, DetailError> {
        let html = self
            .fetch_with_retry(url)
            .instrument(self.span.clone())
            .await?;
        let scraped_at = Utc::now();

        self.parser.parse(url, &html, scraped_at).map_err(|e| {
            let _enter = self.span.enter();
            tracing::error!("Error parsing detail page {}: {}", url, e);
            DetailError::Parse(e)
        })
    }

    /// Retrieves the raw document, retrying transient failures
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String, DetailError> {
        let mut attempt = 1;
        loop {
            let err = match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if !err.is_transient() {
                tracing::error!("Giving up on {}: {}", url, err);
                return Err(DetailError::Fetch {
                    attempts: attempt,
                    source: err,
                });
            }

            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    "Failed to fetch {} after {} attempts",
                    url,
                    self.policy.max_attempts
                );
                return Err(DetailError::Fetch {
                    attempts: attempt,
                    source: err,
                });
            }

            tracing::warn!(attempt, "Network error while fetching {}: {}. Retrying...", url, err);
            tokio::time::sleep(self.policy.delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        match tokio::time::timeout(self.policy.attempt_timeout, self.source.get(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::transient(
                url,
                format!("no response within {:?}", self.policy.attempt_timeout),
            )),
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(element_text)
}

/// Extracts the view count from text such as "조회수 1,234"
fn parse_view_count(pattern: &Regex, text: &str) -> Option<u64> {
    let digits: String = pattern
        .find(text)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn strip_label(text: &str, label: &str) -> String {
    if label.is_empty() {
        return text.trim().to_string();
    }
    text.replace(label, "").trim().to_string()
}
