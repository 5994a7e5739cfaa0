//! Listing page extraction
//!
//! Retrieves the listing page, waits (bounded) for its entries to be present,
//! and turns each entry into a `CandidateReference`. A listing that never
//! becomes ready yields no candidates; that is "nothing to do", not an error.

use crate::config::ListingConfig;
use crate::harvester::compile_selector;
use crate::harvester::source::DocumentSource;
use crate::record::{canonicalize_url, clean_title, collapse_whitespace, CandidateReference};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, Span};
use url::Url;

/// Fetches one listing page and extracts its candidates
pub struct ListingFetcher {
    source: Arc<dyn DocumentSource>,
    item: Selector,
    title: Selector,
    date: Selector,
    ready: Selector,
    title_prefix: String,
    wait_timeout: Duration,
    poll_interval: Duration,
    span: Span,
}

/// Why one listed entry was skipped
#[derive(Debug)]
enum EntrySkip {
    MissingTitle,
    MissingHref,
    BadHref(String),
    MissingDate,
}

impl ListingFetcher {
    /// Creates a listing fetcher that logs inside `span`
    pub fn new(
        config: &ListingConfig,
        source: Arc<dyn DocumentSource>,
        span: Span,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            source,
            item: compile_selector(&config.item_selector)?,
            title: compile_selector(&config.title_selector)?,
            date: compile_selector(&config.date_selector)?,
            ready: compile_selector(&config.ready_selector)?,
            title_prefix: config.title_prefix.clone(),
            wait_timeout: config.wait_timeout(),
            poll_interval: config.poll_interval(),
            span,
        })
    }

    /// Retrieves the listing at `listing_url` and extracts its candidates
    ///
    /// The page is re-requested every poll interval until the ready selector
    /// matches. If that does not happen within the wait timeout, an empty
    /// sequence is returned.
    pub async fn fetch_listing(&self, listing_url: &Url) -> Vec<CandidateReference> {
        self.fetch_listing_inner(listing_url)
            .instrument(self.span.clone())
            .await
    }

    async fn fetch_listing_inner(&self, listing_url: &Url) -> Vec<CandidateReference> {
        tracing::info!("Accessing search results page: {}", listing_url);
        let deadline = Instant::now() + self.wait_timeout;

        loop {
            match tokio::time::timeout_at(deadline, self.source.get(listing_url.as_str())).await {
                Ok(Ok(html)) => {
                    if let Some(candidates) = self.extract_if_ready(&html, listing_url) {
                        return candidates;
                    }
                    tracing::debug!("Listing content not present yet");
                }
                Ok(Err(e)) => {
                    tracing::warn!("Listing request failed: {}", e);
                }
                Err(_) => break,
            }

            if Instant::now() + self.poll_interval >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::error!(
            "Timed out after {:?} waiting for listing content",
            self.wait_timeout
        );
        Vec::new()
    }

    /// Extracts candidates once the ready selector is present
    ///
    /// Returns None while the listing content has not rendered.
    pub fn extract_if_ready(&self, html: &str, base: &Url) -> Option<Vec<CandidateReference>> {
        let document = Html::parse_document(html);
        document.select(&self.ready).next()?;
        Some(self.extract(&document, base))
    }

    fn extract(&self, document: &Html, base: &Url) -> Vec<CandidateReference> {
        let items: Vec<ElementRef<'_>> = document.select(&self.item).collect();
        tracing::info!("Found {} items in the search results.", items.len());

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let index = index + 1;
            match self.extract_entry(item, base) {
                Ok(candidate) => {
                    if !seen.insert(candidate.url.clone()) {
                        tracing::debug!(index, "Entry repeats {}, skipping", candidate.url);
                        continue;
                    }
                    tracing::info!(index, "Scraped item: Title: {}", candidate.title);
                    candidates.push(candidate);
                }
                Err(skip) => {
                    tracing::warn!(index, "Error scraping item: {:?}", skip);
                }
            }
        }

        candidates
    }

    fn extract_entry(
        &self,
        item: ElementRef<'_>,
        base: &Url,
    ) -> Result<CandidateReference, EntrySkip> {
        let anchor = item
            .select(&self.title)
            .next()
            .ok_or(EntrySkip::MissingTitle)?;
        let raw_title: String = anchor.text().collect();
        let title = clean_title(&raw_title, &self.title_prefix);

        let href = anchor.value().attr("href").ok_or(EntrySkip::MissingHref)?;
        let url =
            canonicalize_url(href, base).ok_or_else(|| EntrySkip::BadHref(href.to_string()))?;

        let date = item
            .select(&self.date)
            .next()
            .ok_or(EntrySkip::MissingDate)?;
        let listed_date = collapse_whitespace(&date.text().collect::<String>());

        Ok(CandidateReference {
            title,
            url,
            listed_date,
        })
    }
}
