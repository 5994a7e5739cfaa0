//! Pipeline coordinator - one harvest run from listing to store
//!
//! A run walks `RunStage` strictly forward:
//! - Fetch the listing and extract candidates
//! - Drop candidates the store already holds
//! - Fetch every remaining detail page concurrently
//! - Merge listing and detail metadata
//! - Upsert the merged records concurrently
//!
//! Item-level failures end up in the returned `RunSummary`. Only a bad
//! configuration or listing URL aborts the run.

use crate::config::{validate, Config};
use crate::harvester::dedup::Deduplicator;
use crate::harvester::detail::{DetailFetcher, DetailParser, RetryPolicy};
use crate::harvester::listing::ListingFetcher;
use crate::harvester::source::{DocumentSource, HttpSource};
use crate::record::{merge_records, CandidateReference, DetailRecord, ParsedDetail};
use crate::state::{ItemOutcome, RunStage, RunSummary};
use crate::storage::{PersistenceSink, RunStatus};
use crate::HarvestError;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, Span};
use url::Url;

/// Runs the harvest pipeline against one persistence sink
pub struct Coordinator {
    config: Arc<Config>,
    listing_source: Arc<dyn DocumentSource>,
    detail_source: Arc<dyn DocumentSource>,
    sink: Arc<dyn PersistenceSink>,
    policy: RetryPolicy,
    config_hash: String,
}

/// Progress through `RunStage`, logging each step
struct StageTracker {
    stage: RunStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: RunStage::FetchListing,
        }
    }

    fn advance(&mut self, to: RunStage) {
        debug_assert!(
            self.stage.can_transition_to(to),
            "illegal stage transition {} -> {}",
            self.stage,
            to
        );
        tracing::debug!("Stage {} -> {}", self.stage, to);
        self.stage = to;
    }
}

impl Coordinator {
    /// Creates a coordinator with HTTP sources built from `config`
    ///
    /// The listing and the detail fetches each get their own client.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Configuration is valid and clients were built
    /// * `Err(HarvestError)` - Invalid configuration or client setup failure
    pub fn new(config: Config, sink: Arc<dyn PersistenceSink>) -> Result<Self, HarvestError> {
        let listing_source = Arc::new(HttpSource::from_config(&config.fetch)?);
        let detail_source = Arc::new(HttpSource::from_config(&config.fetch)?);
        Self::with_sources(config, listing_source, detail_source, sink)
    }

    /// Creates a coordinator over caller-provided document sources
    pub fn with_sources(
        config: Config,
        listing_source: Arc<dyn DocumentSource>,
        detail_source: Arc<dyn DocumentSource>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;
        let policy = RetryPolicy::from_config(&config.fetch);

        Ok(Self {
            config: Arc::new(config),
            listing_source,
            detail_source,
            sink,
            policy,
            config_hash: String::new(),
        })
    }

    /// Sets the configuration hash recorded in run history
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Overrides the retry policy derived from the fetch configuration
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Performs one complete harvest of `listing_url`
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run reached `Done`; per-item failures are in the summary
    /// * `Err(HarvestError)` - The listing URL or a selector is invalid; nothing was fetched
    pub async fn run_once(&self, listing_url: &str) -> Result<RunSummary, HarvestError> {
        let listing_url = Url::parse(listing_url)?;

        let span = tracing::info_span!("harvest_run", run_id = tracing::field::Empty);
        let listing = ListingFetcher::new(
            &self.config.listing,
            self.listing_source.clone(),
            span.clone(),
        )?;
        let details = Arc::new(DetailFetcher::new(
            self.detail_source.clone(),
            DetailParser::new(&self.config.detail)?,
            self.policy,
            span.clone(),
        ));

        let run_id = match self.sink.begin_run(&self.config_hash).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Could not record run start: {}", e);
                None
            }
        };
        if let Some(id) = run_id {
            span.record("run_id", id);
        }

        let summary = self
            .run_stages(&listing_url, &listing, details)
            .instrument(span.clone())
            .await;

        if let Some(id) = run_id {
            if let Err(e) = self
                .sink
                .finish_run(id, RunStatus::Completed, &summary)
                .await
            {
                let _enter = span.enter();
                tracing::warn!("Could not record run {} completion: {}", id, e);
            }
        }

        Ok(summary)
    }

    async fn run_stages(
        &self,
        listing_url: &Url,
        listing: &ListingFetcher,
        details: Arc<DetailFetcher>,
    ) -> RunSummary {
        let mut stage = StageTracker::new();
        tracing::info!("Starting harvest of {}", listing_url);

        let candidates = listing.fetch_listing(listing_url).await;
        let mut summary = RunSummary::new(candidates.len());
        if candidates.is_empty() {
            tracing::info!("No items found in the listing");
            stage.advance(RunStage::Done);
            return summary;
        }

        stage.advance(RunStage::FilterDedup);
        let order: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
        let dedup = Deduplicator::new(self.sink.clone()).filter_new(candidates).await;

        let mut outcomes: HashMap<String, ItemOutcome> = dedup
            .duplicates
            .iter()
            .map(|c| (c.url.clone(), ItemOutcome::Duplicate))
            .collect();

        if dedup.fresh.is_empty() {
            tracing::info!("Every listed item is already stored");
            stage.advance(RunStage::Done);
            return finish(summary, &order, outcomes);
        }

        stage.advance(RunStage::FetchDetails);
        tracing::info!(
            "Fetching {} detail pages (at most {:?} each)",
            dedup.fresh.len(),
            self.policy.worst_case()
        );
        let fetched = fetch_details(details, dedup.fresh).await;

        stage.advance(RunStage::Merge);
        let mut merged = Vec::new();
        for (candidate, result) in fetched {
            match result {
                Ok(detail) => merged.push(merge_records(&candidate, detail)),
                Err(reason) => {
                    outcomes.insert(candidate.url, ItemOutcome::DetailFailed { reason });
                }
            }
        }
        summary.fetched = merged.len();

        stage.advance(RunStage::Persist);
        for (url, outcome) in persist_all(self.sink.clone(), merged).await {
            outcomes.insert(url, outcome);
        }

        stage.advance(RunStage::Done);
        summary = finish(summary, &order, outcomes);
        tracing::info!("Harvest complete: {}", summary);
        summary
    }
}

/// Fetches every candidate's detail page on its own task
///
/// Waits for the whole cohort. Results come back in candidate order.
async fn fetch_details(
    details: Arc<DetailFetcher>,
    candidates: Vec<CandidateReference>,
) -> Vec<(CandidateReference, Result<ParsedDetail, String>)> {
    let handles: Vec<_> = candidates
        .iter()
        .map(|candidate| {
            let details = details.clone();
            let url = candidate.url.clone();
            tokio::spawn(
                async move { details.fetch_detail(&url).await }.instrument(Span::current()),
            )
        })
        .collect();

    let results = join_all(handles).await;

    candidates
        .into_iter()
        .zip(results)
        .map(|(candidate, joined)| {
            let result = match joined {
                Ok(Ok(detail)) => Ok(detail),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => {
                    tracing::error!("Detail task for {} did not finish: {}", candidate.url, e);
                    Err(format!("detail task failed: {}", e))
                }
            };
            (candidate, result)
        })
        .collect()
}

/// Upserts every merged record on its own task
async fn persist_all(
    sink: Arc<dyn PersistenceSink>,
    records: Vec<DetailRecord>,
) -> Vec<(String, ItemOutcome)> {
    let handles: Vec<_> = records
        .into_iter()
        .map(|record| {
            let sink = sink.clone();
            let url = record.url.clone();
            let handle = tokio::spawn(
                async move { persist_one(sink.as_ref(), &record).await }
                    .instrument(Span::current()),
            );
            (url, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (url, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => ItemOutcome::PersistFailed {
                reason: format!("persist task failed: {}", e),
            },
        };
        outcomes.push((url, outcome));
    }
    outcomes
}

/// Checks the store once more, then upserts
///
/// Another run may have stored the same URL since the dedup stage.
async fn persist_one(sink: &dyn PersistenceSink, record: &DetailRecord) -> ItemOutcome {
    match sink.exists(&record.url).await {
        Ok(true) => {
            tracing::info!("Item appeared since dedup, skipping: {}", record.url);
            return ItemOutcome::Duplicate;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Error checking {} before saving: {}", record.url, e);
            return ItemOutcome::PersistFailed {
                reason: e.to_string(),
            };
        }
    }

    match sink.upsert(record).await {
        Ok(()) => {
            tracing::info!("Saved item: {}", record.url);
            ItemOutcome::Persisted
        }
        Err(e) => {
            tracing::error!("Error saving {}: {}", record.url, e);
            ItemOutcome::PersistFailed {
                reason: e.to_string(),
            }
        }
    }
}

/// Records outcomes into the summary in listing order
fn finish(
    mut summary: RunSummary,
    order: &[String],
    mut outcomes: HashMap<String, ItemOutcome>,
) -> RunSummary {
    for url in order {
        if let Some(outcome) = outcomes.remove(url) {
            summary.record(url.clone(), outcome);
        }
    }
    summary
}

/// Builds a coordinator from `config` and harvests its listing URL once
pub async fn run_once(
    config: Config,
    sink: Arc<dyn PersistenceSink>,
) -> Result<RunSummary, HarvestError> {
    let listing_url = config.listing.url.clone();
    Coordinator::new(config, sink)?.run_once(&listing_url).await
}
