//! Store-backed deduplication of listed entries

use crate::record::CandidateReference;
use crate::storage::PersistenceSink;
use futures::future::join_all;
use std::sync::Arc;

/// Listed entries split by whether the store already holds them
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Not yet stored, in listing order
    pub fresh: Vec<CandidateReference>,
    /// Already stored, in listing order
    pub duplicates: Vec<CandidateReference>,
}

/// Checks candidates against the persistence sink
pub struct Deduplicator {
    sink: Arc<dyn PersistenceSink>,
}

impl Deduplicator {
    pub fn new(sink: Arc<dyn PersistenceSink>) -> Self {
        Self { sink }
    }

    /// Returns true unless the store holds a record with the candidate's URL
    ///
    /// A failed lookup is logged and the candidate treated as new; the upsert
    /// later on is what keeps the store free of duplicates.
    pub async fn is_new(&self, candidate: &CandidateReference) -> bool {
        match self.sink.exists(&candidate.url).await {
            Ok(found) => !found,
            Err(e) => {
                tracing::warn!("Lookup failed for {}, treating as new: {}", candidate.url, e);
                true
            }
        }
    }

    /// Partitions `candidates`, checking all of them concurrently
    pub async fn filter_new(&self, candidates: Vec<CandidateReference>) -> DedupOutcome {
        let checks = join_all(candidates.iter().map(|c| self.is_new(c))).await;

        let mut outcome = DedupOutcome::default();
        for (candidate, is_new) in candidates.into_iter().zip(checks) {
            if is_new {
                outcome.fresh.push(candidate);
            } else {
                tracing::info!("Skipping existing item: {}", candidate.url);
                outcome.duplicates.push(candidate);
            }
        }
        outcome
    }
}
