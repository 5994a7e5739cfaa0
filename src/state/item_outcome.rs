//! Per-item outcomes and the run summary built from them

use std::fmt;

/// How a single listed entry ended up in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Already in the store, either at filter time or at persist time
    Duplicate,

    /// Detail page could not be fetched or parsed; nothing was written
    DetailFailed { reason: String },

    /// Merged record was upserted
    Persisted,

    /// Store rejected the write
    PersistFailed { reason: String },
}

impl ItemOutcome {
    /// Returns true if the item counts as a failure in the summary
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DetailFailed { .. } | Self::PersistFailed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::DetailFailed { .. } => "detail_failed",
            Self::Persisted => "persisted",
            Self::PersistFailed { .. } => "persist_failed",
        }
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DetailFailed { reason } | Self::PersistFailed { reason } => {
                write!(f, "{}: {}", self.as_str(), reason)
            }
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// Outcome of one entry, keyed by its canonical URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub url: String,
    pub outcome: ItemOutcome,
}

/// Run-level breakdown returned by `run_once`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries extracted from the listing
    pub listed: usize,

    /// Entries skipped because the store already held them
    pub duplicates: usize,

    /// Detail pages fetched and parsed into records
    pub fetched: usize,

    /// Detail pages that produced no record
    pub detail_failed: usize,

    /// Records written
    pub persisted: usize,

    /// Records the store rejected
    pub persist_failed: usize,

    /// Per-entry outcomes, in listing order
    pub items: Vec<ItemReport>,
}

impl RunSummary {
    /// Creates an empty summary for a listing of `listed` entries
    pub fn new(listed: usize) -> Self {
        Self {
            listed,
            ..Self::default()
        }
    }

    /// Records the outcome of one entry and updates the counts
    pub fn record(&mut self, url: impl Into<String>, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::Duplicate => self.duplicates += 1,
            ItemOutcome::DetailFailed { .. } => self.detail_failed += 1,
            ItemOutcome::Persisted => self.persisted += 1,
            ItemOutcome::PersistFailed { .. } => self.persist_failed += 1,
        }
        self.items.push(ItemReport {
            url: url.into(),
            outcome,
        });
    }

    /// Total failed entries (detail and persistence failures)
    pub fn failed(&self) -> usize {
        self.detail_failed + self.persist_failed
    }

    /// Outcome recorded for `url`, if any
    pub fn outcome_for(&self, url: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|item| item.url == url)
            .map(|item| &item.outcome)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listed={} duplicates={} fetched={} detail_failed={} persisted={} persist_failed={}",
            self.listed,
            self.duplicates,
            self.fetched,
            self.detail_failed,
            self.persisted,
            self.persist_failed
        )
    }
}
