//! Storage traits and error types
//!
//! This module defines the trait interface for persistence backends and
//! associated error types.

use crate::record::DetailRecord;
use crate::state::RunSummary;
use crate::storage::RunStatus;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable store for harvested records
///
/// Implementations must be safe to call from many item tasks at once. The core
/// does no locking of its own: two concurrent upserts for the same `url` must
/// resolve to a single stored record (last write wins), never a duplicate.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Returns true if a record with this canonical URL is stored
    ///
    /// "Not found" is `Ok(false)`; only genuine I/O failures are errors.
    async fn exists(&self, url: &str) -> StorageResult<bool>;

    /// Inserts the record, or overwrites the stored one with the same `url`
    async fn upsert(&self, record: &DetailRecord) -> StorageResult<()>;

    // ===== Run History =====

    /// Opens a run in the backend's run history
    ///
    /// Backends without run history return `Ok(None)`.
    async fn begin_run(&self, _config_hash: &str) -> StorageResult<Option<i64>> {
        Ok(None)
    }

    /// Closes a run opened by `begin_run`
    async fn finish_run(
        &self,
        _run_id: i64,
        _status: RunStatus,
        _summary: &RunSummary,
    ) -> StorageResult<()> {
        Ok(())
    }
}
