//! Storage module for persisting harvested records
//!
//! This module holds the persistence contract and its backends:
//! - `PersistenceSink`: the `exists` / `upsert` contract the pipeline needs
//! - `SqliteSink`: relational backend with a row id per record and run history
//! - `MemorySink`: key-value backend keyed by canonical URL

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemorySink;
pub use sqlite::{init_database, SqliteSink};
pub use traits::{PersistenceSink, StorageError, StorageResult};

use crate::record::DetailRecord;
use crate::HarvestError;

use std::path::Path;

/// Opens (creating if needed) the SQLite store at `path`
pub fn open_storage(path: &Path) -> Result<SqliteSink, HarvestError> {
    SqliteSink::new(path)
}

/// A persisted record with its store-assigned identity
///
/// `proceed` and `is_related` are downstream flags: written with their
/// defaults on insert, kept as-is on overwrite, never computed here.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub record: DetailRecord,
    pub proceed: bool,
    pub is_related: Option<bool>,
}

/// Represents a harvest run in the run history
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub listed: u64,
    pub duplicates: u64,
    pub detail_failed: u64,
    pub persisted: u64,
    pub persist_failed: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
