//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `PersistenceSink`
//! trait. The connection is shared behind a mutex and every call runs on the
//! blocking thread pool so item tasks never stall the runtime.

use crate::record::DetailRecord;
use crate::state::RunSummary;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PersistenceSink, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredRecord};
use crate::HarvestError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str = "id, url, title, listed_date, author, view_count, created_at,
     description, tags, scraped_at, proceed, is_related";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, listed,
     duplicates, detail_failed, persisted, persist_failed";

/// SQLite storage backend
#[derive(Clone)]
pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
}

/// A `kin_data` row before its JSON and timestamp columns are decoded
struct RawRecordRow {
    id: i64,
    url: String,
    title: String,
    listed_date: String,
    author: String,
    view_count: i64,
    created_at: String,
    description: String,
    tags: String,
    scraped_at: String,
    proceed: bool,
    is_related: Option<bool>,
}

impl RawRecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            listed_date: row.get(3)?,
            author: row.get(4)?,
            view_count: row.get(5)?,
            created_at: row.get(6)?,
            description: row.get(7)?,
            tags: row.get(8)?,
            scraped_at: row.get(9)?,
            proceed: row.get(10)?,
            is_related: row.get(11)?,
        })
    }

    fn decode(self) -> StorageResult<StoredRecord> {
        let view_count = u64::try_from(self.view_count).map_err(|_| {
            StorageError::InvalidRow(format!(
                "negative view_count {} for {}",
                self.view_count, self.url
            ))
        })?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)?;
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)?.with_timezone(&Utc);

        Ok(StoredRecord {
            id: self.id,
            record: DetailRecord {
                title: self.title,
                url: self.url,
                listed_date: self.listed_date,
                author: self.author,
                view_count,
                created_at: self.created_at,
                description: self.description,
                tags,
                scraped_at,
            },
            proceed: self.proceed,
            is_related: self.is_related,
        })
    }
}

impl SqliteSink {
    /// Creates a new SqliteSink instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = init_database(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with the locked connection on the current thread
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
        f(&conn)
    }

    /// Runs `f` with the locked connection on the blocking thread pool
    async fn with_conn_blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let sink = self.clone();
        tokio::task::spawn_blocking(move || sink.with_conn(f))
            .await
            .map_err(|e| StorageError::Unavailable(format!("storage task failed: {}", e)))?
    }

    /// Returns true if a record with this URL is stored
    pub fn contains(&self, url: &str) -> StorageResult<bool> {
        self.with_conn(|conn| url_exists(conn, url))
    }

    /// Inserts or overwrites the record keyed by its URL
    pub fn save(&self, record: &DetailRecord) -> StorageResult<()> {
        self.with_conn(|conn| upsert_record(conn, record))
    }

    /// Gets a stored record by URL
    pub fn get(&self, url: &str) -> StorageResult<Option<StoredRecord>> {
        self.with_conn(|conn| {
            let raw = conn
                .query_row(
                    &format!("SELECT {} FROM kin_data WHERE url = ?1", RECORD_COLUMNS),
                    params![url],
                    RawRecordRow::from_row,
                )
                .optional()?;
            raw.map(RawRecordRow::decode).transpose()
        })
    }

    /// Gets all stored records, oldest first
    pub fn all_records(&self) -> StorageResult<Vec<StoredRecord>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM kin_data ORDER BY id", RECORD_COLUMNS))?;
            let rows = stmt
                .query_map([], RawRecordRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(RawRecordRow::decode).collect()
        })
    }

    /// Gets total record count
    pub fn count_records(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM kin_data", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    // ===== Run Management =====

    /// Creates a new run in the running state
    pub fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        self.with_conn(|conn| create_run(conn, config_hash))
    }

    /// Marks a run as finished and stores its summary counts
    pub fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        self.with_conn(|conn| complete_run(conn, run_id, status, summary))
    }

    /// Gets the most recent runs, newest first
    pub fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
                RUN_COLUMNS
            ))?;
            let runs = stmt
                .query_map(params![limit as i64], |row| {
                    let status: String = row.get(4)?;
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&status).ok_or_else(|| {
                            rusqlite::Error::FromSqlConversionFailure(
                                4,
                                rusqlite::types::Type::Text,
                                format!("unknown run status '{}'", status).into(),
                            )
                        })?,
                        listed: row.get::<_, i64>(5)? as u64,
                        duplicates: row.get::<_, i64>(6)? as u64,
                        detail_failed: row.get::<_, i64>(7)? as u64,
                        persisted: row.get::<_, i64>(8)? as u64,
                        persist_failed: row.get::<_, i64>(9)? as u64,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(runs)
        })
    }
}

#[async_trait]
impl PersistenceSink for SqliteSink {
    async fn exists(&self, url: &str) -> StorageResult<bool> {
        let url = url.to_string();
        self.with_conn_blocking(move |conn| url_exists(conn, &url))
            .await
    }

    async fn upsert(&self, record: &DetailRecord) -> StorageResult<()> {
        let record = record.clone();
        self.with_conn_blocking(move |conn| upsert_record(conn, &record))
            .await
    }

    async fn begin_run(&self, config_hash: &str) -> StorageResult<Option<i64>> {
        let config_hash = config_hash.to_string();
        self.with_conn_blocking(move |conn| create_run(conn, &config_hash).map(Some))
            .await
    }

    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        let summary = summary.clone();
        self.with_conn_blocking(move |conn| complete_run(conn, run_id, status, &summary))
            .await
    }
}

fn url_exists(conn: &Connection, url: &str) -> StorageResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM kin_data WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert-or-overwrite keyed by `url`
///
/// An overwrite keeps the row id and the downstream flags.
fn upsert_record(conn: &Connection, record: &DetailRecord) -> StorageResult<()> {
    let tags = serde_json::to_string(&record.tags)?;
    let view_count = i64::try_from(record.view_count).map_err(|_| {
        StorageError::Rejected(format!(
            "view_count {} out of range for {}",
            record.view_count, record.url
        ))
    })?;

    conn.execute(
        "INSERT INTO kin_data (url, title, listed_date, author, view_count, created_at,
             description, tags, scraped_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(url) DO UPDATE SET
             title = excluded.title,
             listed_date = excluded.listed_date,
             author = excluded.author,
             view_count = excluded.view_count,
             created_at = excluded.created_at,
             description = excluded.description,
             tags = excluded.tags,
             scraped_at = excluded.scraped_at",
        params![
            record.url,
            record.title,
            record.listed_date,
            record.author,
            view_count,
            record.created_at,
            record.description,
            tags,
            record.scraped_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn create_run(conn: &Connection, config_hash: &str) -> StorageResult<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
        params![now, config_hash, RunStatus::Running.to_db_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

fn complete_run(
    conn: &Connection,
    run_id: i64,
    status: RunStatus,
    summary: &RunSummary,
) -> StorageResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE runs SET status = ?1, finished_at = ?2, listed = ?3, duplicates = ?4,
             detail_failed = ?5, persisted = ?6, persist_failed = ?7
         WHERE id = ?8",
        params![
            status.to_db_string(),
            now,
            summary.listed as i64,
            summary.duplicates as i64,
            summary.detail_failed as i64,
            summary.persisted as i64,
            summary.persist_failed as i64,
            run_id
        ],
    )?;
    Ok(())
}

/// Initializes or opens a database at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
