//! In-process key-value storage
//!
//! Items are keyed by canonical URL alone. A lookup with anything other than
//! the exact stored URL reports "not found".

use crate::record::DetailRecord;
use crate::storage::traits::{PersistenceSink, StorageError, StorageResult};
use crate::storage::StoredRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Table {
    items: HashMap<String, StoredRecord>,
    next_id: i64,
}

/// Key-value backend holding records in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    table: Arc<Mutex<Table>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut Table) -> T) -> StorageResult<T> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| StorageError::Unavailable("table lock poisoned".to_string()))?;
        Ok(f(&mut table))
    }

    /// Gets a stored item by URL
    pub fn get(&self, url: &str) -> StorageResult<Option<StoredRecord>> {
        self.with_table(|table| table.items.get(url).cloned())
    }

    /// All stored URLs, sorted
    pub fn urls(&self) -> StorageResult<Vec<String>> {
        self.with_table(|table| {
            let mut urls: Vec<String> = table.items.keys().cloned().collect();
            urls.sort();
            urls
        })
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn exists(&self, url: &str) -> StorageResult<bool> {
        self.with_table(|table| table.items.contains_key(url))
    }

    async fn upsert(&self, record: &DetailRecord) -> StorageResult<()> {
        self.with_table(|table| {
            if let Some(stored) = table.items.get_mut(&record.url) {
                stored.record = record.clone();
                return;
            }
            table.next_id += 1;
            let id = table.next_id;
            table.items.insert(
                record.url.clone(),
                StoredRecord {
                    id,
                    record: record.clone(),
                    proceed: false,
                    is_related: None,
                },
            );
        })
    }
}
