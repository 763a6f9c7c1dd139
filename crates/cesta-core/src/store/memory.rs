//! In-memory [`SearchStore`] backed by a `RwLock<Vec<_>>`.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{InsertOutcome, SearchStore};
use crate::cache::{CacheKey, DayWindow};
use crate::models::SearchRecord;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<SearchRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SearchStore for InMemoryStore {
    async fn find_in_window(&self, key: &CacheKey, window: &DayWindow) -> Result<Option<SearchRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("search store lock poisoned"))?;

        Ok(records
            .iter()
            .filter(|record| record.cache_key == key.as_str() && window.contains(record.created_at))
            .max_by_key(|record| record.created_at)
            .cloned())
    }

    async fn insert(&self, record: &SearchRecord) -> Result<InsertOutcome> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("search store lock poisoned"))?;

        if let Some(existing) = records
            .iter()
            .find(|existing| existing.cache_key == record.cache_key && existing.day == record.day)
        {
            return Ok(InsertOutcome::AlreadyPresent {
                existing_id: existing.id.clone(),
            });
        }

        records.push(record.clone());
        Ok(InsertOutcome::Inserted)
    }
}
