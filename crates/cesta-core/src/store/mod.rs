//! # Search Store Abstraction
//!
//! The [`SearchStore`] trait defines how daily search snapshots are found
//! and written. Two implementations exist:
//!
//! | Backend | Crate | Use case |
//! |---------|-------|----------|
//! | [`InMemoryStore`](memory::InMemoryStore) | `cesta-core` | tests, ephemeral servers |
//! | `SqliteStore` | `cesta` | CLI and server, persistent |
//!
//! A store holds at most one record per `(cache_key, day)`. When two
//! writers race, the second insert reports the id of the record that won
//! instead of failing.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::cache::{CacheKey, DayWindow};
use crate::models::SearchRecord;

pub use memory::InMemoryStore;

/// Result of attempting to persist a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record for the same cache key and day already existed.
    AlreadyPresent { existing_id: String },
}

#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Most recent record for `key` created inside `window`, if any.
    async fn find_in_window(&self, key: &CacheKey, window: &DayWindow) -> Result<Option<SearchRecord>>;

    /// Persist `record` unless one already exists for its cache key and day.
    async fn insert(&self, record: &SearchRecord) -> Result<InsertOutcome>;
}
