//! Search aggregation across all sources with a once-per-day cache.
//!
//! # Flow
//!
//! 1. Resolve the term against the essential-item catalog.
//! 2. Look for a snapshot with the same cache key created today (local
//!    time). A hit is returned as-is, without touching any site.
//! 3. On a miss, every source runs in its own task under a deadline. Each
//!    source's records go through normalize → dedupe → relevance on their
//!    own; a source that errors, hangs or panics contributes an empty list.
//! 4. The link-free projection of the results is saved once; the fresh
//!    results (with links) are returned.
//!
//! A lookup failure is treated as a miss. A save failure still returns the
//! fresh results, with `saved = false` and a warning.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use cesta_core::cache::{CacheKey, DayWindow};
use cesta_core::essentials::EssentialCatalog;
use cesta_core::models::{to_stored, ProductsBySource, SearchRecord, StoredBySource};
use cesta_core::pipeline::process_source;
use cesta_core::store::{InsertOutcome, SearchStore};

use crate::config::Config;
use crate::http::HttpFetcher;
use crate::sqlite_store::SqliteStore;
use crate::traits::SourceRegistry;
use crate::{db, migrate};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("search term must not be empty")]
    EmptyTerm,

    #[error("no sources are configured")]
    NoSources,
}

/// Per-source product lists: fresh ones carry links, cached ones do not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    Fresh(ProductsBySource),
    Cached(StoredBySource),
}

impl SearchResults {
    pub fn total(&self) -> usize {
        match self {
            SearchResults::Fresh(results) => results.values().map(Vec::len).sum(),
            SearchResults::Cached(results) => results.values().map(Vec::len).sum(),
        }
    }

    /// Persisted projection of these results.
    pub fn to_stored(&self) -> StoredBySource {
        match self {
            SearchResults::Fresh(results) => to_stored(results),
            SearchResults::Cached(results) => results.clone(),
        }
    }
}

/// Response of one aggregated search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub item: Option<String>,
    pub results: SearchResults,
    pub cached: bool,
    pub id: Option<String>,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct Aggregator {
    registry: SourceRegistry,
    catalog: EssentialCatalog,
    store: Arc<dyn SearchStore>,
    source_deadline: Duration,
}

impl Aggregator {
    pub fn new(
        registry: SourceRegistry,
        catalog: EssentialCatalog,
        store: Arc<dyn SearchStore>,
        source_deadline: Duration,
    ) -> Self {
        Self {
            registry,
            catalog,
            store,
            source_deadline,
        }
    }

    /// Wire the configured sources, essential items and SQLite store.
    ///
    /// The schema is applied on the way, so a fresh database works without
    /// a separate `cesta init`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        let registry = SourceRegistry::from_config(config, &fetcher)?;

        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        let store: Arc<dyn SearchStore> = Arc::new(SqliteStore::new(pool));

        Ok(Self::new(
            registry,
            config.catalog.to_catalog(),
            store,
            config.http.source_deadline(),
        ))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub async fn search(&self, term: &str) -> Result<SearchOutcome, AggregateError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AggregateError::EmptyTerm);
        }
        if self.registry.is_empty() {
            return Err(AggregateError::NoSources);
        }

        let item = self.catalog.resolve(term).map(str::to_string);
        let key = CacheKey::for_search(item.as_deref(), term);

        match self.store.find_in_window(&key, &DayWindow::today()).await {
            Ok(Some(record)) => {
                info!(cache_key = %key, id = %record.id, "serving cached search");
                return Ok(SearchOutcome {
                    query: term.to_string(),
                    item,
                    results: SearchResults::Cached(record.results),
                    cached: true,
                    id: Some(record.id),
                    saved: true,
                    warning: None,
                });
            }
            Ok(None) => {}
            Err(err) => warn!(cache_key = %key, error = %err, "cache lookup failed, fetching fresh results"),
        }

        let results = self.fan_out(term).await;

        let created_at = Utc::now();
        let record = SearchRecord {
            id: Uuid::new_v4().to_string(),
            query: term.to_string(),
            item: item.clone(),
            cache_key: key.as_str().to_string(),
            day: DayWindow::containing(&Local, created_at).day_key(),
            results: to_stored(&results),
            created_at,
        };

        let (id, saved, warning) = match self.store.insert(&record).await {
            Ok(InsertOutcome::Inserted) => (Some(record.id), true, None),
            Ok(InsertOutcome::AlreadyPresent { existing_id }) => {
                info!(cache_key = %key, id = %existing_id, "snapshot for today already saved by a concurrent search");
                (Some(existing_id), true, None)
            }
            Err(err) => {
                warn!(cache_key = %key, error = %err, "failed to save search results");
                (
                    None,
                    false,
                    Some("Results were not saved to the database".to_string()),
                )
            }
        };

        Ok(SearchOutcome {
            query: term.to_string(),
            item,
            results: SearchResults::Fresh(results),
            cached: false,
            id,
            saved,
            warning,
        })
    }

    /// Run every source concurrently and collect its processed products.
    async fn fan_out(&self, term: &str) -> ProductsBySource {
        let (names, tasks): (Vec<_>, Vec<_>) = self
            .registry
            .sources()
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let term = term.to_string();
                let deadline = self.source_deadline;
                let name = source.name().to_string();

                let task = tokio::spawn(async move {
                    match tokio::time::timeout(deadline, source.extract(&term)).await {
                        Ok(records) => process_source(records, source.site(), &term),
                        Err(_) => {
                            warn!(
                                source = %source.name(),
                                deadline_ms = deadline.as_millis() as u64,
                                "source timed out"
                            );
                            Vec::new()
                        }
                    }
                });
                (name, task)
            })
            .unzip();

        let outcomes = join_all(tasks).await;

        names
            .into_iter()
            .zip(outcomes)
            .map(|(name, outcome)| {
                let products = outcome.unwrap_or_else(|err| {
                    error!(source = %name, error = %err, "source task failed");
                    Vec::new()
                });
                (name, products)
            })
            .collect()
    }
}
