//! The source abstraction and its registry.
//!
//! A [`Source`] is one supermarket: it knows how to turn a search term into
//! [`RawRecord`]s by talking to that site, and which origin its links belong
//! to. The [`SourceRegistry`] is built once from the TOML config and handed
//! to the [`Aggregator`](crate::aggregate::Aggregator).
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │             SourceRegistry               │
//! │  ┌──────────────┐   ┌─────────────────┐  │
//! │  │   Catalog    │   │   Storefront    │  │
//! │  │ atacadao/... │   │    spani/...    │  │
//! │  └──────────────┘   └─────────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     Aggregator::search() → fan-out per source
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use cesta_core::normalize::SiteOrigin;
use cesta_core::RawRecord;

use crate::config::Config;
use crate::http::HttpFetcher;

/// Upstream family a source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Catalog,
    Storefront,
    Custom,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Catalog => "catalog",
            SourceKind::Storefront => "storefront",
            SourceKind::Custom => "custom",
        }
    }
}

/// One supermarket that can be searched.
///
/// # Contract
///
/// [`extract`](Source::extract) never fails: transport errors, bad payloads
/// and empty pages are logged and turn into an empty list, so one broken
/// site cannot take the others down with it.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable name, used as the key in search results (e.g. `"tenda"`).
    fn name(&self) -> &str;

    /// One-line description for `cesta sources` and `/api/sources`.
    fn description(&self) -> &str;

    fn kind(&self) -> SourceKind {
        SourceKind::Custom
    }

    /// Canonical origin used to absolutize product links.
    fn site(&self) -> &SiteOrigin;

    /// Fetch and extract raw records for `term`.
    async fn extract(&self, term: &str) -> Vec<RawRecord>;
}

/// The configured set of sources, in registration order.
#[derive(Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Build every source declared under `[sources.*]`.
    pub fn from_config(config: &Config, fetcher: &HttpFetcher) -> Result<Self> {
        use crate::source_catalog::CatalogSource;
        use crate::source_storefront::StorefrontSource;

        let mut registry = Self::new();

        for (name, cfg) in &config.sources.catalog {
            registry.register(Arc::new(CatalogSource::new(
                name.clone(),
                cfg.clone(),
                fetcher.clone(),
            )?));
        }
        for (name, cfg) in &config.sources.storefront {
            registry.register(Arc::new(StorefrontSource::new(
                name.clone(),
                cfg.clone(),
                fetcher.clone(),
            )?));
        }

        Ok(registry)
    }

    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
