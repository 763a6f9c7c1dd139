//! VTEX catalog sources (Atacadão, Tenda, ...).
//!
//! Extraction chain:
//!
//! 1. `GET {base_url}{api_path}` and parse the catalog JSON array.
//! 2. When that fails or is empty and `search_path` is configured, fetch
//!    the HTML search page once and run the HTML strategies on it
//!    (JSON-LD, then the heuristic card scan).

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use cesta_core::extract::catalog_api::parse_catalog_search;
use cesta_core::extract::{run_html_strategies, HTML_STRATEGIES};
use cesta_core::normalize::SiteOrigin;
use cesta_core::RawRecord;

use crate::config::CatalogSourceConfig;
use crate::http::{encode_term, HttpFetcher};
use crate::traits::{Source, SourceKind};

pub struct CatalogSource {
    name: String,
    description: String,
    config: CatalogSourceConfig,
    site: SiteOrigin,
    fetcher: HttpFetcher,
    timeout: Duration,
}

impl CatalogSource {
    pub fn new(name: String, config: CatalogSourceConfig, fetcher: HttpFetcher) -> Result<Self> {
        let mut site = SiteOrigin::new(&config.base_url)
            .with_context(|| format!("Invalid base_url for source '{}'", name))?;
        for alias in &config.secure_aliases {
            site = site
                .with_alias(alias)
                .with_context(|| format!("Invalid secure alias for source '{}'", name))?;
        }

        let timeout = config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| fetcher.default_timeout());
        let description = config
            .description
            .clone()
            .unwrap_or_else(|| format!("VTEX catalog search at {}", site.origin()));

        Ok(Self {
            name,
            description,
            config,
            site,
            fetcher,
            timeout,
        })
    }

    pub fn api_url(&self, term: &str) -> String {
        self.expand(&self.config.api_path, term)
    }

    pub fn search_url(&self, term: &str) -> Option<String> {
        self.config
            .search_path
            .as_deref()
            .map(|path| self.expand(path, term))
    }

    fn expand(&self, template: &str, term: &str) -> String {
        let path = template.replace("{term}", &encode_term(term, self.config.term_encoding));
        if path.starts_with("http://") || path.starts_with("https://") {
            return path;
        }
        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn from_api(&self, term: &str) -> Vec<RawRecord> {
        let url = self.api_url(term);
        let body = match self.fetcher.get_json_text(&url, &[], self.timeout).await {
            Ok(body) => body,
            Err(err) => {
                warn!(source = %self.name, error = %err, "catalog API request failed");
                return Vec::new();
            }
        };

        match parse_catalog_search(&body) {
            Ok(records) => records,
            Err(err) => {
                warn!(source = %self.name, error = %err, "catalog API payload rejected");
                Vec::new()
            }
        }
    }

    async fn from_search_page(&self, url: &str) -> Vec<RawRecord> {
        let html = match self.fetcher.get_html(url, self.timeout).await {
            Ok(html) => html,
            Err(err) => {
                warn!(source = %self.name, error = %err, "search page request failed");
                return Vec::new();
            }
        };

        match run_html_strategies(&html, &HTML_STRATEGIES) {
            Some((strategy, mut records)) => {
                for record in &mut records {
                    record.default_link(url);
                }
                debug!(source = %self.name, strategy, count = records.len(), "search page parsed");
                records
            }
            None => {
                warn!(source = %self.name, "no products found on search page");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Source for CatalogSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Catalog
    }

    fn site(&self) -> &SiteOrigin {
        &self.site
    }

    async fn extract(&self, term: &str) -> Vec<RawRecord> {
        let started = Instant::now();

        let records = self.from_api(term).await;
        if !records.is_empty() {
            info!(
                source = %self.name,
                strategy = "catalog_api",
                count = records.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "source extracted"
            );
            return records;
        }

        let Some(url) = self.search_url(term) else {
            debug!(source = %self.name, "catalog API empty and no search page configured");
            return Vec::new();
        };

        let records = self.from_search_page(&url).await;
        info!(
            source = %self.name,
            strategy = "search_page",
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "source extracted"
        );
        records
    }
}
