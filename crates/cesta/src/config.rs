//! Configuration parsing and validation.
//!
//! Cesta is configured via a TOML file (default: `config/cesta.toml`).
//! The configuration defines the database path, server bind address,
//! outbound HTTP defaults, logging, the essential-item list and the
//! supermarket sources to query.
//!
//! # Example Configuration
//!
//! ```toml
//! [db]
//! path = "./data/cesta.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [http]
//! timeout_secs = 10
//!
//! [logging]
//! level = "info"
//! format = "text"
//!
//! [sources.catalog.tenda]
//! base_url = "https://www.tendaatacado.com.br"
//! api_path = "/api/catalog_system/pub/products/search?ft={term}"
//! search_path = "/busca?q={term}"
//! term_encoding = "plus"
//!
//! [sources.storefront.spani]
//! api_url = "https://services.example.com/loja/buscas/produtos/termo/{term}?page={page}"
//! site_url = "https://www.spanionline.com.br"
//! ```
//!
//! # Validation
//!
//! [`load_config`] rejects:
//! - `http.timeout_secs` outside `1..=60`
//! - `http.source_deadline_secs` shorter than `http.timeout_secs`
//! - a configuration without any source
//! - the same source name under two source kinds
//! - URL templates without `{term}` (and storefront `api_url` without `{page}`)
//! - unparseable base or site URLs
//! - empty essential items

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cesta_core::essentials::{EssentialCatalog, DEFAULT_ESSENTIAL_ITEMS};

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Defaults for outbound requests to supermarket sites.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout, overridable per source.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on one source's whole extraction (all requests and fallbacks).
    #[serde(default = "default_source_deadline_secs")]
    pub source_deadline_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            source_deadline_secs: default_source_deadline_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn source_deadline(&self) -> Duration {
        Duration::from_secs(self.source_deadline_secs)
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_source_deadline_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_accept_language() -> String {
    "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_essential_items")]
    pub essential_items: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            essential_items: default_essential_items(),
        }
    }
}

impl CatalogConfig {
    pub fn to_catalog(&self) -> EssentialCatalog {
        EssentialCatalog::new(self.essential_items.iter().map(|item| item.trim().to_string()))
    }
}

fn default_essential_items() -> Vec<String> {
    DEFAULT_ESSENTIAL_ITEMS.iter().map(|item| item.to_string()).collect()
}

/// Sources grouped by upstream kind, each keyed by source name.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogSourceConfig>,
    #[serde(default)]
    pub storefront: BTreeMap<String, StorefrontSourceConfig>,
}

impl SourcesConfig {
    pub fn len(&self) -> usize {
        self.catalog.len() + self.storefront.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a search term is placed into a URL template.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TermEncoding {
    /// Percent-encode everything, spaces as `%20`.
    #[default]
    Percent,
    /// Form encoding, spaces as `+`.
    Plus,
}

/// A VTEX-style catalog source with an optional HTML search-page fallback.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogSourceConfig {
    pub base_url: String,
    /// Path (or absolute URL) of the JSON search API, with `{term}`.
    pub api_path: String,
    /// Path of the HTML search page, with `{term}`. No HTML fallback when absent.
    #[serde(default)]
    pub search_path: Option<String>,
    #[serde(default)]
    pub term_encoding: TermEncoding,
    /// Origins whose links are rewritten onto `base_url`.
    #[serde(default)]
    pub secure_aliases: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A VipCommerce-style storefront source.
#[derive(Debug, Deserialize, Clone)]
pub struct StorefrontSourceConfig {
    /// Absolute search API URL with `{term}` and `{page}`.
    pub api_url: String,
    /// Public storefront origin, sent as `origin`/`referer` and used for links.
    pub site_url: String,
    #[serde(default)]
    pub domain_key: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Environment variable holding the bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Environment variable holding the `sessao-id` header value.
    #[serde(default)]
    pub session_env: Option<String>,
    #[serde(default = "default_lowercase_term")]
    pub lowercase_term: bool,
    /// Fetch page 2 when page 1 holds fewer products than this.
    #[serde(default = "default_min_results_for_single_page")]
    pub min_results_for_single_page: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_lowercase_term() -> bool {
    true
}
fn default_min_results_for_single_page() -> usize {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate http
    if !(1..=60).contains(&config.http.timeout_secs) {
        bail!("http.timeout_secs must be in [1, 60]");
    }
    if config.http.source_deadline_secs < config.http.timeout_secs {
        bail!("http.source_deadline_secs must be >= http.timeout_secs");
    }

    // Validate catalog
    if config
        .catalog
        .essential_items
        .iter()
        .any(|item| item.trim().is_empty())
    {
        bail!("catalog.essential_items must not contain empty entries");
    }

    // Validate sources
    if config.sources.is_empty() {
        bail!("At least one source must be configured under [sources.catalog] or [sources.storefront]");
    }

    if let Some(name) = config
        .sources
        .catalog
        .keys()
        .find(|name| config.sources.storefront.contains_key(*name))
    {
        bail!("Source name '{}' is used by more than one source", name);
    }

    for (name, source) in &config.sources.catalog {
        check_url(&source.base_url, &format!("sources.catalog.{name}.base_url"))?;
        check_template(&source.api_path, &format!("sources.catalog.{name}.api_path"))?;
        if let Some(search_path) = &source.search_path {
            check_template(search_path, &format!("sources.catalog.{name}.search_path"))?;
        }
        for alias in &source.secure_aliases {
            check_url(alias, &format!("sources.catalog.{name}.secure_aliases"))?;
        }
        check_source_timeout(source.timeout_secs, &format!("sources.catalog.{name}"))?;
    }

    for (name, source) in &config.sources.storefront {
        check_template(&source.api_url, &format!("sources.storefront.{name}.api_url"))?;
        if !source.api_url.contains("{page}") {
            bail!("sources.storefront.{}.api_url must contain {{page}}", name);
        }
        check_url(&source.site_url, &format!("sources.storefront.{name}.site_url"))?;
        check_source_timeout(source.timeout_secs, &format!("sources.storefront.{name}"))?;
    }

    Ok(())
}

fn check_template(template: &str, field: &str) -> Result<()> {
    if !template.contains("{term}") {
        bail!("{} must contain {{term}}", field);
    }
    Ok(())
}

fn check_url(raw: &str, field: &str) -> Result<()> {
    url::Url::parse(raw).with_context(|| format!("{} is not a valid URL: '{}'", field, raw))?;
    Ok(())
}

fn check_source_timeout(timeout_secs: Option<u64>, field: &str) -> Result<()> {
    if let Some(secs) = timeout_secs {
        if !(1..=60).contains(&secs) {
            bail!("{}.timeout_secs must be in [1, 60]", field);
        }
    }
    Ok(())
}
