//! End-to-end aggregation tests against a local fake of the supermarket sites.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use async_trait::async_trait;
use tempfile::TempDir;

use cesta::aggregate::{AggregateError, Aggregator, SearchResults};
use cesta::config::{CatalogSourceConfig, HttpConfig, TermEncoding};
use cesta::http::HttpFetcher;
use cesta::source_catalog::CatalogSource;
use cesta::traits::SourceRegistry;
use cesta_core::cache::{CacheKey, DayWindow};
use cesta_core::essentials::EssentialCatalog;
use cesta_core::store::{InMemoryStore, InsertOutcome, SearchStore};
use cesta_core::{ProductsBySource, SearchRecord};

use common::{HangingSource, PanickingSource, StaticSource};

fn names(results: &ProductsBySource, source: &str) -> Vec<String> {
    results[source].iter().map(|p| p.name.clone()).collect()
}

fn prices(results: &ProductsBySource, source: &str) -> Vec<f64> {
    results[source].iter().map(|p| p.price).collect()
}

fn fresh(results: &SearchResults) -> &ProductsBySource {
    match results {
        SearchResults::Fresh(results) => results,
        SearchResults::Cached(_) => panic!("expected fresh results"),
    }
}

fn in_memory(registry: SourceRegistry, deadline: Duration) -> Aggregator {
    Aggregator::new(
        registry,
        EssentialCatalog::default(),
        Arc::new(InMemoryStore::new()),
        deadline,
    )
}

fn catalog_source(name: &str, base_url: &str, api_path: &str, timeout_secs: u64) -> CatalogSource {
    CatalogSource::new(
        name.to_string(),
        CatalogSourceConfig {
            base_url: base_url.to_string(),
            api_path: api_path.to_string(),
            search_path: None,
            term_encoding: TermEncoding::Percent,
            secure_aliases: Vec::new(),
            timeout_secs: Some(timeout_secs),
            description: None,
        },
        HttpFetcher::new(&HttpConfig::default()).unwrap(),
    )
    .unwrap()
}

// ============ Full pipeline ============

#[tokio::test]
async fn essential_item_is_fetched_once_then_served_from_cache() {
    let upstream = common::start_upstream().await;
    let tmp = TempDir::new().unwrap();
    let cfg = common::upstream_config(&tmp, &upstream.base_url());
    let aggregator = Aggregator::from_config(&cfg).await.unwrap();

    let first = aggregator.search("Arroz 5kg").await.unwrap();
    assert_eq!(first.query, "Arroz 5kg");
    assert_eq!(first.item.as_deref(), Some("Arroz 5kg"));
    assert!(!first.cached);
    assert!(first.saved);
    assert!(first.id.is_some());
    assert!(first.warning.is_none());

    let results = fresh(&first.results);
    assert_eq!(
        results.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["atacadao", "ldstore", "spani", "tenda"]
    );
    // catalog API + JSON-LD page (API 500) + card page (API bot wall) + two storefront pages
    let hits_after_first = upstream.hits();
    assert_eq!(hits_after_first, 7);

    let second = aggregator.search("  arroz 5KG ").await.unwrap();
    assert!(second.cached);
    assert!(second.saved);
    assert_eq!(second.item.as_deref(), Some("Arroz 5kg"));
    assert_eq!(second.query, "arroz 5KG");
    assert_eq!(second.id, first.id);
    assert_eq!(second.results, SearchResults::Cached(first.results.to_stored()));
    assert_eq!(upstream.hits(), hits_after_first);

    let third = aggregator.search("ARROZ 5KG").await.unwrap();
    assert_eq!(
        serde_json::to_string(&third.results).unwrap(),
        serde_json::to_string(&second.results).unwrap()
    );
    assert_eq!(upstream.hits(), hits_after_first);
}

#[tokio::test]
async fn catalog_api_products_are_normalized_deduped_and_filtered() {
    let upstream = common::start_upstream().await;
    let tmp = TempDir::new().unwrap();
    let cfg = common::upstream_config(&tmp, &upstream.base_url());
    let aggregator = Aggregator::from_config(&cfg).await.unwrap();

    let outcome = aggregator.search("Arroz 5kg").await.unwrap();
    let results = fresh(&outcome.results);
    let base = upstream.base_url();

    // duplicate spelling, null prices, off-topic and malformed entries are gone
    assert_eq!(
        names(results, "atacadao"),
        vec!["Arroz Tipo 1 Tio João 5kg", "Arroz Parboilizado Camil 5kg"]
    );
    assert_eq!(prices(results, "atacadao"), vec![27.9, 24.5]);

    let first = &results["atacadao"][0];
    assert_eq!(first.link, format!("{}/arroz-tipo-1-tio-joao-5kg/p", base));
    assert_eq!(first.quantity, "5");
    assert_eq!(first.unit, "un");
    assert_eq!(first.source, "catalog_api");
    assert_eq!(
        results["atacadao"][1].link,
        format!("{}/arroz-parboilizado-camil-5kg/p", base)
    );
}

#[tokio::test]
async fn storefront_fetches_second_page_when_first_is_short() {
    let upstream = common::start_upstream().await;
    let tmp = TempDir::new().unwrap();
    let cfg = common::upstream_config(&tmp, &upstream.base_url());
    let aggregator = Aggregator::from_config(&cfg).await.unwrap();

    let outcome = aggregator.search("Arroz 5kg").await.unwrap();
    let results = fresh(&outcome.results);

    assert_eq!(
        names(results, "spani"),
        vec![
            "Arroz Branco Tipo 1 Prato Fino 5kg",
            "Arroz Branco Tipo 1 Namorado 5kg",
            "Arroz Branco Tipo 1 Camil 5kg",
        ]
    );
    assert_eq!(prices(results, "spani"), vec![31.9, 26.49, 28.75]);
    for product in &results["spani"] {
        assert_eq!(product.unit, "un");
        assert_eq!(product.quantity, "5");
        assert!(product.link.is_empty());
        assert_eq!(product.source, "storefront_api");
    }
}

#[tokio::test]
async fn search_page_fallbacks_use_json_ld_then_cards() {
    let upstream = common::start_upstream().await;
    let tmp = TempDir::new().unwrap();
    let cfg = common::upstream_config(&tmp, &upstream.base_url());
    let aggregator = Aggregator::from_config(&cfg).await.unwrap();

    let outcome = aggregator.search("Arroz 5kg").await.unwrap();
    let results = fresh(&outcome.results);
    let base = upstream.base_url();

    // JSON-LD wins over the card on the same page
    assert_eq!(
        names(results, "ldstore"),
        vec!["Arroz Tipo 1 Blue Ville 5kg", "Arroz Agulhinha Máximo 5kg"]
    );
    assert_eq!(prices(results, "ldstore"), vec![23.99, 21.5]);
    assert_eq!(
        results["ldstore"][0].link,
        format!("{}/arroz-tipo-1-blue-ville-5kg/p", base)
    );
    assert_eq!(
        results["ldstore"][1].link,
        format!("{}/ld/busca?q=Arroz%205kg", base)
    );
    assert_eq!(results["ldstore"][0].source, "json_ld_itemlist");

    // sabonete is off-topic, the unavailable card has no price
    assert_eq!(
        names(results, "tenda"),
        vec!["Arroz Tipo 1 Kicaldo 5kg", "Arroz Tipo 1 Tio Urbano 5kg"]
    );
    assert_eq!(prices(results, "tenda"), vec![24.9, 22.49]);
    assert_eq!(
        results["tenda"][0].link,
        format!("{}/arroz-tipo-1-kicaldo-5kg/p", base)
    );
    assert_eq!(
        results["tenda"][1].link,
        "https://www.tendaatacado.com.br/arroz-tipo-1-tio-urbano-5kg/p"
    );
    assert_eq!(results["tenda"][0].source, "html_scan");
}

#[tokio::test]
async fn free_text_search_is_cached_under_its_own_term() {
    let upstream = common::start_upstream().await;
    let tmp = TempDir::new().unwrap();
    let cfg = common::upstream_config(&tmp, &upstream.base_url());
    let aggregator = Aggregator::from_config(&cfg).await.unwrap();

    let first = aggregator.search("sabão em pó").await.unwrap();
    assert!(first.item.is_none());
    assert!(!first.cached);
    assert_eq!(first.results.total(), 0);
    assert_eq!(fresh(&first.results).len(), 4);

    let hits = upstream.hits();
    let second = aggregator.search("sabão em pó").await.unwrap();
    assert!(second.cached);
    assert_eq!(second.id, first.id);
    assert_eq!(upstream.hits(), hits);

    // a different spelling of free text is a different search
    let third = aggregator.search("Sabão em pó").await.unwrap();
    assert!(!third.cached);
    assert_ne!(third.id, first.id);
}

// ============ Source isolation ============

#[tokio::test]
async fn failing_sources_contribute_empty_lists() {
    let upstream = common::start_upstream().await;
    let closed = format!("http://127.0.0.1:{}", common::find_free_port());

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(StaticSource::new(
        "good",
        &[("Feijão Carioca Kicaldo 1kg", 7.99)],
    )));
    registry.register(Arc::new(HangingSource::new()));
    registry.register(Arc::new(PanickingSource::new()));
    registry.register(Arc::new(catalog_source(
        "refused",
        &closed,
        "/api/{term}",
        5,
    )));
    registry.register(Arc::new(catalog_source(
        "slow",
        &upstream.base_url(),
        "/slow/api/{term}",
        1,
    )));
    let aggregator = in_memory(registry, Duration::from_secs(2));

    let started = Instant::now();
    let outcome = aggregator.search("Feijão 1kg").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let results = fresh(&outcome.results);
    assert_eq!(results.len(), 5);
    assert_eq!(names(results, "good"), vec!["Feijão Carioca Kicaldo 1kg"]);
    for source in ["hanging", "panicking", "refused", "slow"] {
        assert!(results[source].is_empty(), "{} should be empty", source);
    }
    assert!(outcome.saved);
}

#[tokio::test]
async fn concurrent_identical_searches_share_one_snapshot() {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(StaticSource::new(
        "good",
        &[("Leite UHT Integral 1L", 4.79)],
    )));
    let store = Arc::new(InMemoryStore::new());
    let aggregator = Aggregator::new(
        registry,
        EssentialCatalog::default(),
        store.clone(),
        Duration::from_secs(2),
    );

    let (a, b) = tokio::join!(aggregator.search("Leite UHT 1L"), aggregator.search("Leite UHT 1L"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.id, b.id);
    assert!(a.saved && b.saved);
    assert_eq!(store.len(), 1);
}

// ============ Store failures ============

/// A store whose every call fails.
struct BrokenStore;

#[async_trait]
impl SearchStore for BrokenStore {
    async fn find_in_window(
        &self,
        _key: &CacheKey,
        _window: &DayWindow,
    ) -> anyhow::Result<Option<SearchRecord>> {
        Err(anyhow!("database is locked"))
    }

    async fn insert(&self, _record: &SearchRecord) -> anyhow::Result<InsertOutcome> {
        Err(anyhow!("disk full"))
    }
}

/// A store that always loses the insert race.
struct LosingStore;

#[async_trait]
impl SearchStore for LosingStore {
    async fn find_in_window(
        &self,
        _key: &CacheKey,
        _window: &DayWindow,
    ) -> anyhow::Result<Option<SearchRecord>> {
        Ok(None)
    }

    async fn insert(&self, _record: &SearchRecord) -> anyhow::Result<InsertOutcome> {
        Ok(InsertOutcome::AlreadyPresent {
            existing_id: "winner".to_string(),
        })
    }
}

fn one_source() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(StaticSource::new(
        "good",
        &[("Café Pilão Tradicional 500g", 18.9)],
    )));
    registry
}

#[tokio::test]
async fn save_failure_still_returns_fresh_results() {
    let aggregator = Aggregator::new(
        one_source(),
        EssentialCatalog::default(),
        Arc::new(BrokenStore),
        Duration::from_secs(2),
    );

    let outcome = aggregator.search("pó de café 500g").await.unwrap();
    assert!(!outcome.cached);
    assert!(!outcome.saved);
    assert!(outcome.id.is_none());
    assert_eq!(
        outcome.warning.as_deref(),
        Some("Results were not saved to the database")
    );
    assert_eq!(outcome.item.as_deref(), Some("Pó de Café 500g"));
    assert_eq!(outcome.results.total(), 1);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["saved"], false);
    assert!(json["id"].is_null());
    assert_eq!(json["results"]["good"][0]["name"], "Café Pilão Tradicional 500g");
    assert!(json["results"]["good"][0].get("link").is_some());
}

#[tokio::test]
async fn lost_insert_race_reports_existing_snapshot() {
    let aggregator = Aggregator::new(
        one_source(),
        EssentialCatalog::default(),
        Arc::new(LosingStore),
        Duration::from_secs(2),
    );

    let outcome = aggregator.search("pó de café 500g").await.unwrap();
    assert!(outcome.saved);
    assert_eq!(outcome.id.as_deref(), Some("winner"));
    assert!(outcome.warning.is_none());
}

// ============ Rejected searches ============

#[tokio::test]
async fn blank_term_is_rejected() {
    let aggregator = in_memory(one_source(), Duration::from_secs(2));
    assert!(matches!(
        aggregator.search("   ").await,
        Err(AggregateError::EmptyTerm)
    ));
}

#[tokio::test]
async fn empty_registry_is_an_error() {
    let aggregator = in_memory(SourceRegistry::new(), Duration::from_secs(2));
    assert!(matches!(
        aggregator.search("Arroz 5kg").await,
        Err(AggregateError::NoSources)
    ));
}
