//! Shared helpers: a local axum server standing in for the supermarket
//! sites, and config builders pointing at it.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;
use tempfile::TempDir;

use cesta::config::{self, Config};
use cesta::traits::Source;
use cesta_core::normalize::SiteOrigin;
use cesta_core::records::{PriceValue, StorefrontProduct};
use cesta_core::RawRecord;

pub const CATALOG_JSON: &str = include_str!("../fixtures/catalog_arroz.json");
pub const STOREFRONT_PAGE1: &str = include_str!("../fixtures/storefront_page1.json");
pub const STOREFRONT_PAGE2: &str = include_str!("../fixtures/storefront_page2.json");
pub const SEARCH_JSONLD: &str = include_str!("../fixtures/search_jsonld.html");
pub const SEARCH_CARDS: &str = include_str!("../fixtures/search_cards.html");

const BOT_WALL: &str = "<!DOCTYPE html><html><body><h1>Access denied</h1></body></html>";

// ─── Fake upstream ──────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Upstream {
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct UpstreamServer {
    pub port: u16,
    upstream: Upstream,
}

impl UpstreamServer {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of requests the fake sites have answered so far.
    pub fn hits(&self) -> usize {
        self.upstream.hits.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

async fn catalog_api(State(up): State<Upstream>) -> impl IntoResponse {
    up.hit();
    ([(header::CONTENT_TYPE, "application/json")], CATALOG_JSON)
}

async fn broken_api(State(up): State<Upstream>) -> impl IntoResponse {
    up.hit();
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn jsonld_page(State(up): State<Upstream>) -> Html<&'static str> {
    up.hit();
    Html(SEARCH_JSONLD)
}

async fn bot_wall(State(up): State<Upstream>) -> Html<&'static str> {
    up.hit();
    Html(BOT_WALL)
}

async fn cards_page(State(up): State<Upstream>) -> Html<&'static str> {
    up.hit();
    Html(SEARCH_CARDS)
}

async fn storefront_api(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    up.hit();
    let domain_key = headers.get("domainkey").and_then(|v| v.to_str().ok());
    if domain_key != Some("spanionline.com.br") {
        return (StatusCode::UNAUTHORIZED, "missing domainkey").into_response();
    }
    let body = match query.page.unwrap_or(1) {
        1 => STOREFRONT_PAGE1,
        _ => STOREFRONT_PAGE2,
    };
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn slow_api(State(up): State<Upstream>) -> impl IntoResponse {
    up.hit();
    tokio::time::sleep(Duration::from_secs(10)).await;
    ([(header::CONTENT_TYPE, "application/json")], "[]")
}

/// Serve the fake sites on an ephemeral port.
///
/// | Path | Behaviour |
/// |------|-----------|
/// | `/atacadao/api/{term}` | VTEX catalog JSON |
/// | `/ld/api/{term}` | HTTP 500 |
/// | `/ld/busca` | search page with JSON-LD |
/// | `/tenda/api` | HTML bot wall with status 200 |
/// | `/tenda/busca` | search page with product cards only |
/// | `/spani/termo/{term}` | paginated storefront JSON, requires `domainkey` |
/// | `/slow/api/{term}` | answers after 10 s |
pub async fn start_upstream() -> UpstreamServer {
    let upstream = Upstream::default();

    let app = Router::new()
        .route("/atacadao/api/{term}", get(catalog_api))
        .route("/ld/api/{term}", get(broken_api))
        .route("/ld/busca", get(jsonld_page))
        .route("/tenda/api", get(bot_wall))
        .route("/tenda/busca", get(cards_page))
        .route("/spani/termo/{term}", get(storefront_api))
        .route("/slow/api/{term}", get(slow_api))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    UpstreamServer { port, upstream }
}

// ─── Config ─────────────────────────────────────────────────────────

/// TOML config with one source per fake site.
pub fn upstream_config_toml(tmp: &TempDir, base: &str) -> String {
    format!(
        r#"[db]
path = "{db}"

[server]
bind = "127.0.0.1:0"

[http]
timeout_secs = 5
source_deadline_secs = 10

[logging]
level = "debug"

[sources.catalog.atacadao]
base_url = "{base}"
api_path = "/atacadao/api/{{term}}"
search_path = "/atacadao/busca?q={{term}}"
term_encoding = "percent"
secure_aliases = ["https://secure.atacadao.com.br"]

[sources.catalog.ldstore]
base_url = "{base}"
api_path = "/ld/api/{{term}}"
search_path = "/ld/busca?q={{term}}"

[sources.catalog.tenda]
base_url = "{base}"
api_path = "/tenda/api?ft={{term}}"
search_path = "/tenda/busca?q={{term}}"
term_encoding = "plus"

[sources.storefront.spani]
api_url = "{base}/spani/termo/{{term}}?page={{page}}&departamento=0"
site_url = "https://www.spanionline.com.br"
domain_key = "spanionline.com.br"
organization_id = "67"
"#,
        db = tmp.path().join("data").join("cesta.sqlite").display(),
        base = base,
    )
}

pub fn upstream_config(tmp: &TempDir, base: &str) -> Config {
    let cfg: Config = toml::from_str(&upstream_config_toml(tmp, base)).unwrap();
    config::validate(&cfg).unwrap();
    cfg
}

/// Write `content` to `<tmp>/config/cesta.toml` and return its path.
pub fn write_config(tmp: &TempDir, content: &str) -> PathBuf {
    let dir = tmp.path().join("config");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cesta.toml");
    fs::write(&path, content).unwrap();
    path
}

pub fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

// ─── In-process sources ─────────────────────────────────────────────

/// A source that always yields the same storefront records.
pub struct StaticSource {
    name: String,
    site: SiteOrigin,
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(name: &str, products: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            site: SiteOrigin::new("https://static.example.com").unwrap(),
            records: products
                .iter()
                .map(|(name, price)| {
                    RawRecord::Storefront(StorefrontProduct {
                        descricao: Some(name.to_string()),
                        preco: Some(PriceValue::Number(*price)),
                        unidade_sigla: None,
                    })
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Source for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Fixed in-memory products"
    }
    fn site(&self) -> &SiteOrigin {
        &self.site
    }
    async fn extract(&self, _term: &str) -> Vec<RawRecord> {
        self.records.clone()
    }
}

/// A source that never finishes.
pub struct HangingSource {
    site: SiteOrigin,
}

impl HangingSource {
    pub fn new() -> Self {
        Self {
            site: SiteOrigin::new("https://hanging.example.com").unwrap(),
        }
    }
}

#[async_trait]
impl Source for HangingSource {
    fn name(&self) -> &str {
        "hanging"
    }
    fn description(&self) -> &str {
        "Sleeps far past any deadline"
    }
    fn site(&self) -> &SiteOrigin {
        &self.site
    }
    async fn extract(&self, _term: &str) -> Vec<RawRecord> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Vec::new()
    }
}

/// A source whose task panics.
pub struct PanickingSource {
    site: SiteOrigin,
}

impl PanickingSource {
    pub fn new() -> Self {
        Self {
            site: SiteOrigin::new("https://panicking.example.com").unwrap(),
        }
    }
}

#[async_trait]
impl Source for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }
    fn description(&self) -> &str {
        "Panics while extracting"
    }
    fn site(&self) -> &SiteOrigin {
        &self.site
    }
    async fn extract(&self, _term: &str) -> Vec<RawRecord> {
        panic!("parser blew up")
    }
}
