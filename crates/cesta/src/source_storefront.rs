//! VipCommerce storefront sources (Spani, ...).
//!
//! The storefront API is paginated and expects the headers its own web
//! client sends (`domainkey`, `organizationid`, a bearer token and a
//! session id). Token and session are read from the environment variables
//! named in the config; unset variables simply leave the header out.
//!
//! Page 2 is requested only when page 1 came back thin (fewer than
//! `min_results_for_single_page` products) and the paginator says more
//! pages exist.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use cesta_core::extract::storefront_api::{parse_storefront_search, StorefrontPage};
use cesta_core::normalize::SiteOrigin;
use cesta_core::RawRecord;

use crate::config::{StorefrontSourceConfig, TermEncoding};
use crate::http::{encode_term, HttpFetcher};
use crate::traits::{Source, SourceKind};

const SEC_CH_UA: &str = r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#;

pub struct StorefrontSource {
    name: String,
    description: String,
    config: StorefrontSourceConfig,
    site: SiteOrigin,
    fetcher: HttpFetcher,
    timeout: Duration,
}

impl StorefrontSource {
    pub fn new(name: String, config: StorefrontSourceConfig, fetcher: HttpFetcher) -> Result<Self> {
        let site = SiteOrigin::new(&config.site_url)
            .with_context(|| format!("Invalid site_url for source '{}'", name))?;
        let timeout = config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| fetcher.default_timeout());
        let description = config
            .description
            .clone()
            .unwrap_or_else(|| format!("VipCommerce storefront for {}", site.origin()));

        Ok(Self {
            name,
            description,
            config,
            site,
            fetcher,
            timeout,
        })
    }

    pub fn page_url(&self, term: &str, page: u32) -> String {
        let term = if self.config.lowercase_term {
            term.to_lowercase()
        } else {
            term.to_string()
        };
        self.config
            .api_url
            .replace("{term}", &encode_term(&term, TermEncoding::Plus))
            .replace("{page}", &page.to_string())
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let origin = self.site.origin().to_string();
        let mut headers = vec![
            ("referer", format!("{}/", origin)),
            ("origin", origin),
            ("sec-ch-ua", SEC_CH_UA.to_string()),
            ("sec-ch-ua-mobile", "?0".to_string()),
            ("sec-ch-ua-platform", "\"Windows\"".to_string()),
        ];
        if let Some(domain_key) = &self.config.domain_key {
            headers.push(("domainkey", domain_key.clone()));
        }
        if let Some(organization_id) = &self.config.organization_id {
            headers.push(("organizationid", organization_id.clone()));
        }
        if let Some(token) = env_value(self.config.token_env.as_deref()) {
            headers.push(("authorization", format!("Bearer {}", token)));
        }
        if let Some(session) = env_value(self.config.session_env.as_deref()) {
            headers.push(("sessao-id", session));
        }
        headers
    }

    async fn fetch_page(&self, term: &str, page: u32) -> Option<StorefrontPage> {
        let url = self.page_url(term, page);
        let body = match self
            .fetcher
            .get_json_text(&url, &self.headers(), self.timeout)
            .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!(source = %self.name, page, error = %err, "storefront request failed");
                return None;
            }
        };

        match parse_storefront_search(&body) {
            Ok(page) => Some(page),
            Err(err) => {
                warn!(source = %self.name, page, error = %err, "storefront payload rejected");
                None
            }
        }
    }
}

fn env_value(name: Option<&str>) -> Option<String> {
    let value = std::env::var(name?).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[async_trait]
impl Source for StorefrontSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Storefront
    }

    fn site(&self) -> &SiteOrigin {
        &self.site
    }

    async fn extract(&self, term: &str) -> Vec<RawRecord> {
        let started = Instant::now();

        let Some(first) = self.fetch_page(term, 1).await else {
            return Vec::new();
        };
        let wants_more =
            first.records.len() < self.config.min_results_for_single_page && first.has_more_pages();
        let mut records = first.records;

        if wants_more {
            if let Some(second) = self.fetch_page(term, 2).await {
                records.extend(second.records);
            }
        }

        info!(
            source = %self.name,
            strategy = "storefront_api",
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "source extracted"
        );
        records
    }
}
