//! Extraction strategies.
//!
//! Each strategy turns one upstream body into [`RawRecord`]s and never
//! touches the network. JSON strategies report failures as
//! [`ExtractError`]; HTML strategies simply return nothing when a page does
//! not contain what they look for.
//!
//! | Strategy | Input | Module |
//! |----------|-------|--------|
//! | Catalog API | VTEX product search JSON array | [`catalog_api`] |
//! | Storefront API | VipCommerce `{success, data}` envelope | [`storefront_api`] |
//! | JSON-LD | search page HTML | [`json_ld`] |
//! | HTML scan | search page HTML | [`html_scan`] |
//!
//! HTML strategies are tried in order through [`run_html_strategies`]; the
//! first one that yields records wins.

pub mod catalog_api;
pub mod html_scan;
pub mod json_ld;
pub mod storefront_api;

use thiserror::Error;

use crate::records::RawRecord;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("upstream answered with an HTML page where JSON was expected")]
    HtmlPayload,

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// True when a body that should be JSON is actually an HTML document
/// (a login wall, a bot challenge or an error page).
pub fn looks_like_html(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// A pure HTML-to-records extraction step.
#[derive(Debug, Clone, Copy)]
pub struct HtmlStrategy {
    pub name: &'static str,
    pub run: fn(&str) -> Vec<RawRecord>,
}

/// Structured data first, then the heuristic DOM scan.
pub const HTML_STRATEGIES: [HtmlStrategy; 2] = [
    HtmlStrategy {
        name: "json_ld",
        run: json_ld::extract_json_ld,
    },
    HtmlStrategy {
        name: "html_scan",
        run: html_scan::scan_product_cards,
    },
];

/// Run `strategies` in order and return the first non-empty result along
/// with the name of the strategy that produced it.
pub fn run_html_strategies(
    html: &str,
    strategies: &[HtmlStrategy],
) -> Option<(&'static str, Vec<RawRecord>)> {
    for strategy in strategies {
        let records = (strategy.run)(html);
        if !records.is_empty() {
            tracing::debug!(strategy = strategy.name, count = records.len(), "html strategy matched");
            return Some((strategy.name, records));
        }
    }
    None
}
