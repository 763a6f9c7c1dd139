//! schema.org `Product` data embedded as `application/ld+json`.
//!
//! Handles top-level `Product` objects, `ItemList`s whose elements (or their
//! `item`) are products, arrays of either, and `@graph` containers. Blocks
//! that fail to parse are skipped.

use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::records::{JsonLdProduct, PriceValue, RawRecord};

#[derive(Debug, Deserialize)]
struct LdProduct {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    offers: Option<LdOffers>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LdOffers {
    Many(Vec<LdOffer>),
    One(LdOffer),
}

#[derive(Debug, Deserialize)]
struct LdOffer {
    #[serde(default)]
    price: Option<PriceValue>,
    /// `AggregateOffer` carries a range instead of a single price.
    #[serde(default, rename = "lowPrice")]
    low_price: Option<PriceValue>,
}

impl LdOffer {
    fn amount(self) -> Option<PriceValue> {
        self.price.or(self.low_price)
    }
}

impl LdOffers {
    fn first_amount(self) -> Option<PriceValue> {
        match self {
            LdOffers::One(offer) => offer.amount(),
            LdOffers::Many(offers) => offers.into_iter().find_map(LdOffer::amount),
        }
    }
}

/// Extract every JSON-LD product on the page.
pub fn extract_json_ld(html: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    if let Ok(selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&selector) {
            let text = script.text().collect::<String>();
            match serde_json::from_str::<Value>(text.trim()) {
                Ok(value) => collect_products(&value, &mut records),
                Err(err) => tracing::debug!(error = %err, "skipping unparseable JSON-LD block"),
            }
        }
    }

    records
}

fn collect_products(value: &Value, out: &mut Vec<RawRecord>) {
    match value {
        Value::Array(values) => {
            for value in values {
                collect_products(value, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::Array(graph)) = map.get("@graph") {
                for value in graph {
                    collect_products(value, out);
                }
            }

            if has_type(value, "Product") {
                push_product(value, false, out);
            } else if has_type(value, "ItemList") {
                if let Some(Value::Array(elements)) = map.get("itemListElement") {
                    for element in elements {
                        let candidate = element.get("item").unwrap_or(element);
                        if has_type(candidate, "Product") {
                            push_product(candidate, true, out);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// `@type` may be a single string or an array of strings.
fn has_type(value: &Value, wanted: &str) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind == wanted,
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind.as_str() == Some(wanted)),
        _ => false,
    }
}

fn push_product(value: &Value, listed: bool, out: &mut Vec<RawRecord>) {
    match LdProduct::deserialize(value) {
        Ok(product) => out.push(RawRecord::JsonLd(JsonLdProduct {
            name: product.name,
            price: product.offers.and_then(LdOffers::first_amount),
            url: product.url,
            listed,
        })),
        Err(err) => tracing::debug!(error = %err, "skipping JSON-LD product with unexpected fields"),
    }
}
