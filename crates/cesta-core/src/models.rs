//! Core data models used throughout Cesta.
//!
//! [`Product`] is the normalized, per-request shape every source produces.
//! [`SearchRecord`] is the once-per-day snapshot written to the store, which
//! keeps only the [`StoredProduct`] projection of each product.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized product listing from one upstream source.
///
/// Products leaving the normalizer always have a non-empty `name` and a
/// finite, positive `price`; records that cannot satisfy this are dropped
/// instead of being represented with a null price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
    /// Numeric magnitude as text (`"5"`, `"1.5"`), empty when unknown.
    pub quantity: String,
    /// Lower-cased unit token (`"kg"`, `"ml"`, `"un"`), empty when unknown.
    pub unit: String,
    /// Absolute product page URL, possibly empty.
    pub link: String,
    /// Extraction strategy that produced this product. Diagnostic only.
    pub source: String,
}

/// The persisted projection of a [`Product`]: link and strategy tag dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub name: String,
    pub price: f64,
    pub quantity: String,
    pub unit: String,
}

impl From<&Product> for StoredProduct {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price,
            quantity: product.quantity.clone(),
            unit: product.unit.clone(),
        }
    }
}

/// Fresh results keyed by source name. `BTreeMap` keeps serialization order stable.
pub type ProductsBySource = BTreeMap<String, Vec<Product>>;

/// Persisted results keyed by source name.
pub type StoredBySource = BTreeMap<String, Vec<StoredProduct>>;

/// Strip every product down to its persisted projection, preserving order.
pub fn to_stored(results: &ProductsBySource) -> StoredBySource {
    results
        .iter()
        .map(|(source, products)| {
            (
                source.clone(),
                products.iter().map(StoredProduct::from).collect(),
            )
        })
        .collect()
}

/// One search snapshot, written at most once per cache key and local day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: String,
    /// The raw term as the caller typed it.
    pub query: String,
    /// Canonical essential item the term resolved to, if any.
    pub item: Option<String>,
    /// Cache identity: the canonical item when present, else the raw term.
    pub cache_key: String,
    /// Local calendar day (`YYYY-MM-DD`) the snapshot belongs to.
    pub day: String,
    pub results: StoredBySource,
    pub created_at: DateTime<Utc>,
}
