//! Per-source duplicate removal.
//!
//! A product is a duplicate when an earlier kept product shares its exact
//! key (normalized name + price) or its fuzzy key (normalized name with
//! quantity expressions removed + price). First-seen order is preserved and
//! only kept products are remembered, so running [`dedupe`] on its own output
//! changes nothing.

use std::collections::HashSet;

use crate::models::Product;
use crate::normalize::strip_quantities;

/// Membership checker for comparison keys.
#[derive(Debug, Default)]
pub struct SeenKeys {
    keys: HashSet<String>,
}

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn mark(&mut self, key: String) {
        self.keys.insert(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Lower-cased name with runs of whitespace collapsed.
pub fn normalized_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn exact_key(product: &Product) -> String {
    format!("{}|{:.2}", normalized_name(&product.name), product.price)
}

/// Key ignoring quantity expressions, or `None` when nothing but quantities
/// remains of the name.
pub fn fuzzy_key(product: &Product) -> Option<String> {
    let stripped = normalized_name(&strip_quantities(&product.name));
    if stripped.is_empty() {
        return None;
    }
    Some(format!("{}|{:.2}", stripped, product.price))
}

/// Remove duplicates, keeping the first occurrence of each product.
pub fn dedupe(products: Vec<Product>) -> Vec<Product> {
    let mut exact = SeenKeys::new();
    let mut fuzzy = SeenKeys::new();
    let mut kept = Vec::with_capacity(products.len());

    for product in products {
        let exact_key = exact_key(&product);
        let fuzzy_key = fuzzy_key(&product);

        let duplicate = exact.seen(&exact_key)
            || fuzzy_key.as_deref().is_some_and(|key| fuzzy.seen(key));
        if duplicate {
            continue;
        }

        exact.mark(exact_key);
        if let Some(key) = fuzzy_key {
            fuzzy.mark(key);
        }
        kept.push(product);
    }

    kept
}
