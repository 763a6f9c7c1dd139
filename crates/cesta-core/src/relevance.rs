//! Relevance filtering of products against the search term.
//!
//! Significant words are the whitespace-separated words of the term that are
//! at least [`MIN_WORD_CHARS`] characters long. A product is relevant when
//! its lower-cased name contains every significant word as a substring. A
//! term without significant words keeps everything.

use crate::models::Product;

pub const MIN_WORD_CHARS: usize = 3;

/// Lower-cased words of `term` that take part in matching.
pub fn significant_words(term: &str) -> Vec<String> {
    term.split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= MIN_WORD_CHARS)
        .collect()
}

pub fn is_relevant(product: &Product, words: &[String]) -> bool {
    let name = product.name.to_lowercase();
    words.iter().all(|word| name.contains(word.as_str()))
}

/// Keep the products whose names mention every significant word of `term`.
pub fn filter_relevant(products: Vec<Product>, term: &str) -> Vec<Product> {
    let words = significant_words(term);
    if words.is_empty() {
        return products;
    }
    products
        .into_iter()
        .filter(|product| is_relevant(product, &words))
        .collect()
}
