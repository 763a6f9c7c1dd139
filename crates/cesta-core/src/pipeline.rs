//! The per-source post-extraction pipeline: normalize, dedupe, filter.

use crate::dedup::dedupe;
use crate::models::Product;
use crate::normalize::{normalize, SiteOrigin};
use crate::records::RawRecord;
use crate::relevance::filter_relevant;

/// Turn one source's raw records into its final product list for `term`.
pub fn process_source(records: Vec<RawRecord>, site: &SiteOrigin, term: &str) -> Vec<Product> {
    let raw = records.len();
    let normalized: Vec<Product> = records
        .into_iter()
        .filter_map(|record| normalize(record, site))
        .collect();
    let normalized_count = normalized.len();

    let unique = dedupe(normalized);
    let unique_count = unique.len();

    let relevant = filter_relevant(unique, term);
    tracing::debug!(
        site = site.origin(),
        raw,
        normalized = normalized_count,
        unique = unique_count,
        relevant = relevant.len(),
        "processed source records"
    );
    relevant
}
