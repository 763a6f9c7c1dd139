//! VTEX catalog search responses.
//!
//! The endpoint answers with a bare JSON array of products. Entries that do
//! not fit [`CatalogProduct`] are skipped individually.

use serde_json::Value;

use super::{looks_like_html, ExtractError};
use crate::records::{CatalogProduct, RawRecord};

pub fn parse_catalog_search(body: &str) -> Result<Vec<RawRecord>, ExtractError> {
    if looks_like_html(body) {
        return Err(ExtractError::HtmlPayload);
    }

    let entries = match serde_json::from_str::<Value>(body)? {
        Value::Array(entries) => entries,
        other => {
            return Err(ExtractError::Shape(format!(
                "expected a product array, got {}",
                kind_of(&other)
            )))
        }
    };

    let records = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<CatalogProduct>(entry) {
            Ok(product) => Some(RawRecord::Catalog(product)),
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed catalog entry");
                None
            }
        })
        .collect();

    Ok(records)
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
