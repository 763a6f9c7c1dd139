//! VipCommerce storefront search responses.
//!
//! ```json
//! {"success": true,
//!  "data": {"produtos": [{"descricao": "...", "preco": "12.90", "unidade_sigla": "UN"}],
//!           "paginator": {"page": 1, "total_pages": 3, "total_items": 52}}}
//! ```

use serde::Deserialize;
use serde_json::Value;

use super::{looks_like_html, ExtractError};
use crate::records::{null_as_default, Paginator, RawRecord, StorefrontProduct};

/// One page of storefront results.
#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontPage {
    pub records: Vec<RawRecord>,
    pub paginator: Paginator,
}

impl StorefrontPage {
    pub fn has_more_pages(&self) -> bool {
        self.paginator.total_pages > self.paginator.page.max(1)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    #[serde(default, deserialize_with = "null_as_default")]
    produtos: Vec<Value>,
    #[serde(default)]
    paginator: Option<Paginator>,
}

pub fn parse_storefront_search(body: &str) -> Result<StorefrontPage, ExtractError> {
    if looks_like_html(body) {
        return Err(ExtractError::HtmlPayload);
    }

    let envelope: Envelope = serde_json::from_str(body)?;
    if !envelope.success {
        return Err(ExtractError::Shape("storefront reported success=false".to_string()));
    }
    let data = envelope
        .data
        .ok_or_else(|| ExtractError::Shape("missing data block".to_string()))?;

    let records = data
        .produtos
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<StorefrontProduct>(entry) {
            Ok(product) => Some(RawRecord::Storefront(product)),
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed storefront entry");
                None
            }
        })
        .collect();

    Ok(StorefrontPage {
        records,
        paginator: data.paginator.unwrap_or_default(),
    })
}
