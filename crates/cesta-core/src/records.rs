//! Raw upstream record shapes.
//!
//! Every extraction strategy yields [`RawRecord`] values. Each variant keeps
//! the fields exactly as the upstream sent them (strings, numbers, missing
//! keys); turning them into a [`Product`](crate::Product) is the
//! normalizer's job.
//!
//! | Variant | Produced by | Strategy tag |
//! |---------|-------------|--------------|
//! | `Catalog` | VTEX-style catalog search API | `catalog_api` |
//! | `Storefront` | VipCommerce-style storefront API | `storefront_api` |
//! | `JsonLd` | `application/ld+json` blocks | `json_ld_product` / `json_ld_itemlist` |
//! | `HtmlCard` | heuristic DOM scan | `html_scan` |

use serde::{Deserialize, Deserializer, Serialize};

/// One record as emitted by an extraction strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Catalog(CatalogProduct),
    Storefront(StorefrontProduct),
    JsonLd(JsonLdProduct),
    HtmlCard(HtmlCard),
}

impl RawRecord {
    /// Diagnostic tag for the strategy that produced the record.
    pub fn strategy_tag(&self) -> &'static str {
        match self {
            RawRecord::Catalog(_) => "catalog_api",
            RawRecord::Storefront(_) => "storefront_api",
            RawRecord::JsonLd(ld) if ld.listed => "json_ld_itemlist",
            RawRecord::JsonLd(_) => "json_ld_product",
            RawRecord::HtmlCard(_) => "html_scan",
        }
    }

    /// Give structured-data records without their own URL the URL of the
    /// page they were found on.
    pub fn default_link(&mut self, page_url: &str) {
        if let RawRecord::JsonLd(ld) = self {
            let missing = ld.url.as_deref().map(str::trim).unwrap_or("").is_empty();
            if missing {
                ld.url = Some(page_url.to_string());
            }
        }
    }
}

/// A price as upstreams send it: sometimes a JSON number, sometimes a
/// localized string such as `"12,90"` or `"R$ 1.234,56"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

// ===== Catalog API (VTEX) =====

/// One entry of a VTEX `catalog_system/pub/products/search` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<CatalogSku>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSku {
    #[serde(default)]
    pub unit_multiplier: Option<f64>,
    #[serde(default)]
    pub measurement_unit: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sellers: Vec<CatalogSeller>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogSeller {
    /// VTEX spells this `commertialOffer`; a corrected spelling is accepted too.
    #[serde(default, rename = "commertialOffer", alias = "commercialOffer")]
    pub offer: Option<CatalogOffer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogOffer {
    #[serde(default, rename = "Price")]
    pub price: Option<PriceValue>,
    #[serde(default, rename = "ListPrice")]
    pub list_price: Option<PriceValue>,
}

impl CatalogProduct {
    /// First SKU, which carries the price and packaging of the listing.
    pub fn first_sku(&self) -> Option<&CatalogSku> {
        self.items.first()
    }

    /// Offer of the first seller of the first SKU.
    pub fn first_offer(&self) -> Option<&CatalogOffer> {
        self.first_sku()?.sellers.first()?.offer.as_ref()
    }
}

// ===== Storefront API (VipCommerce) =====

/// One entry of `data.produtos` in a storefront search response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StorefrontProduct {
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub preco: Option<PriceValue>,
    #[serde(default)]
    pub unidade_sigla: Option<String>,
}

/// Pagination block that accompanies a storefront search response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Paginator {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: u32,
}

// ===== Structured data and DOM =====

/// A schema.org `Product` found in a JSON-LD block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdProduct {
    pub name: Option<String>,
    pub price: Option<PriceValue>,
    pub url: Option<String>,
    /// True when the product was an element of an `ItemList`.
    pub listed: bool,
}

/// A block of a search page that looks like a product card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlCard {
    /// Name recovered from a name-like child element, if any.
    pub name: Option<String>,
    /// First `href` found in or around the card.
    pub link: Option<String>,
    /// Whitespace-collapsed text content of the whole card.
    pub text: String,
}

/// Treat an explicit JSON `null` the same as a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
