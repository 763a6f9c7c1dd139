//! Normalization of raw upstream records into [`Product`]s.
//!
//! Rules applied to every record regardless of origin:
//!
//! - names are trimmed; records with an empty name are dropped
//! - prices are parsed from numbers or localized strings; records without a
//!   finite, positive price are dropped
//! - quantity and unit are read from the name; an upstream unit always wins
//!   over the name, an upstream quantity only fills in when the name has none
//! - links are made absolute against the source's canonical origin
//!
//! Price strings follow Brazilian conventions when they contain a comma
//! (`"1.234,56"` → `1234.56`). Without a comma, a dot is a decimal point
//! unless the string is pure thousands grouping (`"1.234"` → `1234`).

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Position, Url};

use crate::models::Product;
use crate::records::{CatalogProduct, HtmlCard, JsonLdProduct, PriceValue, RawRecord, StorefrontProduct};

/// Longest name kept from a scanned HTML card.
pub const MAX_NAME_CHARS: usize = 200;

static QUANTITY_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[,.]\d+)?)\s*(kg|gr|g|ml|lata|l|uni|un|pacote|pc|pç|caixa|cx|garrafa)\b")
        .expect("quantity pattern is valid")
});

static NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d.,]*").expect("number pattern is valid"));

static THOUSANDS_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("thousands pattern is valid"));

static CURRENCY_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"R\$\s*(\d+(?:[.,]\d{3})*(?:[.,]\d{1,2})?)").expect("currency pattern is valid")
});

static LABEL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[\p{L}]+:").expect("label pattern is valid"));

/// Canonical origin of a source, used to absolutize links.
///
/// Links pointing at an alias host (for example a `secure.` checkout host)
/// are rewritten onto the canonical origin.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteOrigin {
    base: Url,
    canonical: String,
    aliases: Vec<String>,
}

impl SiteOrigin {
    pub fn new(origin: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(origin)?;
        let canonical = base.origin().ascii_serialization();
        Ok(Self {
            base,
            canonical,
            aliases: Vec::new(),
        })
    }

    /// Register another origin whose links belong to this site.
    pub fn with_alias(mut self, alias: &str) -> Result<Self, url::ParseError> {
        let alias = Url::parse(alias)?.origin().ascii_serialization();
        self.aliases.push(alias);
        Ok(self)
    }

    pub fn origin(&self) -> &str {
        &self.canonical
    }

    /// Resolve `link` to an absolute URL on this site.
    ///
    /// Empty links stay empty. Absolute links on an alias origin are moved
    /// to the canonical origin; other absolute links are kept as they are.
    pub fn absolute_link(&self, link: &str) -> String {
        let link = link.trim();
        if link.is_empty() {
            return String::new();
        }

        if let Ok(parsed) = Url::parse(link) {
            let origin = parsed.origin().ascii_serialization();
            if self.aliases.iter().any(|alias| *alias == origin) {
                return format!("{}{}", self.canonical, &parsed[Position::BeforePath..]);
            }
            return link.to_string();
        }

        match self.base.join(link) {
            Ok(joined) => joined.to_string(),
            Err(_) => String::new(),
        }
    }
}

/// Normalize one raw record, or `None` when it lacks a usable name or price.
pub fn normalize(record: RawRecord, site: &SiteOrigin) -> Option<Product> {
    let source = record.strategy_tag();
    let draft = match record {
        RawRecord::Catalog(product) => from_catalog(product, site),
        RawRecord::Storefront(product) => from_storefront(product),
        RawRecord::JsonLd(product) => from_json_ld(product, site),
        RawRecord::HtmlCard(card) => from_html_card(card, site),
    };
    draft.finish(source)
}

/// Fields gathered from a raw record before the common rules run.
#[derive(Debug, Default)]
struct Draft {
    name: String,
    price: Option<f64>,
    quantity: Option<String>,
    unit: Option<String>,
    link: String,
}

impl Draft {
    fn finish(self, source: &str) -> Option<Product> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let price = self.price?;

        let parsed = extract_quantity(&name);
        let quantity = parsed
            .as_ref()
            .map(|(quantity, _)| quantity.clone())
            .or(self.quantity)
            .unwrap_or_default();
        let unit = self
            .unit
            .map(|unit| unit.trim().to_lowercase())
            .filter(|unit| !unit.is_empty())
            .or(parsed.map(|(_, unit)| unit))
            .unwrap_or_default();

        Some(Product {
            name,
            price,
            quantity,
            unit,
            link: self.link,
            source: source.to_string(),
        })
    }
}

fn from_catalog(product: CatalogProduct, site: &SiteOrigin) -> Draft {
    let offer = product.first_offer();
    let price = offer
        .and_then(|offer| offer.price.as_ref().and_then(parse_price))
        .or_else(|| offer.and_then(|offer| offer.list_price.as_ref().and_then(parse_price)));
    let sku = product.first_sku();

    Draft {
        name: product
            .product_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| product.name.clone())
            .unwrap_or_default(),
        price,
        quantity: sku.and_then(|sku| sku.unit_multiplier).and_then(format_quantity),
        unit: sku.and_then(|sku| sku.measurement_unit.clone()),
        link: site.absolute_link(product.link.as_deref().unwrap_or("")),
    }
}

fn from_storefront(product: StorefrontProduct) -> Draft {
    Draft {
        name: product.descricao.unwrap_or_default(),
        price: product.preco.as_ref().and_then(parse_price),
        quantity: None,
        unit: product.unidade_sigla,
        link: String::new(),
    }
}

fn from_json_ld(product: JsonLdProduct, site: &SiteOrigin) -> Draft {
    Draft {
        name: product.name.unwrap_or_default(),
        price: product.price.as_ref().and_then(parse_price),
        quantity: None,
        unit: None,
        link: site.absolute_link(product.url.as_deref().unwrap_or("")),
    }
}

fn from_html_card(card: HtmlCard, site: &SiteOrigin) -> Draft {
    let name = card
        .name
        .map(|name| collapse_whitespace(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| name_from_card_text(&card.text));

    Draft {
        name: truncate_chars(&name, MAX_NAME_CHARS),
        price: find_currency_price(&card.text),
        quantity: None,
        unit: None,
        link: site.absolute_link(card.link.as_deref().unwrap_or("")),
    }
}

/// Parse an upstream price value into a finite, positive amount.
pub fn parse_price(value: &PriceValue) -> Option<f64> {
    match value {
        PriceValue::Number(number) => valid_price(*number),
        PriceValue::Text(text) => parse_price_text(text),
    }
}

/// Parse the first numeric token of a localized price string.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let token = NUMBER_TOKEN.find(text)?.as_str();
    parse_number_token(token)
}

/// Find the first `R$`-prefixed amount in free text.
pub fn find_currency_price(text: &str) -> Option<f64> {
    let captures = CURRENCY_PRICE.captures(text)?;
    parse_number_token(captures.get(1)?.as_str())
}

fn parse_number_token(token: &str) -> Option<f64> {
    let token = token.trim_end_matches(['.', ',']);
    let numeric = if token.contains(',') {
        token.replace('.', "").replace(',', ".")
    } else if THOUSANDS_ONLY.is_match(token) {
        token.replace('.', "")
    } else {
        token.to_string()
    };
    valid_price(numeric.parse().ok()?)
}

fn valid_price(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Read `(quantity, unit)` from a product name, e.g. `"Arroz 5kg"` → `("5", "kg")`.
///
/// Decimal commas become dots and the unit is lower-cased.
pub fn extract_quantity(name: &str) -> Option<(String, String)> {
    let captures = QUANTITY_UNIT.captures(name)?;
    let quantity = captures.get(1)?.as_str().replace(',', ".");
    let unit = captures.get(2)?.as_str().to_lowercase();
    Some((quantity, unit))
}

/// Remove every quantity/unit expression from `name`.
pub fn strip_quantities(name: &str) -> String {
    collapse_whitespace(&QUANTITY_UNIT.replace_all(name, " "))
}

fn format_quantity(value: f64) -> Option<String> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    if value.fract() == 0.0 {
        Some(format!("{}", value as i64))
    } else {
        Some(value.to_string())
    }
}

/// Derive a product name from card text by dropping price expressions and
/// `label:` tokens.
fn name_from_card_text(text: &str) -> String {
    let without_prices = CURRENCY_PRICE.replace_all(text, " ");
    let without_labels = LABEL_TOKEN.replace_all(&without_prices, " ");
    collapse_whitespace(&without_labels)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}
