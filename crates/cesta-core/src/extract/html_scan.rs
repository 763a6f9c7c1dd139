//! Heuristic product-card scan for search pages without structured data.
//!
//! Cards are located with a list of common product-card class names; the
//! first selector that matches anything is used. When none matches, the
//! scan falls back to `div`, `li` and `article` blocks whose text holds an
//! `R$` amount and is of a plausible card length, keeping only the
//! innermost qualifying blocks so a results wrapper never stands in for
//! the cards it holds.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::normalize::{collapse_whitespace, truncate_chars, MAX_NAME_CHARS};
use crate::records::{HtmlCard, RawRecord};

pub const CARD_SELECTORS: [&str; 9] = [
    ".product-item",
    ".product",
    ".product-card",
    ".shelf-item",
    ".product-box",
    ".productCard",
    ".product-container",
    ".product-block",
    ".item-produto",
];

const NAME_SELECTORS: [&str; 7] = [
    ".product-name",
    ".product-title",
    ".name",
    ".title",
    "h2",
    "h3",
    "h4",
];

const FALLBACK_BLOCKS: &str = "div, li, article";

/// Text length bounds (exclusive) for a fallback block to count as a card.
const MIN_BLOCK_CHARS: usize = 10;
const MAX_BLOCK_CHARS: usize = 500;

/// Shortest text node accepted as a name when no name element exists.
const MIN_NAME_CHARS: usize = 10;

static PRICE_MARK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"R\$\s*\d+[,.]\d+").expect("price mark pattern is valid"));

/// Scan a search page for product cards.
pub fn scan_product_cards(html: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);

    let mut cards = select_known_cards(&document);
    if cards.is_empty() {
        cards = select_price_blocks(&document);
    }

    cards.into_iter().filter_map(card_record).collect()
}

fn select_known_cards(document: &Html) -> Vec<ElementRef<'_>> {
    for css in CARD_SELECTORS {
        if let Ok(selector) = Selector::parse(css) {
            let found: Vec<_> = document.select(&selector).collect();
            if !found.is_empty() {
                tracing::debug!(selector = css, count = found.len(), "matched product card selector");
                return found;
            }
        }
    }
    Vec::new()
}

fn select_price_blocks(document: &Html) -> Vec<ElementRef<'_>> {
    let Ok(selector) = Selector::parse(FALLBACK_BLOCKS) else {
        return Vec::new();
    };

    let qualifying: Vec<_> = document
        .select(&selector)
        .filter(|block| {
            let text = element_text(block);
            let len = text.chars().count();
            len > MIN_BLOCK_CHARS && len < MAX_BLOCK_CHARS && PRICE_MARK.is_match(&text)
        })
        .collect();

    let ids: HashSet<_> = qualifying.iter().map(|block| block.id()).collect();
    let wrappers: HashSet<_> = qualifying
        .iter()
        .flat_map(|block| block.ancestors().map(|ancestor| ancestor.id()))
        .filter(|id| ids.contains(id))
        .collect();
    qualifying
        .into_iter()
        .filter(|block| !wrappers.contains(&block.id()))
        .collect()
}

fn card_record(card: ElementRef<'_>) -> Option<RawRecord> {
    let text = element_text(&card);
    if text.is_empty() {
        return None;
    }

    Some(RawRecord::HtmlCard(HtmlCard {
        name: card_name(&card).map(|name| truncate_chars(&name, MAX_NAME_CHARS)),
        link: card_link(&card),
        text,
    }))
}

/// Longest text among name-like children, else the longest own text node
/// that is not a price.
fn card_name(card: &ElementRef<'_>) -> Option<String> {
    let mut best: Option<String> = None;
    for css in NAME_SELECTORS {
        if let Ok(selector) = Selector::parse(css) {
            if let Some(element) = card.select(&selector).next() {
                let text = element_text(&element);
                let longer = best
                    .as_ref()
                    .map_or(true, |b| text.chars().count() > b.chars().count());
                if !text.is_empty() && longer {
                    best = Some(text);
                }
            }
        }
    }
    if best.is_some() {
        return best;
    }

    card.descendants()
        .filter_map(|node| node.value().as_text().map(|text| collapse_whitespace(text)))
        .filter(|text| text.chars().count() > MIN_NAME_CHARS && !text.contains("R$"))
        .max_by_key(|text| text.chars().count())
}

/// First `href` inside the card, else the nearest enclosing anchor.
fn card_link(card: &ElementRef<'_>) -> Option<String> {
    if card.value().name() == "a" {
        if let Some(href) = card.value().attr("href") {
            return Some(href.to_string());
        }
    }

    if let Ok(selector) = Selector::parse("a[href]") {
        if let Some(anchor) = card.select(&selector).next() {
            return anchor.value().attr("href").map(str::to_string);
        }
    }

    card.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
}

fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}
