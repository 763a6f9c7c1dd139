//! The essential-item catalog.
//!
//! A fixed list of canonical staple items ("Arroz 5kg", "Leite UHT 1L", ...).
//! A search term that equals one of them, ignoring case and surrounding or
//! repeated whitespace, resolves to that canonical spelling and shares its
//! daily cache entry.

/// Default staple basket.
pub const DEFAULT_ESSENTIAL_ITEMS: [&str; 15] = [
    "Arroz 5kg",
    "Açúcar 5kg",
    "Feijão 1kg",
    "Óleo de Soja 900ml",
    "Farinha de milho 1kg",
    "Farinha de mandioca 500g",
    "Pó de Café 500g",
    "Macarrão 500g",
    "Farinha de trigo 1kg",
    "Leite UHT 1L",
    "Margarina 500g",
    "Banana 1kg",
    "Batata Inglesa 1kg",
    "Carne bovina contra filé 1kg",
    "Frango inteiro congelado 1kg",
];

#[derive(Debug, Clone, PartialEq)]
pub struct EssentialCatalog {
    items: Vec<String>,
}

impl EssentialCatalog {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Canonical item matching `term`, if any.
    pub fn resolve(&self, term: &str) -> Option<&str> {
        let wanted = fold(term);
        if wanted.is_empty() {
            return None;
        }
        self.items
            .iter()
            .find(|item| fold(item) == wanted)
            .map(String::as_str)
    }
}

impl Default for EssentialCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_ESSENTIAL_ITEMS)
    }
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
