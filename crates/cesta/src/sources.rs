//! Source listing for `cesta sources` and `GET /api/sources`.

use serde::Serialize;

use crate::traits::{SourceKind, SourceRegistry};

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub kind: SourceKind,
    pub description: String,
    pub origin: String,
}

pub fn get_sources(registry: &SourceRegistry) -> Vec<SourceStatus> {
    registry
        .sources()
        .iter()
        .map(|source| SourceStatus {
            name: source.name().to_string(),
            kind: source.kind(),
            description: source.description().to_string(),
            origin: source.site().origin().to_string(),
        })
        .collect()
}

pub fn list_sources(registry: &SourceRegistry) {
    println!("{:<16} {:<12} {:<36} DESCRIPTION", "SOURCE", "KIND", "ORIGIN");
    for status in get_sources(registry) {
        println!(
            "{:<16} {:<12} {:<36} {}",
            status.name,
            status.kind.as_str(),
            status.origin,
            status.description
        );
    }
}
