//! `cesta search`: run one aggregated search from the command line.

use anyhow::Result;

use crate::aggregate::{Aggregator, SearchOutcome, SearchResults};
use crate::config::Config;

pub async fn run_search(config: &Config, term: &str, json: bool) -> Result<()> {
    let aggregator = Aggregator::from_config(config).await?;
    let outcome = aggregator.search(term).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) {
    let label = outcome.item.as_deref().unwrap_or(&outcome.query);
    let origin = if outcome.cached { "cached" } else { "fresh" };
    println!(
        "{} ({}, {} products)",
        label,
        origin,
        outcome.results.total()
    );
    if let Some(warning) = &outcome.warning {
        println!("warning: {}", warning);
    }

    match &outcome.results {
        SearchResults::Fresh(results) => {
            for (source, products) in results {
                println!("\n[{}] {} products", source, products.len());
                for p in products {
                    println!(
                        "  R$ {:>8.2}  {:<60} {}",
                        p.price,
                        truncate(&p.name, 60),
                        p.link
                    );
                }
            }
        }
        SearchResults::Cached(results) => {
            for (source, products) in results {
                println!("\n[{}] {} products", source, products.len());
                for p in products {
                    println!("  R$ {:>8.2}  {}", p.price, p.name);
                }
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max - 3).collect();
        format!("{}...", cut)
    }
}
