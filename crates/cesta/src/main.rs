//! # Cesta CLI (`cesta`)
//!
//! ## Usage
//!
//! ```bash
//! cesta --config ./config/cesta.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cesta init` | Create the SQLite database and schema |
//! | `cesta sources` | List configured supermarket sources |
//! | `cesta search "<term>"` | Search every source (served from today's cache when possible) |
//! | `cesta serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! cesta init --config ./config/cesta.toml
//! cesta search "Arroz 5kg" --config ./config/cesta.toml
//! cesta search "sabão em pó" --json --config ./config/cesta.toml
//! cesta serve --config ./config/cesta.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use cesta::aggregate::Aggregator;
use cesta::{config, http, logging, migrate, search, server, sources, traits};

/// Cesta: multi-source grocery price search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cesta.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cesta",
    about = "Cesta: search grocery prices across several supermarkets at once",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cesta.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `search_results` table.
    /// Running it multiple times is safe.
    Init,

    /// List configured sources.
    Sources,

    /// Search every source for a term.
    ///
    /// Serves today's cached snapshot when one exists for the same item or
    /// term; otherwise fetches, saves and prints fresh results.
    Search {
        /// Free text or an essential item such as "Arroz 5kg".
        term: String,

        /// Print the raw JSON response instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            let fetcher = http::HttpFetcher::new(&cfg.http)?;
            let registry = traits::SourceRegistry::from_config(&cfg, &fetcher)?;
            sources::list_sources(&registry);
        }
        Commands::Search { term, json } => {
            search::run_search(&cfg, &term, json).await?;
        }
        Commands::Serve => {
            let aggregator = Arc::new(Aggregator::from_config(&cfg).await?);
            server::run_server(&cfg, aggregator).await?;
        }
    }

    Ok(())
}
