//! # Cesta
//!
//! **Multi-source grocery price search.**
//!
//! Cesta queries several supermarket sites in parallel for one search term,
//! normalizes what they return into a common product shape, and keeps one
//! snapshot per search per day so repeated searches are served from the
//! database instead of hitting the sites again.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │   Sources   │──▶│ Extract → Normalize  │──▶│  SQLite  │
//! │ API / HTML  │   │ → Dedupe → Relevance │   │ snapshots│
//! └─────────────┘   └──────────────────────┘   └────┬─────┘
//!                                                   │
//!                      ┌────────────────────────────┤
//!                      ▼                            ▼
//!                 ┌──────────┐                ┌──────────┐
//!                 │   CLI    │                │   HTTP   │
//!                 │ (cesta)  │                │  (axum)  │
//!                 └──────────┘                └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML configuration and validation |
//! | [`logging`] | tracing subscriber setup |
//! | [`http`] | shared HTTP client and fetch errors |
//! | [`traits`] | `Source` trait and registry |
//! | [`source_catalog`], [`source_storefront`] | concrete site sources |
//! | [`aggregate`] | fan-out, cache lookup and persistence |
//! | [`db`], [`migrate`], [`sqlite_store`] | SQLite persistence |
//! | [`server`] | HTTP API |
//!
//! The runtime-free pieces (parsing, normalization, dedup, relevance, the
//! store trait) live in `cesta-core`.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod http;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod server;
pub mod source_catalog;
pub mod source_storefront;
pub mod sources;
pub mod sqlite_store;
pub mod traits;
