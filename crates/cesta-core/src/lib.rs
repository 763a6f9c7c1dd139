//! # Cesta Core
//!
//! Runtime-free logic for Cesta: the product model, the raw shapes returned
//! by supermarket upstreams, pure extraction strategies, normalization,
//! deduplication, relevance filtering, the essential-item catalog and the
//! search store abstraction.
//!
//! This crate contains no tokio, sqlx or HTTP client dependencies. Network
//! access, persistence backends and orchestration live in the `cesta` crate.
//!
//! ## Per-source pipeline
//!
//! ```text
//! upstream body ──▶ extract ──▶ normalize ──▶ dedupe ──▶ relevance ──▶ [Product]
//!   (JSON/HTML)     RawRecord    Product       first-seen   every term
//!                                              order kept   word matches
//! ```

pub mod cache;
pub mod dedup;
pub mod essentials;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod records;
pub mod relevance;
pub mod store;

pub use models::{Product, ProductsBySource, SearchRecord, StoredBySource, StoredProduct};
pub use records::RawRecord;
