//! HTTP server.
//!
//! Exposes the aggregated search as a JSON HTTP API for the price-comparison
//! front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/search-external?term=...` | Aggregated search across all sources |
//! | `GET`  | `/api/sources` | Configured sources |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "term must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser front end
//! can be served from anywhere.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aggregate::{AggregateError, Aggregator, SearchOutcome};
use crate::config::Config;
use crate::sources::{get_sources, SourceStatus};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    aggregator: Arc<Aggregator>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config, aggregator: Arc<Aggregator>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let source_count = aggregator.registry().len();

    let app = router(aggregator);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, sources = source_count, "cesta server listening");
    println!("Cesta server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router. Exposed so tests can serve it on an ephemeral port.
pub fn router(aggregator: Arc<Aggregator>) -> Router {
    let state = AppState { aggregator };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search-external", get(handle_search))
        .route("/api/sources", get(handle_sources))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<AggregateError> for AppError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::EmptyTerm => bad_request(err.to_string()),
            AggregateError::NoSources => internal(err.to_string()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
}

async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: get_sources(state.aggregator.registry()),
    })
}

// ============ GET /api/search-external ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    term: Option<String>,
}

/// Handler for `GET /api/search-external`.
///
/// Returns `400` when `term` is missing, blank or malformed and `500` when
/// no source is configured. Individual source failures never fail the
/// request.
async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchOutcome>, AppError> {
    let Query(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;
    let term = params
        .term
        .filter(|term| !term.trim().is_empty())
        .ok_or_else(|| bad_request("term must not be empty"))?;

    let outcome = state.aggregator.search(&term).await?;
    Ok(Json(outcome))
}
