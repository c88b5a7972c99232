//! HTTP server exposing the discovery engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Execute a search request |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query text must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::engine::SearchEngine;
use crate::error::SearchError;
use crate::models::{SearchQuery, SearchResponse};

/// Starts the HTTP server with backends built from configuration.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(SearchEngine::from_config(config)?);
    run_server_with_engine(config, engine).await
}

/// Starts the HTTP server around an already-assembled engine.
///
/// Used by tests and embedders that inject their own backends.
pub async fn run_server_with_engine(
    config: &Config,
    engine: Arc<SearchEngine>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(engine).layer(cors);

    tracing::info!(addr = %bind_addr, "search server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The route table, separated so tests can drive it without binding a socket.
pub fn router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .with_state(engine)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(_) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request",
                message: err.to_string(),
            },
            SearchError::Upstream { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error",
                message: err.to_string(),
            },
        }
    }
}

// ============ POST /search ============

/// Handler for `POST /search`.
async fn handle_search(
    State(engine): State<Arc<SearchEngine>>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let response = engine.execute(query).await?;
    Ok(Json(response))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
