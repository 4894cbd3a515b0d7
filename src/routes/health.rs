// src/routes/health.rs
//! Liveness endpoint for the coverage-map backend.
//!
//! `/health` lets orchestrators and CI verify the service is up without
//! touching the database, the network server, or the ingestion pipeline.
//! Like the other route modules it only exports a subrouter; the gateway in
//! `mod.rs` merges it so `main.rs` never sees individual endpoints.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges cleanly with the gateway
/// router regardless of the state type (here `(PgPool, Config)`).
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
