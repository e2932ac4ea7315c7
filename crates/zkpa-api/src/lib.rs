//! # zkpa-api — Axum HTTP Surface for the Attestation Pipeline
//!
//! Exposes the pipeline façade over HTTP:
//!
//! | Route | Module | Purpose |
//! |---|---|---|
//! | `POST /attestations` | [`routes::attestations`] | Create (with `Idempotency-Key`) |
//! | `GET /attestations` | [`routes::attestations`] | List (limit ≤ 200) |
//! | `GET /attestations/{id}` | [`routes::attestations`] | Full record |
//! | `GET /attestations/{id}/events` | [`routes::attestations`] | Lifecycle log |
//! | `GET /attestations/{id}/download` | [`routes::attestations`] | Package / OSCAL |
//! | `POST /attestations/{id}/revoke` | [`routes::attestations`] | Revoke |
//! | `POST /attestations/{id}/cancel` | [`routes::attestations`] | Cancel |
//! | `POST /verify` | [`routes::verification`] | Run checks, mint receipt |
//! | `GET /verify/{receipt_id}` | [`routes::verification`] | Stored receipt |
//! | `POST /control/interpret` | [`routes::interpret`] | Interpretation |
//! | `GET /samples/controls` | [`routes::samples`] | Catalog |
//! | `POST /samples/quick-attest/{id}` | [`routes::samples`] | One-call demo |
//! | `POST /demo/reset`, `GET /demo/stats` | [`routes::demo`] | Demo mode only |
//!
//! Health probes (`/health/*`) and `/openapi.json` are mounted alongside.

pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
///
/// Body size limit: 2 MiB — enough for 10^4 evidence references with
/// headroom, and a guard against oversized request bodies.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::attestations::router())
        .merge(routes::verification::router())
        .merge(routes::interpret::router())
        .merge(routes::samples::router())
        .merge(routes::demo::router())
        .merge(openapi::router())
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe — always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the signer and stores are functional and
/// the database (when configured) answers.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.pipeline.issuer_public_key().len() != 64 {
        return (StatusCode::SERVICE_UNAVAILABLE, "signer degraded").into_response();
    }

    // Store reachable.
    let _ = state.pipeline.stats();

    if let Some(pool) = &state.db {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
