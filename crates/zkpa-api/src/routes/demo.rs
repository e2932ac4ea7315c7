//! # Demo Surface
//!
//! Administrative reset and store statistics, available only when the
//! deployment runs in demo mode.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use zkpa_engine::StoreStats;

use crate::error::AppError;
use crate::state::AppState;

/// Router for `/demo`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/demo/reset", post(reset))
        .route("/demo/stats", get(stats))
}

fn require_demo_mode(state: &AppState) -> Result<(), AppError> {
    if !state.demo_mode() {
        return Err(AppError::Forbidden(
            "demo surface is disabled in this deployment".to_string(),
        ));
    }
    Ok(())
}

/// POST /demo/reset — clear all state.
pub async fn reset(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    require_demo_mode(&state)?;
    state.pipeline.reset();
    Ok(Json(state.pipeline.stats()))
}

/// GET /demo/stats — container sizes.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    require_demo_mode(&state)?;
    Ok(Json(state.pipeline.stats()))
}
