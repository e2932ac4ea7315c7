//! # Sample Controls API
//!
//! Serves the pre-defined control catalog and the one-call quick-attest
//! flow that synthesizes deterministic evidence for a catalog control.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use zkpa_engine::samples;

use crate::error::AppError;
use crate::state::AppState;

/// Optional quick-attest body.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuickAttestRequest {
    /// Webhook target for status changes.
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Router for `/samples`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/samples/controls", get(list_controls))
        .route("/samples/controls/{control_id}", get(get_control))
        .route("/samples/quick-attest/{control_id}", post(quick_attest))
}

/// GET /samples/controls?q= — the catalog, optionally filtered.
pub async fn list_controls(Query(params): Query<SearchParams>) -> Json<serde_json::Value> {
    let controls: Vec<&samples::SampleControl> = match &params.q {
        Some(query) => samples::search(query),
        None => samples::SAMPLE_CONTROLS.iter().collect(),
    };
    Json(serde_json::json!({
        "controls": controls,
        "count": controls.len(),
    }))
}

/// GET /samples/controls/{control_id}.
pub async fn get_control(
    Path(control_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let control = samples::control_by_id(&control_id)
        .ok_or_else(|| AppError::NotFound(format!("sample control {control_id}")))?;
    Ok(Json(serde_json::json!({
        "control": control,
        "quick_attest_url": format!("/samples/quick-attest/{control_id}"),
    })))
}

/// POST /samples/quick-attest/{control_id} — one-call demo attestation.
pub async fn quick_attest(
    State(state): State<AppState>,
    Path(control_id): Path<String>,
    payload: Result<Json<QuickAttestRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    // The body is optional; an absent or empty body means no callback.
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let response = state
        .pipeline
        .quick_attest(&control_id, request.callback_url)
        .await?;
    Ok((StatusCode::CREATED, Json(response)).into_response())
}
