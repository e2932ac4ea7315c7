//! # Attestation Operations API
//!
//! Create, read, list, download, revoke, and cancel attestations. The
//! create path accepts the `Idempotency-Key` header and records the
//! optional `X-Principal` header as issuer metadata (no authorization
//! semantics are attached to it).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkpa_core::AttestationId;
use zkpa_engine::status::StatusEvent;
use zkpa_engine::{Attestation, AttestationStatus, CreateAttestationRequest, CreateResponse};

use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Pagination and filter parameters for the list endpoint.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ListParams {
    /// Maximum number of items to return (default 50, max 200).
    pub limit: Option<usize>,
    /// Number of items to skip (default 0).
    pub offset: Option<usize>,
    /// Optional status filter (wire name, e.g. "valid").
    pub status: Option<String>,
}

impl ListParams {
    const DEFAULT_LIMIT: usize = 50;
    const MAX_LIMIT: usize = 200;

    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT)
    }
}

/// List response envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    /// The page of attestations.
    pub attestations: Vec<Attestation>,
    /// Number of items in this page.
    pub count: usize,
    /// Applied limit.
    pub limit: usize,
    /// Applied offset.
    pub offset: usize,
}

/// Revocation request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeRequest {
    /// Why the attestation is being revoked.
    pub reason: String,
}

impl Validate for RevokeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        if self.reason.len() > 1024 {
            return Err("reason must not exceed 1024 characters".to_string());
        }
        Ok(())
    }
}

impl Validate for CreateAttestationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.evidence.len() > 10_000 {
            return Err("evidence list must not exceed 10000 items".to_string());
        }
        if self.control.statement.len() > 10_000 {
            return Err("control.statement must not exceed 10000 characters".to_string());
        }
        // Field-level rules (digest syntax, URI length, empty list) are
        // enforced by the engine so the CLI shares them.
        Ok(())
    }
}

/// Router for `/attestations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attestations", post(create_attestation).get(list_attestations))
        .route("/attestations/{id}", get(get_attestation))
        .route("/attestations/{id}/events", get(get_events))
        .route("/attestations/{id}/download", get(download_attestation))
        .route("/attestations/{id}/revoke", post(revoke_attestation))
        .route("/attestations/{id}/cancel", post(cancel_attestation))
}

fn parse_id(raw: &str) -> Result<AttestationId, AppError> {
    AttestationId::parse(raw).map_err(|_| AppError::NotFound(format!("attestation {raw}")))
}

/// POST /attestations — create an attestation.
#[utoipa::path(
    post,
    path = "/attestations",
    request_body = CreateAttestationRequest,
    responses(
        (status = 201, description = "Attestation accepted", body = CreateResponse),
        (status = 400, description = "Malformed evidence"),
        (status = 409, description = "Identifier collision exhaustion"),
        (status = 422, description = "Empty evidence or invalid request"),
    ),
    tag = "attestations"
)]
pub async fn create_attestation(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateAttestationRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = extract_validated_json(payload)?;
    let idempotency_key = header_string(&headers, "idempotency-key");
    let principal = header_string(&headers, "x-principal");

    let response = state
        .pipeline
        .create(request, idempotency_key.clone(), principal)
        .await?;

    if let Some(pool) = &state.db {
        if let Ok(att) = state.pipeline.get(&response.claim_id) {
            db::persist_attestation(pool, &att).await;
        }
        if let Some(key) = &idempotency_key {
            let expires = response.created_at.plus_seconds(zkpa_engine::store::IDEMPOTENCY_TTL_SECS);
            db::persist_idempotency(pool, key, response.claim_id.as_str(), *expires.as_datetime())
                .await;
        }
    }

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// GET /attestations/{id} — full attestation record.
#[utoipa::path(
    get,
    path = "/attestations/{id}",
    responses(
        (status = 200, description = "The attestation", body = Attestation),
        (status = 404, description = "Unknown attestation"),
    ),
    tag = "attestations"
)]
pub async fn get_attestation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Attestation>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.pipeline.get(&id)?))
}

/// GET /attestations — paginated listing.
#[utoipa::path(
    get,
    path = "/attestations",
    responses(
        (status = 200, description = "Attestation page", body = ListResponse),
        (status = 422, description = "Unknown status filter"),
    ),
    tag = "attestations"
)]
pub async fn list_attestations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let status = match &params.status {
        Some(raw) => Some(AttestationStatus::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("unknown status filter: {raw}"))
        })?),
        None => None,
    };
    let limit = params.effective_limit();
    let offset = params.offset.unwrap_or(0);
    let attestations = state.pipeline.list(status, limit, offset);
    Ok(Json(ListResponse {
        count: attestations.len(),
        attestations,
        limit,
        offset,
    }))
}

/// GET /attestations/{id}/events — the bounded lifecycle event log.
pub async fn get_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusEvent>>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.pipeline.get(&id)?.events))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    format: Option<String>,
}

/// GET /attestations/{id}/download?format=json|oscal — the signed
/// package or its OSCAL rendering, served as an attachment.
pub async fn download_attestation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let format = params.format.as_deref().unwrap_or("json");
    let (document, filename) = match format {
        "json" => (
            state.pipeline.download_json(&id)?,
            format!("{id}.zkpa.json"),
        ),
        "oscal" => (
            state.pipeline.download_oscal(&id)?,
            format!("{id}.oscal.json"),
        ),
        other => {
            return Err(AppError::Validation(format!(
                "unsupported download format: {other} (expected json or oscal)"
            )))
        }
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Json(document),
    )
        .into_response())
}

/// POST /attestations/{id}/revoke — revoke a valid attestation.
pub async fn revoke_attestation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<Attestation>, AppError> {
    let id = parse_id(&id)?;
    let request = extract_validated_json(payload)?;
    let principal = header_string(&headers, "x-principal");
    let revoked = state.pipeline.revoke(&id, request.reason, principal)?;

    if let Some(pool) = &state.db {
        db::persist_attestation(pool, &revoked).await;
    }
    Ok(Json(revoked))
}

/// POST /attestations/{id}/cancel — cooperative cancellation.
pub async fn cancel_attestation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    state.pipeline.cancel(&id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "claim_id": id.as_str(),
            "status": "cancellation_requested",
        })),
    )
        .into_response())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}
