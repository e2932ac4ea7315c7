//! # Verification API
//!
//! Runs verification checks against an attestation and serves stored
//! receipts.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use zkpa_core::{AttestationId, ReceiptId};
use zkpa_engine::{CheckName, VerificationReceipt};

use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Verification request body. Omitted `checks` means all six.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Target attestation.
    pub attestation_id: String,
    /// Requested checks; defaults to the full set.
    #[serde(default)]
    pub checks: Option<Vec<CheckName>>,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.attestation_id.trim().is_empty() {
            return Err("attestation_id must not be empty".to_string());
        }
        if let Some(checks) = &self.checks {
            if checks.is_empty() {
                return Err("checks must not be an empty list".to_string());
            }
        }
        Ok(())
    }
}

/// Router for `/verify`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify_attestation))
        .route("/verify/{receipt_id}", get(get_receipt))
}

/// POST /verify — run checks and mint a signed receipt.
#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification receipt", body = VerificationReceipt),
        (status = 404, description = "Unknown attestation"),
    ),
    tag = "verification"
)]
pub async fn verify_attestation(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationReceipt>, AppError> {
    let request = extract_validated_json(payload)?;
    let id = AttestationId::parse(&request.attestation_id)
        .map_err(|_| AppError::NotFound(format!("attestation {}", request.attestation_id)))?;
    let checks = request.checks.unwrap_or_else(CheckName::all);

    let receipt = state.pipeline.verify(&id, &checks).await?;
    if let Some(pool) = &state.db {
        db::persist_receipt(pool, &receipt).await;
    }
    Ok(Json(receipt))
}

/// GET /verify/{receipt_id} — a stored receipt.
#[utoipa::path(
    get,
    path = "/verify/{receipt_id}",
    responses(
        (status = 200, description = "The stored receipt", body = VerificationReceipt),
        (status = 404, description = "Unknown receipt"),
    ),
    tag = "verification"
)]
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<String>,
) -> Result<Json<VerificationReceipt>, AppError> {
    let id = ReceiptId::parse(&receipt_id)
        .map_err(|_| AppError::NotFound(format!("receipt {receipt_id}")))?;
    Ok(Json(state.pipeline.get_receipt(&id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_request_validation() {
        let ok = VerifyRequest {
            attestation_id: "ATT-20260101000000-abcdef".into(),
            checks: None,
        };
        assert!(ok.validate().is_ok());

        let blank = VerifyRequest {
            attestation_id: "  ".into(),
            checks: None,
        };
        assert!(blank.validate().is_err());

        let empty_checks = VerifyRequest {
            attestation_id: "ATT-20260101000000-abcdef".into(),
            checks: Some(vec![]),
        };
        assert!(empty_checks.validate().is_err());
    }
}
