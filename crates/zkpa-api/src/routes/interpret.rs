//! # Control Interpretation API
//!
//! Stateless interpretation of a control statement: claim type, proof
//! template, risk level, and required evidence kinds.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use zkpa_engine::Interpretation;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Interpretation request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InterpretRequest {
    /// The control statement text.
    pub control_statement: String,
    /// The framework tag (e.g. "NIST 800-53").
    pub framework: String,
    /// Optional control identifier.
    #[serde(default)]
    pub control_id: Option<String>,
}

impl Validate for InterpretRequest {
    fn validate(&self) -> Result<(), String> {
        if self.control_statement.trim().is_empty() {
            return Err("control_statement must not be empty".to_string());
        }
        if self.framework.trim().is_empty() {
            return Err("framework must not be empty".to_string());
        }
        if self.control_statement.len() > 10_000 {
            return Err("control_statement must not exceed 10000 characters".to_string());
        }
        Ok(())
    }
}

/// Router for `/control`.
pub fn router() -> Router<AppState> {
    Router::new().route("/control/interpret", post(interpret_control))
}

/// POST /control/interpret.
#[utoipa::path(
    post,
    path = "/control/interpret",
    request_body = InterpretRequest,
    responses(
        (status = 200, description = "The interpretation", body = Interpretation),
        (status = 422, description = "Invalid request"),
    ),
    tag = "interpretation"
)]
pub async fn interpret_control(
    State(state): State<AppState>,
    payload: Result<Json<InterpretRequest>, JsonRejection>,
) -> Result<Json<Interpretation>, AppError> {
    let request = extract_validated_json(payload)?;
    let interpretation = state
        .pipeline
        .interpret(
            &request.control_statement,
            &request.framework,
            request.control_id.as_deref(),
        )
        .await;
    Ok(Json(interpretation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpret_request_validation() {
        let ok = InterpretRequest {
            control_statement: "accounts are managed".into(),
            framework: "NIST 800-53".into(),
            control_id: Some("AC-2".into()),
        };
        assert!(ok.validate().is_ok());

        let blank = InterpretRequest {
            control_statement: String::new(),
            framework: "NIST 800-53".into(),
            control_id: None,
        };
        assert!(blank.validate().is_err());
    }
}
