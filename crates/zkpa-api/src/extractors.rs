//! # Request Validation Extractors
//!
//! JSON extraction with a `Validate` pass between deserialization and the
//! handler. Deserialization failures are 422 with the serde message;
//! validation failures are 422 with the rule that was violated.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request types that carry their own validation rules.
pub trait Validate {
    /// Check semantic validity; return the violated rule on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON extraction result and run the payload's validation.
pub fn extract_validated_json<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = payload.map_err(|rejection| {
        AppError::Validation(format!("request body rejected: {rejection}"))
    })?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
