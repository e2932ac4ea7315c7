//! # OpenAPI Document
//!
//! Auto-generated OpenAPI 3.1 description of the core surface via utoipa
//! derive macros, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// The OpenAPI document for the attestation API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ZKPA Attestation API",
        description = "Privacy-preserving compliance attestation pipeline",
        version = "1.1"
    ),
    paths(
        crate::routes::attestations::create_attestation,
        crate::routes::attestations::get_attestation,
        crate::routes::attestations::list_attestations,
        crate::routes::verification::verify_attestation,
        crate::routes::verification::get_receipt,
        crate::routes::interpret::interpret_control,
    ),
    tags(
        (name = "attestations", description = "Attestation lifecycle"),
        (name = "verification", description = "Verification receipts"),
        (name = "interpretation", description = "Control interpretation"),
    )
)]
pub struct ApiDoc;

/// Router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_lists_core_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/attestations"));
        assert!(paths.iter().any(|p| p.as_str() == "/verify"));
        assert!(paths.iter().any(|p| p.as_str() == "/control/interpret"));
    }
}
