//! # Application State
//!
//! Shared state handed to every handler: the pipeline façade, the
//! optional Postgres pool, and the deployment flags that gate the demo
//! surface.

use std::sync::Arc;

use sqlx::PgPool;

use zkpa_engine::AttestationPipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The attestation pipeline façade.
    pub pipeline: Arc<AttestationPipeline>,
    /// Optional Postgres snapshot persistence.
    pub db: Option<PgPool>,
}

impl AppState {
    /// Assemble state from a started pipeline and an optional pool.
    pub fn new(pipeline: Arc<AttestationPipeline>, db: Option<PgPool>) -> Self {
        Self { pipeline, db }
    }

    /// Whether the demo surface (reset/stats) is enabled.
    pub fn demo_mode(&self) -> bool {
        self.pipeline.config().demo_mode
    }
}
