//! # zkpa-api entry point
//!
//! Reads configuration from the environment once, starts the pipeline,
//! and serves the router.
//!
//! Environment:
//! - `ZKPA_BIND` — listen address (default `0.0.0.0:8080`).
//! - `ZKPA_SIGNING_SEED_HEX` — 64-hex Ed25519 seed; an ephemeral key is
//!   generated (and flagged in the logs) when absent.
//! - `ZKPA_ISSUER` — issuer identifier for package metadata.
//! - `ZKPA_FAST_DEMO` — `true` inserts short inter-step waits.
//! - `ZKPA_DEMO_MODE` — `true` enables `/demo/*`.
//! - `ZKPA_MOCK_LEDGER` — `true` anchors against the in-process mock.
//! - `DATABASE_URL` — optional Postgres snapshots.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use zkpa_api::state::AppState;
use zkpa_crypto::SigningKey;
use zkpa_engine::anchor::{LedgerAdapter, MockLedger};
use zkpa_engine::{AttestationPipeline, EngineConfig, MemoryStore};

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let signer = match std::env::var("ZKPA_SIGNING_SEED_HEX") {
        Ok(seed_hex) => Arc::new(SigningKey::from_seed_hex(&seed_hex)?),
        Err(_) => {
            tracing::warn!(
                "ZKPA_SIGNING_SEED_HEX not set — using an ephemeral signing key. \
                 Signatures will not be stable across restarts."
            );
            Arc::new(SigningKey::generate())
        }
    };
    tracing::info!(issuer_public_key = %signer.verifying_key().to_hex(), "signer initialized");

    let mut config = EngineConfig::default();
    if let Ok(issuer) = std::env::var("ZKPA_ISSUER") {
        config.issuer = issuer;
    }
    config.fast_demo = env_flag("ZKPA_FAST_DEMO");
    config.demo_mode = env_flag("ZKPA_DEMO_MODE");

    let ledger: Option<Arc<dyn LedgerAdapter>> = if env_flag("ZKPA_MOCK_LEDGER") {
        tracing::info!("anchoring against the in-process mock ledger");
        Some(MockLedger::shared())
    } else {
        tracing::info!("no ledger adapter configured — anchoring skipped");
        None
    };

    let db = zkpa_api::db::init_pool().await?;

    let pipeline = AttestationPipeline::start(
        config,
        Arc::new(MemoryStore::new()),
        signer,
        None,
        ledger,
    );
    let state = AppState::new(pipeline, db);

    let bind = std::env::var("ZKPA_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "zkpa-api listening");

    axum::serve(listener, zkpa_api::app(state)).await?;
    Ok(())
}
