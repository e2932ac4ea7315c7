//! # Engine Configuration
//!
//! Explicit configuration threaded into the pipeline façade at
//! construction. There are no ambient globals: the signer and the sweeper
//! tasks are the only singletons, and both are declared at startup.

/// Configuration for the attestation pipeline engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Issuer identifier recorded in package metadata.
    pub issuer: String,
    /// Validity window applied at issuance: `valid_until = issued_at +
    /// validity_period_secs`. Deployment-level knob, not per-request.
    pub validity_period_secs: i64,
    /// Attestation worker pool size.
    pub worker_count: usize,
    /// Webhook delivery pool size.
    pub webhook_worker_count: usize,
    /// Insert ~50 ms waits between pipeline steps so demos can observe
    /// state progression. Normal mode runs with no artificial delay.
    pub fast_demo: bool,
    /// Enables the administrative reset surface.
    pub demo_mode: bool,
    /// Ledger chain name recorded on anchor records.
    pub chain: String,
    /// Ledger network name recorded on anchor records.
    pub network: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            issuer: "zkpa-issuer".to_string(),
            validity_period_secs: 90 * 24 * 60 * 60,
            worker_count: 8,
            webhook_worker_count: 2,
            fast_demo: false,
            demo_mode: false,
            chain: "algorand".to_string(),
            network: "testnet".to_string(),
        }
    }
}
