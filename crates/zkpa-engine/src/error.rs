//! # Engine Error Types
//!
//! The engine's error vocabulary. Validation errors surface to the caller
//! before any state is persisted; processing errors transition the
//! attestation to the appropriate terminal failure state and are visible
//! via the read path. The pipeline never panics on malformed external
//! responses — it classifies and records.

use thiserror::Error;

/// Errors produced by the attestation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Syntactic or semantic validation failure before state is created.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The referenced attestation or receipt does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (identifier collision).
    /// Idempotency race losers do NOT see this error — they are handed
    /// the winner's record instead.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lifecycle transition outside the permitted relation.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State the attestation was in.
        from: String,
        /// State the caller attempted to reach.
        to: String,
    },

    /// Evidence failed validation (empty list, malformed digest, oversized
    /// reference). Carries positional detail where applicable.
    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),

    /// Proof generation or proof verification machinery failed.
    #[error("proof failure: {0}")]
    ProofFailure(String),

    /// Package signing or signature recomputation failed.
    #[error("signature failure: {0}")]
    SignatureFailure(String),

    /// Processing was cancelled at a step boundary.
    #[error("cancelled")]
    Cancelled,

    /// Unclassified internal failure. Details are logged, not surfaced.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<zkpa_core::CanonicalizationError> for EngineError {
    fn from(err: zkpa_core::CanonicalizationError) -> Self {
        Self::Internal(format!("canonicalization: {err}"))
    }
}

impl From<zkpa_crypto::CryptoError> for EngineError {
    fn from(err: zkpa_crypto::CryptoError) -> Self {
        Self::Internal(format!("crypto: {err}"))
    }
}
