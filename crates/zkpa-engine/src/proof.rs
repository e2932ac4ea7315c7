//! # Proof Builder
//!
//! Produces the proof artifact from the evidence commitment and the
//! interpreted claim, behind the [`ProofBackend`] trait so a real SNARK
//! prover can replace the shipped placeholder without touching the
//! pipeline.
//!
//! ## The `commitment-v1` placeholder
//!
//! **NOT PRIVATE.** The default backend is transparent: the artifact is
//! the canonical JSON of `{merkle_root, public_inputs, template, risk}`
//! and anyone can recompute it. It exists so the pipeline, package, and
//! verification layers exercise real bytes with a stable interface. A
//! production deployment substitutes a zero-knowledge backend that fixes
//! (prover, verifier, verification-key distribution) while preserving the
//! public-input layout and the algorithm-tag discipline.

use serde_json::json;

use zkpa_core::{sha256_digest, CanonicalBytes, Timestamp};
use zkpa_crypto::sha256_hex;

use crate::attestation::{ProofRecord, ProofTemplate, RiskLevel};
use crate::error::EngineError;

/// Inputs to proof generation.
#[derive(Debug, Clone)]
pub struct ProofContext<'a> {
    /// Merkle root over the evidence digests (64 hex chars).
    pub merkle_root: &'a str,
    /// The control statement text.
    pub statement: &'a str,
    /// The governing policy string.
    pub policy: &'a str,
    /// Chosen proof template.
    pub template: ProofTemplate,
    /// Control criticality.
    pub risk: RiskLevel,
}

/// Abstract proof backend.
///
/// `generate` and `verify` are pure with respect to the context and the
/// record: no side effects, no ambient state.
pub trait ProofBackend: Send + Sync {
    /// The algorithm tag stamped on produced records.
    fn algorithm(&self) -> &'static str;

    /// Produce a proof record for the given context.
    fn generate(&self, ctx: &ProofContext<'_>) -> Result<ProofRecord, EngineError>;

    /// Verify a previously produced record.
    fn verify(&self, record: &ProofRecord) -> Result<bool, EngineError>;
}

/// Compute the declared public inputs for a context:
/// `[merkle_root, SHA-256(statement_utf8), SHA-256(policy_utf8)]`.
pub fn public_inputs(merkle_root: &str, statement: &str, policy: &str) -> Vec<String> {
    vec![
        merkle_root.to_string(),
        sha256_hex(statement.as_bytes()),
        sha256_hex(policy.as_bytes()),
    ]
}

/// The transparent placeholder backend.
#[derive(Debug, Default)]
pub struct CommitmentV1;

impl CommitmentV1 {
    /// Algorithm tag of this backend.
    pub const ALGORITHM: &'static str = "commitment-v1";
}

impl ProofBackend for CommitmentV1 {
    fn algorithm(&self) -> &'static str {
        Self::ALGORITHM
    }

    fn generate(&self, ctx: &ProofContext<'_>) -> Result<ProofRecord, EngineError> {
        let inputs = public_inputs(ctx.merkle_root, ctx.statement, ctx.policy);
        let body = json!({
            "merkle_root": ctx.merkle_root,
            "public_inputs": inputs,
            "template": ctx.template,
            "risk": ctx.risk,
        });
        let canonical = CanonicalBytes::from_value(body)
            .map_err(|e| EngineError::ProofFailure(format!("canonicalization: {e}")))?;
        let proof_bytes = String::from_utf8(canonical.as_bytes().to_vec())
            .map_err(|e| EngineError::ProofFailure(format!("utf8: {e}")))?;
        let proof_digest = sha256_digest(&canonical).to_hex();

        Ok(ProofRecord {
            algorithm: Self::ALGORITHM.to_string(),
            size: proof_bytes.len(),
            proof_bytes,
            proof_digest,
            public_inputs: inputs,
            generated_at: Timestamp::now(),
        })
    }

    /// Re-canonicalize the artifact body and check digest equality, then
    /// cross-check the embedded public inputs against the declared ones.
    fn verify(&self, record: &ProofRecord) -> Result<bool, EngineError> {
        if record.algorithm != Self::ALGORITHM {
            return Err(EngineError::ProofFailure(format!(
                "algorithm mismatch: expected {}, got {}",
                Self::ALGORITHM,
                record.algorithm
            )));
        }
        let value: serde_json::Value = serde_json::from_str(&record.proof_bytes)
            .map_err(|e| EngineError::ProofFailure(format!("artifact is not JSON: {e}")))?;
        let canonical = CanonicalBytes::from_value(value.clone())
            .map_err(|e| EngineError::ProofFailure(format!("canonicalization: {e}")))?;
        if sha256_digest(&canonical).to_hex() != record.proof_digest {
            return Ok(false);
        }

        let embedded: Option<Vec<String>> = value
            .get("public_inputs")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        Ok(embedded.as_deref() == Some(record.public_inputs.as_slice()))
    }
}
