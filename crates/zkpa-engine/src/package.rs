//! # Package Assembler — ZKPA-v1.1
//!
//! Assembles, canonicalizes, hashes, and signs the attestation package.
//!
//! The package schema is fixed: `{protocol: "zkpa", version: "1.1",
//! attestation_id, evidence, proof, metadata}`. The canonical form sorts
//! top-level and nested keys; signing operates on the canonical-bytes
//! digest, never on the object. The typed summaries carry digests and
//! counts only — there is no field that could hold raw evidence bytes,
//! and the `data:` URI guard in the evidence layer closes the reference
//! channel as well.

use zkpa_core::{sha256_digest, CanonicalBytes, Timestamp};
use zkpa_crypto::SigningKey;

use crate::attestation::{
    AttestationMetadata, EvidenceRecord, EvidenceSummary, PackageDocument, PackageMetadataDoc,
    PackageRecord, ProofRecord, ProofSummary, SignatureBlock,
};
use crate::error::EngineError;

/// Protocol constant stamped on every package.
pub const PROTOCOL: &str = "zkpa";
/// Schema version constant.
pub const VERSION: &str = "1.1";

/// Assemble and sign a package for an attestation.
pub fn assemble(
    attestation_id: &str,
    evidence: &EvidenceRecord,
    proof: &ProofRecord,
    metadata: &AttestationMetadata,
    signer: &SigningKey,
) -> Result<PackageRecord, EngineError> {
    let document = PackageDocument {
        protocol: PROTOCOL.to_string(),
        version: VERSION.to_string(),
        attestation_id: attestation_id.to_string(),
        evidence: EvidenceSummary {
            merkle_root: evidence.merkle_root.clone(),
            commitment_hash: evidence.commitment_hash.clone(),
            leaf_count: evidence.leaf_count,
        },
        proof: ProofSummary {
            algorithm: proof.algorithm.clone(),
            proof_digest: proof.proof_digest.clone(),
            public_inputs: proof.public_inputs.clone(),
            size: proof.size,
        },
        metadata: PackageMetadataDoc {
            policy: metadata.policy.clone(),
            issued_at: metadata.issued_at.to_iso8601(),
            valid_until: metadata.valid_until.to_iso8601(),
            issuer: metadata.issuer.clone(),
        },
    };

    let canonical = CanonicalBytes::new(&document)
        .map_err(|e| EngineError::SignatureFailure(format!("canonicalization: {e}")))?;
    let digest = sha256_digest(&canonical);
    let signature = signer.sign_digest(&digest);

    Ok(PackageRecord {
        document,
        package_hash: digest.to_hex(),
        signature: SignatureBlock {
            algorithm: "Ed25519".to_string(),
            value: signature,
            signer_public_key: signer.verifying_key(),
            signed_at: Timestamp::now(),
        },
        package_uri: None,
    })
}

/// Recompute the canonical package bytes and verify the stored signature
/// against the stored public key.
///
/// Returns `Ok(false)` when either the digest no longer matches the
/// document or the signature fails; errors only on canonicalization
/// failure.
pub fn verify_signature(package: &PackageRecord) -> Result<bool, EngineError> {
    let canonical = CanonicalBytes::new(&package.document)
        .map_err(|e| EngineError::SignatureFailure(format!("canonicalization: {e}")))?;
    let digest = sha256_digest(&canonical);
    if digest.to_hex() != package.package_hash {
        return Ok(false);
    }
    Ok(package
        .signature
        .signer_public_key
        .verify_digest(&digest, &package.signature.value))
}
