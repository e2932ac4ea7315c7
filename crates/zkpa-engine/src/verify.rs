//! # Verification Engine
//!
//! Runs a requested set of checks against a stored attestation and
//! produces a signed verification receipt. Verification is never
//! suppressed by errors: a check that cannot complete marks FAIL with the
//! reason in its detail string, and the receipt is produced regardless.
//!
//! Receipts are idempotent per request but not across time — every call
//! mints a fresh identifier and timestamp.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use zkpa_core::{AttestationId, CanonicalBytes, ReceiptId, Timestamp};
use zkpa_crypto::{sha256_hex, MerkleTree, SigningKey};

use crate::anchor::LedgerAdapter;
use crate::attestation::{Attestation, SignatureBlock};
use crate::error::EngineError;
use crate::package;
use crate::proof::{public_inputs, ProofBackend};
use crate::status::AttestationStatus;
use crate::store::StateStore;

/// The checks a caller may request. The default set is all six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    /// Proof digest and backend verification.
    ProofValidity,
    /// Merkle root recomputation from stored leaves.
    Integrity,
    /// Validity window check.
    Expiry,
    /// Revocation status.
    Revocation,
    /// Ledger anchor presence and (when possible) on-chain comparison.
    Anchor,
    /// Package signature recomputation.
    Signature,
}

impl CheckName {
    /// All six checks, in canonical order.
    pub fn all() -> Vec<CheckName> {
        vec![
            Self::ProofValidity,
            Self::Integrity,
            Self::Expiry,
            Self::Revocation,
            Self::Anchor,
            Self::Signature,
        ]
    }

    /// Wire name of the check.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProofValidity => "proof_validity",
            Self::Integrity => "integrity",
            Self::Expiry => "expiry",
            Self::Revocation => "revocation",
            Self::Anchor => "anchor",
            Self::Signature => "signature",
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckResult {
    /// Check passed.
    Pass,
    /// Check failed; fails the overall verification.
    Fail,
    /// Check could not be fully established; does not downgrade the
    /// overall result.
    Warn,
}

/// A named check outcome with its human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckOutcome {
    /// Which check ran.
    pub name: CheckName,
    /// The outcome.
    pub result: CheckResult,
    /// Explanation of the outcome.
    pub detail: String,
}

/// A signed verification receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationReceipt {
    /// Unique receipt identifier.
    #[schema(value_type = String)]
    pub receipt_id: ReceiptId,
    /// The verified attestation.
    #[schema(value_type = String)]
    pub attestation_id: AttestationId,
    /// FAIL iff any requested check failed.
    pub overall: CheckResult,
    /// Ordered check outcomes, as requested.
    pub checks: Vec<CheckOutcome>,
    /// When the verification ran.
    pub verified_at: Timestamp,
    /// Ed25519 signature over the receipt's canonical bytes (minus this
    /// block).
    pub signature: SignatureBlock,
}

/// Canonical byte rendering of a receipt minus its signature block.
pub fn receipt_canonical_bytes(
    receipt_id: &ReceiptId,
    attestation_id: &AttestationId,
    overall: CheckResult,
    checks: &[CheckOutcome],
    verified_at: Timestamp,
) -> Result<CanonicalBytes, EngineError> {
    let payload = json!({
        "receipt_id": receipt_id.as_str(),
        "attestation_id": attestation_id.as_str(),
        "overall": overall,
        "checks": checks,
        "verified_at": verified_at.to_iso8601(),
    });
    CanonicalBytes::from_value(payload).map_err(EngineError::from)
}

/// Verify the signature on a stored receipt.
pub fn verify_receipt_signature(receipt: &VerificationReceipt) -> Result<bool, EngineError> {
    let canonical = receipt_canonical_bytes(
        &receipt.receipt_id,
        &receipt.attestation_id,
        receipt.overall,
        &receipt.checks,
        receipt.verified_at,
    )?;
    Ok(receipt
        .signature
        .signer_public_key
        .verify_canonical(&canonical, &receipt.signature.value))
}

/// The verification engine.
pub struct VerificationEngine {
    store: Arc<dyn StateStore>,
    verifier_key: Arc<SigningKey>,
    backend: Arc<dyn ProofBackend>,
    ledger: Option<Arc<dyn LedgerAdapter>>,
}

impl VerificationEngine {
    /// Create a verification engine.
    pub fn new(
        store: Arc<dyn StateStore>,
        verifier_key: Arc<SigningKey>,
        backend: Arc<dyn ProofBackend>,
        ledger: Option<Arc<dyn LedgerAdapter>>,
    ) -> Self {
        Self {
            store,
            verifier_key,
            backend,
            ledger,
        }
    }

    /// Run the requested checks and mint a signed receipt.
    pub async fn verify(
        &self,
        attestation_id: &AttestationId,
        requested: &[CheckName],
    ) -> Result<VerificationReceipt, EngineError> {
        let att = self
            .store
            .get_attestation(attestation_id)
            .ok_or_else(|| EngineError::NotFound(format!("attestation {attestation_id}")))?;

        let mut checks = Vec::with_capacity(requested.len());
        for name in requested {
            let outcome = match name {
                CheckName::ProofValidity => self.check_proof(&att),
                CheckName::Integrity => check_integrity(&att),
                CheckName::Expiry => check_expiry(&att),
                CheckName::Revocation => check_revocation(&att),
                CheckName::Anchor => self.check_anchor(&att).await,
                CheckName::Signature => check_signature(&att),
            };
            checks.push(outcome);
        }

        let overall = if checks.iter().any(|c| c.result == CheckResult::Fail) {
            CheckResult::Fail
        } else {
            CheckResult::Pass
        };

        let receipt_id = ReceiptId::generate();
        let verified_at = Timestamp::now();
        let canonical =
            receipt_canonical_bytes(&receipt_id, attestation_id, overall, &checks, verified_at)?;
        let signature = self.verifier_key.sign_canonical(&canonical);

        let receipt = VerificationReceipt {
            receipt_id,
            attestation_id: attestation_id.clone(),
            overall,
            checks,
            verified_at,
            signature: SignatureBlock {
                algorithm: "Ed25519".to_string(),
                value: signature,
                signer_public_key: self.verifier_key.verifying_key(),
                signed_at: verified_at,
            },
        };
        self.store.put_receipt(receipt.clone());
        Ok(receipt)
    }

    /// Read a stored receipt.
    pub fn get_receipt(&self, id: &ReceiptId) -> Option<VerificationReceipt> {
        self.store.get_receipt(id)
    }

    fn check_proof(&self, att: &Attestation) -> CheckOutcome {
        let Some(proof) = &att.proof else {
            return fail(CheckName::ProofValidity, "no proof artifact present");
        };

        if sha256_hex(proof.proof_bytes.as_bytes()) != proof.proof_digest {
            return fail(
                CheckName::ProofValidity,
                "proof digest does not match artifact bytes",
            );
        }

        let expected_inputs = public_inputs(
            &att.evidence.merkle_root,
            &att.control.statement,
            &att.metadata.policy,
        );
        if expected_inputs != proof.public_inputs {
            return fail(
                CheckName::ProofValidity,
                "public inputs do not match recomputation",
            );
        }

        match self.backend.verify(proof) {
            Ok(true) => pass(CheckName::ProofValidity, "proof verified"),
            Ok(false) => fail(CheckName::ProofValidity, "backend rejected the proof"),
            Err(err) => fail(
                CheckName::ProofValidity,
                &format!("verifier could not run: {err}"),
            ),
        }
    }

    async fn check_anchor(&self, att: &Attestation) -> CheckOutcome {
        let Some(anchor) = &att.anchor else {
            return warn(CheckName::Anchor, "attestation is not anchored");
        };
        if let Some(error) = &anchor.error {
            return fail(CheckName::Anchor, &format!("anchor failed: {error}"));
        }

        let (Some(ledger), Some(tx_id), Some(note_digest)) = (
            self.ledger.as_ref(),
            anchor.transaction_id.as_ref(),
            anchor.note_digest.as_ref(),
        ) else {
            return warn(
                CheckName::Anchor,
                "anchor recorded but not independently verifiable",
            );
        };

        match ledger.lookup(tx_id).await {
            Ok(Some(note)) if &sha256_hex(&note) == note_digest => {
                pass(CheckName::Anchor, "anchor note matches on-chain record")
            }
            Ok(Some(_)) => fail(CheckName::Anchor, "on-chain note digest mismatch"),
            Ok(None) => fail(CheckName::Anchor, "transaction not found on ledger"),
            Err(err) => fail(CheckName::Anchor, &format!("ledger query failed: {err}")),
        }
    }
}

fn check_integrity(att: &Attestation) -> CheckOutcome {
    let leaves: Vec<String> = att.evidence.items.iter().map(|i| i.hash.clone()).collect();
    match MerkleTree::from_hex_leaves(&leaves) {
        Ok(tree) if tree.root_hex() == att.evidence.merkle_root => {
            pass(CheckName::Integrity, "merkle root matches stored leaves")
        }
        Ok(_) => fail(
            CheckName::Integrity,
            "recomputed merkle root does not match stored root",
        ),
        Err(err) => fail(
            CheckName::Integrity,
            &format!("could not rebuild tree: {err}"),
        ),
    }
}

fn check_expiry(att: &Attestation) -> CheckOutcome {
    if Timestamp::now() <= att.metadata.valid_until {
        pass(
            CheckName::Expiry,
            &format!("valid until {}", att.metadata.valid_until),
        )
    } else {
        fail(
            CheckName::Expiry,
            &format!("expired at {}", att.metadata.valid_until),
        )
    }
}

fn check_revocation(att: &Attestation) -> CheckOutcome {
    if att.status == AttestationStatus::Revoked {
        fail(CheckName::Revocation, "Attestation revoked")
    } else {
        pass(CheckName::Revocation, "not revoked")
    }
}

fn check_signature(att: &Attestation) -> CheckOutcome {
    let Some(pkg) = &att.package else {
        return fail(CheckName::Signature, "no signed package present");
    };
    match package::verify_signature(pkg) {
        Ok(true) => pass(CheckName::Signature, "package signature verified"),
        Ok(false) => fail(CheckName::Signature, "package signature mismatch"),
        Err(err) => fail(
            CheckName::Signature,
            &format!("signature check could not run: {err}"),
        ),
    }
}

fn pass(name: CheckName, detail: &str) -> CheckOutcome {
    CheckOutcome {
        name,
        result: CheckResult::Pass,
        detail: detail.to_string(),
    }
}

fn fail(name: CheckName, detail: &str) -> CheckOutcome {
    CheckOutcome {
        name,
        result: CheckResult::Fail,
        detail: detail.to_string(),
    }
}

fn warn(name: CheckName, detail: &str) -> CheckOutcome {
    CheckOutcome {
        name,
        result: CheckResult::Warn,
        detail: detail.to_string(),
    }
}
